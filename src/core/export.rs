// StockSync - core/export.rs
//
// Export of stock-rupture results as a spreadsheet (CSV), a chart image
// (PNG) or raw JSON.
//
// Exports work on a shared reference to the series and never change it.
// The timestamp is passed in, so the same series, filter and `now` always
// produce the same file name and the same bytes.

use crate::core::rupture::{totals_of, RuptureRow, RuptureSeries, CATEGORIES};
use crate::util::constants;
use crate::util::error::ExportError;
use chrono::{DateTime, Local};
use image::{ImageFormat, Rgb, RgbImage};
use serde::Serialize;
use std::io::Cursor;

/// Output format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Png,
    Json,
}

impl ExportFormat {
    pub fn all() -> &'static [ExportFormat] {
        &[Self::Csv, Self::Png, Self::Json]
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Png => "png",
            Self::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Png => "image/png",
            Self::Json => "application/json",
        }
    }

    /// Translation key of the export button.
    pub fn label_key(&self) -> &'static str {
        match self {
            Self::Csv => "export.spreadsheet",
            Self::Png => "export.chart",
            Self::Json => "export.json",
        }
    }
}

/// Serialized export, ready to be handed to the host for saving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub suggested_name: String,
    pub format: ExportFormat,
}

/// Serialize the rows of `series` that match `filter`.
///
/// Fails with [`ExportError::Empty`] when no row matches.
pub fn export_rupture(
    series: &RuptureSeries,
    filter: &str,
    format: ExportFormat,
    now: DateTime<Local>,
) -> Result<ExportArtifact, ExportError> {
    let rows: Vec<&RuptureRow> = series.filtered(filter).collect();
    if rows.is_empty() {
        return Err(ExportError::Empty);
    }

    let bytes = match format {
        ExportFormat::Csv => to_csv(&rows)?,
        ExportFormat::Png => to_png(&rows)?,
        ExportFormat::Json => to_json(&rows, filter, now)?,
    };

    let suggested_name = format!(
        "stock-ruptures-{}.{}",
        now.format("%Y%m%d-%H%M%S"),
        format.extension()
    );
    tracing::debug!(
        format = format.extension(),
        rows = rows.len(),
        bytes = bytes.len(),
        name = %suggested_name,
        "Rupture export serialized"
    );

    Ok(ExportArtifact {
        bytes,
        suggested_name,
        format,
    })
}

fn to_csv(rows: &[&RuptureRow]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["Date", "Test", "PDR", "Other", "Total"])
        .map_err(|source| ExportError::Csv { source })?;

    for row in rows {
        writer
            .write_record([
                row.raw_date.clone(),
                row.test.to_string(),
                row.pdr.to_string(),
                row.other.to_string(),
                row.total().to_string(),
            ])
            .map_err(|source| ExportError::Csv { source })?;
    }

    let totals = totals_of(rows.iter().copied());
    writer
        .write_record([
            "Total".to_string(),
            totals.test.to_string(),
            totals.pdr.to_string(),
            totals.other.to_string(),
            totals.all.to_string(),
        ])
        .map_err(|source| ExportError::Csv { source })?;

    writer.into_inner().map_err(|e| ExportError::Buffer {
        reason: e.error().to_string(),
    })
}

#[derive(Serialize)]
struct JsonExport<'a> {
    generated_at: String,
    filter: &'a str,
    rows: &'a [&'a RuptureRow],
    totals: crate::core::rupture::RuptureTotals,
}

fn to_json(rows: &[&RuptureRow], filter: &str, now: DateTime<Local>) -> Result<Vec<u8>, ExportError> {
    let doc = JsonExport {
        generated_at: now.to_rfc3339(),
        filter,
        rows,
        totals: totals_of(rows.iter().copied()),
    };
    serde_json::to_vec_pretty(&doc).map_err(|source| ExportError::Json { source })
}

// =============================================================================
// Chart rendering
// =============================================================================

const MARGIN_LEFT: i64 = 60;
const MARGIN_RIGHT: i64 = 30;
const MARGIN_TOP: i64 = 30;
const MARGIN_BOTTOM: i64 = 50;
const GRID_LINES: i64 = 5;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const GRID: Rgb<u8> = Rgb([230, 234, 240]);
const AXIS: Rgb<u8> = Rgb([110, 120, 135]);

/// Line colour of a rupture category.
pub fn category_rgb(category: &str) -> [u8; 3] {
    match category {
        "Test" => [27, 155, 167],
        "PDR" => [220, 143, 9],
        _ => [223, 58, 58],
    }
}

/// Render the filtered rows as a line chart, one line per category.
fn to_png(rows: &[&RuptureRow]) -> Result<Vec<u8>, ExportError> {
    let width = constants::CHART_EXPORT_WIDTH;
    let height = constants::CHART_EXPORT_HEIGHT;
    let mut img = RgbImage::from_pixel(width, height, BACKGROUND);

    let left = MARGIN_LEFT;
    let right = i64::from(width) - MARGIN_RIGHT;
    let top = MARGIN_TOP;
    let bottom = i64::from(height) - MARGIN_BOTTOM;

    for step in 0..=GRID_LINES {
        let y = bottom - (bottom - top) * step / GRID_LINES;
        draw_line(&mut img, (left, y), (right, y), 0, GRID);
    }
    draw_line(&mut img, (left, top), (left, bottom), 0, AXIS);
    draw_line(&mut img, (left, bottom), (right, bottom), 0, AXIS);

    let max = rows
        .iter()
        .flat_map(|r| CATEGORIES.iter().map(move |c| r.count(c)))
        .max()
        .unwrap_or(0)
        .max(1);

    let x_at = |i: usize| -> i64 {
        if rows.len() == 1 {
            (left + right) / 2
        } else {
            left + (right - left) * i as i64 / (rows.len() as i64 - 1)
        }
    };
    let y_at = |v: u64| -> i64 { bottom - ((bottom - top) as f64 * v as f64 / max as f64).round() as i64 };

    for i in 0..rows.len() {
        let x = x_at(i);
        draw_line(&mut img, (x, bottom), (x, bottom + 5), 0, AXIS);
    }

    for category in CATEGORIES {
        let colour = Rgb(category_rgb(category));
        let points: Vec<(i64, i64)> = rows
            .iter()
            .enumerate()
            .map(|(i, r)| (x_at(i), y_at(r.count(category))))
            .collect();
        for pair in points.windows(2) {
            draw_line(&mut img, pair[0], pair[1], 1, colour);
        }
        for &p in &points {
            draw_disc(&mut img, p, 4, colour);
            draw_disc(&mut img, p, 2, BACKGROUND);
        }
    }

    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|source| ExportError::Image { source })?;
    Ok(buf.into_inner())
}

fn put(img: &mut RgbImage, x: i64, y: i64, colour: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < i64::from(img.width()) && y < i64::from(img.height()) {
        img.put_pixel(x as u32, y as u32, colour);
    }
}

/// Bresenham line; `half_width` pixels are stamped around each point.
fn draw_line(img: &mut RgbImage, from: (i64, i64), to: (i64, i64), half_width: i64, colour: Rgb<u8>) {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        for ox in -half_width..=half_width {
            for oy in -half_width..=half_width {
                put(img, x + ox, y + oy, colour);
            }
        }
        if x == to.0 && y == to.1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn draw_disc(img: &mut RgbImage, centre: (i64, i64), radius: i64, colour: Rgb<u8>) {
    for ox in -radius..=radius {
        for oy in -radius..=radius {
            if ox * ox + oy * oy <= radius * radius {
                put(img, centre.0 + ox, centre.1 + oy, colour);
            }
        }
    }
}
