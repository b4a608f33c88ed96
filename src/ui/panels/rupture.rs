// StockSync - ui/panels/rupture.rs
//
// Stock-rupture result view: per-category totals, a date filter, a
// Chart / Data tab pair and the export buttons. The chart is painted
// directly with the egui painter; exports go through `core::export` and
// are handed to the frame loop as a `SaveRequest`.

use crate::app::state::{AnalyticsPanel, RuptureTab, SaveRequest};
use crate::core::export::{self, ExportFormat};
use crate::core::i18n::Translator;
use crate::core::rupture::{RuptureRow, RuptureTotals, CATEGORIES};
use crate::ui::theme;
use crate::util::error::ExportError;

/// Horizontal gridlines drawn behind the chart.
const GRID_LINES: usize = 4;

/// Maximum number of date labels on the x axis.
const MAX_X_LABELS: usize = 8;

/// Render the stock-rupture view for `panel`.
pub fn render(
    ui: &mut egui::Ui,
    tr: &Translator,
    panel: &mut AnalyticsPanel,
    pending_save: &mut Option<SaveRequest>,
    status_message: &mut String,
) {
    let Some(series) = panel.series.as_ref() else {
        return;
    };

    ui.horizontal(|ui| {
        ui.label(egui::RichText::new(tr.t("analytics.stockRuptures.title")).size(17.0).strong());
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            for &format in ExportFormat::all().iter().rev() {
                if ui.button(tr.t(format.label_key())).clicked() {
                    match export::export_rupture(series, &panel.rupture_filter, format, chrono::Local::now()) {
                        Ok(artifact) => {
                            *pending_save = Some(SaveRequest {
                                bytes: artifact.bytes,
                                suggested_name: artifact.suggested_name,
                            });
                        }
                        Err(ExportError::Empty) => {
                            *status_message = tr.t("export.empty").to_string();
                        }
                        Err(e) => {
                            tracing::error!(format = format.extension(), error = %e, "Rupture export failed");
                            *status_message = tr.tf("export.failed", &[("error", e.to_string().as_str())]);
                        }
                    }
                }
            }
            ui.label(egui::RichText::new(tr.t("export.label")).weak());
        });
    });
    ui.add_space(6.0);

    totals_row(ui, tr, &series.totals(&panel.rupture_filter));
    ui.add_space(8.0);

    ui.horizontal(|ui| {
        ui.selectable_value(&mut panel.rupture_tab, RuptureTab::Chart, tr.t("analytics.stockRuptures.chartTab"));
        ui.selectable_value(&mut panel.rupture_tab, RuptureTab::Data, tr.t("analytics.stockRuptures.dataTab"));
        ui.separator();
        ui.add(
            egui::TextEdit::singleline(&mut panel.rupture_filter)
                .hint_text(tr.t("analytics.stockRuptures.filterPlaceholder"))
                .desired_width(220.0),
        );
        if !panel.rupture_filter.is_empty() && ui.small_button("\u{2715}").clicked() {
            panel.rupture_filter.clear();
        }
    });
    ui.add_space(6.0);

    let rows: Vec<&RuptureRow> = series.filtered(&panel.rupture_filter).collect();
    if rows.is_empty() {
        ui.add_space(20.0);
        ui.label(egui::RichText::new(tr.t("analytics.stockRuptures.noMatches")).weak());
        return;
    }

    match panel.rupture_tab {
        RuptureTab::Chart => chart(ui, &rows),
        RuptureTab::Data => table(ui, tr, &rows),
    }
}

fn totals_row(ui: &mut egui::Ui, tr: &Translator, totals: &RuptureTotals) {
    ui.horizontal(|ui| {
        for (label, value, colour) in [
            ("Test", totals.test, theme::category_colour("Test")),
            ("PDR", totals.pdr, theme::category_colour("PDR")),
            ("Other", totals.other, theme::category_colour("Other")),
            (tr.t("analytics.stockRuptures.total"), totals.all, theme::TOTAL_COLOUR),
        ] {
            egui::Frame::group(ui.style()).show(ui, |ui| {
                ui.set_min_width(110.0);
                ui.vertical(|ui| {
                    ui.label(egui::RichText::new(label).small().color(colour));
                    ui.label(egui::RichText::new(value.to_string()).size(22.0).strong());
                });
            });
        }
    });
}

// =============================================================================
// Chart
// =============================================================================

fn chart(ui: &mut egui::Ui, rows: &[&RuptureRow]) {
    let width = ui.available_width().max(200.0);
    let (response, painter) =
        ui.allocate_painter(egui::vec2(width, theme::CHART_HEIGHT), egui::Sense::hover());
    let outer = response.rect;
    let plot = egui::Rect::from_min_max(
        outer.min + egui::vec2(48.0, 12.0),
        outer.max - egui::vec2(16.0, 40.0),
    );

    let visuals = ui.visuals();
    let grid_stroke = egui::Stroke::new(1.0, visuals.widgets.noninteractive.bg_stroke.color);
    let text_colour = visuals.weak_text_color();
    let font = egui::FontId::proportional(11.0);

    let max = rows
        .iter()
        .flat_map(|r| CATEGORIES.iter().map(|c| r.count(c)))
        .max()
        .unwrap_or(0)
        .max(1);

    // Gridlines + y labels.
    for i in 0..=GRID_LINES {
        let frac = i as f32 / GRID_LINES as f32;
        let y = plot.bottom() - frac * plot.height();
        painter.line_segment([egui::pos2(plot.left(), y), egui::pos2(plot.right(), y)], grid_stroke);
        let value = (max as f32 * frac).round() as u64;
        painter.text(
            egui::pos2(plot.left() - 6.0, y),
            egui::Align2::RIGHT_CENTER,
            value.to_string(),
            font.clone(),
            text_colour,
        );
    }

    let x_at = |i: usize| -> f32 {
        if rows.len() == 1 {
            plot.center().x
        } else {
            plot.left() + plot.width() * i as f32 / (rows.len() - 1) as f32
        }
    };
    let y_at = |v: u64| -> f32 { plot.bottom() - plot.height() * v as f32 / max as f32 };

    // X labels, thinned to at most MAX_X_LABELS.
    let step = rows.len().div_ceil(MAX_X_LABELS).max(1);
    for (i, row) in rows.iter().enumerate().step_by(step) {
        painter.text(
            egui::pos2(x_at(i), plot.bottom() + 6.0),
            egui::Align2::CENTER_TOP,
            row.short_date(),
            font.clone(),
            text_colour,
        );
    }

    for category in CATEGORIES {
        let colour = theme::category_colour(category);
        let points: Vec<egui::Pos2> = rows
            .iter()
            .enumerate()
            .map(|(i, r)| egui::pos2(x_at(i), y_at(r.count(category))))
            .collect();
        if points.len() > 1 {
            painter.add(egui::Shape::line(points.clone(), egui::Stroke::new(2.0, colour)));
        }
        for p in points {
            painter.circle_filled(p, 3.0, colour);
        }
    }

    // Legend.
    let mut legend_x = plot.left();
    let legend_y = outer.bottom() - 10.0;
    for category in CATEGORIES {
        let colour = theme::category_colour(category);
        painter.circle_filled(egui::pos2(legend_x + 5.0, legend_y), 5.0, colour);
        painter.text(
            egui::pos2(legend_x + 14.0, legend_y),
            egui::Align2::LEFT_CENTER,
            category,
            font.clone(),
            text_colour,
        );
        legend_x += 80.0;
    }

    // Hover: nearest day.
    if let Some(pointer) = response.hover_pos().filter(|p| plot.expand(8.0).contains(*p)) {
        let index = nearest_index(rows.len(), plot.left(), plot.width(), pointer.x);
        if let Some(row) = rows.get(index) {
            let x = x_at(index);
            painter.line_segment(
                [egui::pos2(x, plot.top()), egui::pos2(x, plot.bottom())],
                egui::Stroke::new(1.0, text_colour),
            );
            response.on_hover_ui_at_pointer(|ui| {
                ui.strong(row.display_date());
                for category in CATEGORIES {
                    ui.colored_label(
                        theme::category_colour(category),
                        format!("{category}: {}", row.count(category)),
                    );
                }
                ui.label(format!("\u{03a3} {}", row.total()));
            });
        }
    }
}

/// Index of the data point closest to `x` for `len` evenly spaced points.
fn nearest_index(len: usize, left: f32, width: f32, x: f32) -> usize {
    if len <= 1 || width <= 0.0 {
        return 0;
    }
    let frac = ((x - left) / width).clamp(0.0, 1.0);
    ((frac * (len - 1) as f32).round() as usize).min(len - 1)
}

// =============================================================================
// Data table
// =============================================================================

fn table(ui: &mut egui::Ui, tr: &Translator, rows: &[&RuptureRow]) {
    let totals = crate::core::rupture::totals_of(rows.iter().copied());
    egui::ScrollArea::vertical()
        .id_salt("rupture_table")
        .max_height(theme::CHART_HEIGHT + 40.0)
        .show(ui, |ui| {
            egui::Grid::new("rupture_grid")
                .num_columns(5)
                .striped(true)
                .min_row_height(theme::ROW_HEIGHT)
                .spacing([28.0, 4.0])
                .show(ui, |ui| {
                    ui.strong(tr.t("analytics.stockRuptures.date"));
                    for category in CATEGORIES {
                        ui.label(egui::RichText::new(category).strong().color(theme::category_colour(category)));
                    }
                    ui.strong(tr.t("analytics.stockRuptures.total"));
                    ui.end_row();

                    for row in rows {
                        ui.label(row.display_date());
                        for category in CATEGORIES {
                            ui.label(row.count(category).to_string());
                        }
                        ui.label(egui::RichText::new(row.total().to_string()).strong());
                        ui.end_row();
                    }

                    ui.strong(tr.t("analytics.stockRuptures.total"));
                    ui.strong(totals.test.to_string());
                    ui.strong(totals.pdr.to_string());
                    ui.strong(totals.other.to_string());
                    ui.strong(totals.all.to_string());
                    ui.end_row();
                });
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_index_clamps_to_range() {
        assert_eq!(nearest_index(1, 0.0, 100.0, 80.0), 0);
        assert_eq!(nearest_index(5, 0.0, 100.0, -20.0), 0);
        assert_eq!(nearest_index(5, 0.0, 100.0, 49.0), 2);
        assert_eq!(nearest_index(5, 0.0, 100.0, 400.0), 4);
    }
}
