// StockSync - core/rupture.rs
//
// Daily stock-rupture series: the payload of the `stock-ruptures` module,
// `{ "<date>": { "Test": n, "PDR": n, "Other": n } }`, turned into sorted
// rows with a text filter and running totals.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

/// Rupture categories, in display order.
pub const CATEGORIES: [&str; 3] = ["Test", "PDR", "Other"];

/// One day of rupture counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuptureRow {
    /// Date key exactly as the backend sent it (normally `YYYY-MM-DD`).
    pub raw_date: String,
    #[serde(rename = "Test")]
    pub test: u64,
    #[serde(rename = "PDR")]
    pub pdr: u64,
    #[serde(rename = "Other")]
    pub other: u64,
}

impl RuptureRow {
    /// Sum of the three categories, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        self.test.saturating_add(self.pdr).saturating_add(self.other)
    }

    /// Count for a category name from [`CATEGORIES`].
    pub fn count(&self, category: &str) -> u64 {
        match category {
            "Test" => self.test,
            "PDR" => self.pdr,
            _ => self.other,
        }
    }

    fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.raw_date, "%Y-%m-%d").ok()
    }

    /// Long display form, e.g. `Jan 2, 2025`. Falls back to the raw key.
    pub fn display_date(&self) -> String {
        self.parsed_date()
            .map(|d| d.format("%b %-d, %Y").to_string())
            .unwrap_or_else(|| self.raw_date.clone())
    }

    /// Axis label form, e.g. `Jan 2`.
    pub fn short_date(&self) -> String {
        self.parsed_date()
            .map(|d| d.format("%b %-d").to_string())
            .unwrap_or_else(|| self.raw_date.clone())
    }

    /// Case-insensitive match on the raw key or the display form.
    /// An empty query matches everything.
    pub fn matches(&self, query: &str) -> bool {
        let q = query.trim().to_lowercase();
        q.is_empty()
            || self.raw_date.to_lowercase().contains(&q)
            || self.display_date().to_lowercase().contains(&q)
    }
}

/// Per-category sums over a set of rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RuptureTotals {
    pub test: u64,
    pub pdr: u64,
    pub other: u64,
    pub all: u64,
}

/// All rows of one stock-rupture result, sorted by date key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuptureSeries {
    rows: Vec<RuptureRow>,
}

impl RuptureSeries {
    /// Build from the module payload. `None` unless the payload is an object.
    ///
    /// Missing or non-numeric counts read as zero.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let days = payload.as_object()?;
        let mut rows: Vec<RuptureRow> = days
            .iter()
            .map(|(date, counts)| RuptureRow {
                raw_date: date.clone(),
                test: count_of(counts, "Test"),
                pdr: count_of(counts, "PDR"),
                other: count_of(counts, "Other"),
            })
            .collect();
        rows.sort_by(|a, b| a.raw_date.cmp(&b.raw_date));
        Some(Self { rows })
    }

    pub fn rows(&self) -> &[RuptureRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows matching `query`, still in date order.
    pub fn filtered<'a>(&'a self, query: &'a str) -> impl Iterator<Item = &'a RuptureRow> + 'a {
        self.rows.iter().filter(move |r| r.matches(query))
    }

    pub fn totals(&self, query: &str) -> RuptureTotals {
        totals_of(self.filtered(query))
    }
}

pub fn totals_of<'a>(rows: impl IntoIterator<Item = &'a RuptureRow>) -> RuptureTotals {
    rows.into_iter().fold(RuptureTotals::default(), |mut t, r| {
        t.test = t.test.saturating_add(r.test);
        t.pdr = t.pdr.saturating_add(r.pdr);
        t.other = t.other.saturating_add(r.other);
        t.all = t.all.saturating_add(r.total());
        t
    })
}

/// Read one category count. Negative, fractional and non-numeric values
/// are coerced (to 0, rounded, to 0) and logged.
fn count_of(counts: &Value, key: &str) -> u64 {
    let Some(v) = counts.get(key) else {
        return 0;
    };
    if let Some(n) = v.as_u64() {
        return n;
    }
    let coerced = match v.as_f64() {
        Some(f) if f >= 0.0 => f.round() as u64,
        _ => 0,
    };
    tracing::debug!(category = key, raw = %v, coerced, "Rupture count coerced");
    coerced
}
