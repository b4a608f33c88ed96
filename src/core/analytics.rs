// StockSync - core/analytics.rs
//
// Analytics module registry.
//
// An analytics group owns one shared input file and a fixed list of
// modules. A module is either implemented, in which case it carries the
// fetch capability, or planned, in which case it is only shown as a
// "coming soon" card. The fetch capability lives inside the `Implemented`
// variant, so a planned module cannot be invoked by construction.
//
// The registry is assembled once at startup and shared read-only.

use crate::core::model::InputFile;
use crate::util::constants;
use crate::util::error::BackendError;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Fetches one module's data for an input file.
#[async_trait]
pub trait AnalyticFetch: Send + Sync {
    async fn fetch(&self, file: &InputFile) -> Result<Value, BackendError>;
}

/// How a module's payload is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultView {
    /// Per-day rupture counts: summary, chart, table.
    StockRupture,
    /// Pretty-printed JSON.
    Raw,
}

/// Display metadata shared by both module variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub id: &'static str,
    pub title_key: &'static str,
    pub description_key: &'static str,
    /// Single glyph shown next to the title.
    pub icon: &'static str,
    pub view: ResultView,
}

/// A registered analytic.
#[derive(Clone)]
pub enum AnalyticModule {
    Implemented {
        info: ModuleInfo,
        fetcher: Arc<dyn AnalyticFetch>,
    },
    Planned {
        info: ModuleInfo,
    },
}

impl AnalyticModule {
    pub fn info(&self) -> &ModuleInfo {
        match self {
            Self::Implemented { info, .. } | Self::Planned { info } => info,
        }
    }

    pub fn id(&self) -> &'static str {
        self.info().id
    }

    pub fn implemented(&self) -> bool {
        matches!(self, Self::Implemented { .. })
    }
}

impl fmt::Debug for AnalyticModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Implemented { info, .. } => f
                .debug_struct("Implemented")
                .field("info", info)
                .finish_non_exhaustive(),
            Self::Planned { info } => f.debug_struct("Planned").field("info", info).finish(),
        }
    }
}

/// Modules that share one input file.
#[derive(Debug, Clone)]
pub struct AnalyticsGroup {
    pub id: &'static str,
    pub label_key: &'static str,
    pub description_key: &'static str,
    /// Human name of the expected input report.
    pub input_file_label: &'static str,
    /// Accepted extensions (lowercase, no dot).
    pub accept: &'static [&'static str],
    pub modules: Vec<AnalyticModule>,
}

impl AnalyticsGroup {
    /// Implemented modules with their fetchers, in declaration order.
    pub fn implemented(&self) -> impl Iterator<Item = (&ModuleInfo, &Arc<dyn AnalyticFetch>)> {
        self.modules.iter().filter_map(|m| match m {
            AnalyticModule::Implemented { info, fetcher } => Some((info, fetcher)),
            AnalyticModule::Planned { .. } => None,
        })
    }

    /// Planned modules, in declaration order.
    pub fn planned(&self) -> impl Iterator<Item = &ModuleInfo> {
        self.modules.iter().filter_map(|m| match m {
            AnalyticModule::Planned { info } => Some(info),
            AnalyticModule::Implemented { .. } => None,
        })
    }

    pub fn has_implemented(&self) -> bool {
        self.modules.iter().any(AnalyticModule::implemented)
    }
}

/// Whether a module payload carries data.
///
/// Only a non-empty JSON object or array counts; `null`, scalars, `{}` and
/// `[]` mean "no data", not failure.
pub fn has_data(payload: &Value) -> bool {
    match payload {
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => false,
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Process-wide list of analytics groups.
#[derive(Debug, Clone)]
pub struct AnalyticsRegistry {
    groups: Vec<AnalyticsGroup>,
}

impl AnalyticsRegistry {
    pub fn new(groups: Vec<AnalyticsGroup>) -> Self {
        Self { groups }
    }

    /// The built-in groups. `stock_ruptures` backs the only implemented module.
    pub fn builtin(stock_ruptures: Arc<dyn AnalyticFetch>) -> Self {
        let planned = |id, title_key, description_key, icon| AnalyticModule::Planned {
            info: ModuleInfo {
                id,
                title_key,
                description_key,
                icon,
                view: ResultView::Raw,
            },
        };

        Self::new(vec![
            AnalyticsGroup {
                id: "etat-journalier",
                label_key: "analytics.groups.etatJournalier",
                description_key: "analytics.groups.etatJournalierDesc",
                input_file_label: "Etat Journalier de Stock",
                accept: constants::SPREADSHEET_EXTENSIONS,
                modules: vec![
                    AnalyticModule::Implemented {
                        info: ModuleInfo {
                            id: "stock-ruptures",
                            title_key: "analytics.stockRuptures.title",
                            description_key: "analytics.stockRuptures.description",
                            icon: "\u{26a0}",
                            view: ResultView::StockRupture,
                        },
                        fetcher: stock_ruptures,
                    },
                    planned(
                        "stock-coverage",
                        "analytics.placeholders.stockCoverage.title",
                        "analytics.placeholders.stockCoverage.description",
                        "\u{1f4e6}",
                    ),
                    planned(
                        "consumption-trend",
                        "analytics.placeholders.consumptionTrend.title",
                        "analytics.placeholders.consumptionTrend.description",
                        "\u{1f4c8}",
                    ),
                ],
            },
            AnalyticsGroup {
                id: "other",
                label_key: "analytics.groups.otherAnalytics",
                description_key: "analytics.groups.otherAnalyticsDesc",
                input_file_label: "Master Inventory Data",
                accept: constants::SPREADSHEET_EXTENSIONS,
                modules: vec![
                    planned(
                        "slow-moving",
                        "analytics.placeholders.slowMoving.title",
                        "analytics.placeholders.slowMoving.description",
                        "\u{23f3}",
                    ),
                    planned(
                        "warehouse-utilization",
                        "analytics.placeholders.warehouseUtilization.title",
                        "analytics.placeholders.warehouseUtilization.description",
                        "\u{1f3ed}",
                    ),
                ],
            },
        ])
    }

    pub fn groups(&self) -> &[AnalyticsGroup] {
        &self.groups
    }

    pub fn group(&self, id: &str) -> Option<&AnalyticsGroup> {
        self.groups.iter().find(|g| g.id == id)
    }
}
