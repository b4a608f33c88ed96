// StockSync - core/mod.rs
//
// Core business logic layer: job ledger, submission gating, analytics
// fan-out, result shaping, export, translations and update detection.
// Must NOT depend on: ui, platform, app. Network access goes through the
// `JobProcessor` and `AnalyticFetch` traits implemented in `platform`.

pub mod analytics;
pub mod export;
pub mod fanout;
pub mod i18n;
pub mod ledger;
pub mod model;
pub mod processor;
pub mod rupture;
pub mod submission;
pub mod update;
