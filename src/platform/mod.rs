// StockSync - platform/mod.rs
//
// Platform abstraction layer: config files, the backend HTTP client and
// process, and host capabilities (dialogs, updater).
// Implements the core's `JobProcessor` and `AnalyticFetch` traits.
// Must NOT depend on: app, ui.

pub mod backend;
pub mod backend_process;
pub mod config;
pub mod fs;
pub mod host;
