// StockSync - app/mod.rs
//
// Application layer: session state and background task orchestration.
// Dependencies: core layer, the platform `HostBridge` trait.
// Must NOT depend on: ui.

pub mod state;
pub mod tasks;
