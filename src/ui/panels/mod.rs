// StockSync - ui/panels/mod.rs

pub mod about;
pub mod analytics;
pub mod history;
pub mod processors;
pub mod rupture;
pub mod sidebar;
pub mod update;
pub mod warnings;
