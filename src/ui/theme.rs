// StockSync - ui/theme.rs
//
// Colour scheme, status and rupture-category colours, layout constants.
// No dependencies on app state or business logic.

use crate::core::export::category_rgb;
use crate::core::model::JobStatus;
use egui::Color32;

/// Colour for a job status badge.
pub fn status_colour(status: JobStatus) -> Color32 {
    match status {
        JobStatus::Processing => Color32::from_rgb(37, 99, 235), // Blue 600
        JobStatus::Success => Color32::from_rgb(22, 163, 74),    // Green 600
        JobStatus::Error => Color32::from_rgb(220, 38, 38),      // Red 600
    }
}

/// Line and header colour of a rupture category.
pub fn category_colour(category: &str) -> Color32 {
    let [r, g, b] = category_rgb(category);
    Color32::from_rgb(r, g, b)
}

/// Colour of the "Total" summary figure.
pub const TOTAL_COLOUR: Color32 = Color32::from_rgb(100, 116, 139); // Slate 500

/// Muted colour for "coming soon" module cards.
pub const PLANNED_COLOUR: Color32 = Color32::from_rgb(148, 163, 184); // Slate 400

/// Accent for the update-available indicator.
pub const ACCENT: Color32 = Color32::from_rgb(59, 130, 246); // Blue 500

/// Layout constants.
pub const SIDEBAR_WIDTH: f32 = 220.0;
pub const CARD_WIDTH: f32 = 340.0;
pub const DROP_ZONE_HEIGHT: f32 = 44.0;
pub const CHART_HEIGHT: f32 = 320.0;
pub const ROW_HEIGHT: f32 = 22.0;
