// StockSync - ui/panels/warnings.rs
//
// Startup warnings window: config validation problems and backend launch
// failures collected before the first frame.

use crate::app::state::AppState;

pub fn render(ctx: &egui::Context, state: &mut AppState) {
    if !state.show_warnings {
        return;
    }
    let tr = &state.translator;

    let mut open = true;
    egui::Window::new(tr.t("warnings.title"))
        .open(&mut open)
        .collapsible(false)
        .resizable(true)
        .min_width(420.0)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            if state.warnings.is_empty() {
                ui.label(egui::RichText::new(tr.t("warnings.none")).weak());
                return;
            }
            egui::ScrollArea::vertical()
                .id_salt("warnings_list")
                .max_height(260.0)
                .show(ui, |ui| {
                    for w in &state.warnings {
                        ui.label(
                            egui::RichText::new(format!("\u{26a0} {w}"))
                                .color(egui::Color32::from_rgb(253, 186, 116)),
                        );
                    }
                });
        });

    if !open {
        state.show_warnings = false;
    }
}
