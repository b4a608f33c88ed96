// StockSync - ui/panels/update.rs
//
// Update confirmation dialog, opened when the release feed names a
// different version. Confirming sets `pending_begin_update`; the frame
// loop launches the updater and closes the window.

use crate::app::state::AppState;

/// Render the confirmation dialog (if `state.update.confirm_open` is true).
pub fn render(ctx: &egui::Context, state: &mut AppState) {
    if !state.update.confirm_open {
        return;
    }
    let tr = &state.translator;

    let mut open = true;
    let mut install = false;
    let mut later = false;
    egui::Window::new(tr.t("update.confirmTitle"))
        .open(&mut open)
        .collapsible(false)
        .resizable(false)
        .min_width(340.0)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.add_space(6.0);
            ui.label(tr.t("update.confirmBody"));
            ui.add_space(4.0);
            ui.label(egui::RichText::new(tr.t("update.restartNotice")).small().weak());
            ui.add_space(10.0);
            ui.horizontal(|ui| {
                if ui
                    .button(egui::RichText::new(tr.t("update.installNow")).strong())
                    .clicked()
                {
                    install = true;
                }
                if ui.button(tr.t("update.later")).clicked() {
                    later = true;
                }
            });
        });

    if install {
        state.pending_begin_update = true;
    } else if later || !open {
        state.update.confirm_open = false;
    }
}
