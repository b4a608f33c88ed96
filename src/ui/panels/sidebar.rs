// StockSync - ui/panels/sidebar.rs
//
// Left navigation: page links with live counters, language selector,
// update button and the About link.

use crate::app::state::{AppState, Page};
use crate::core::i18n::Language;
use crate::core::update::UpdateStatus;
use crate::ui::theme;
use crate::util::constants;

/// Render the sidebar contents.
pub fn render(ui: &mut egui::Ui, state: &mut AppState) {
    let mut chosen_language = None;
    let tr = &state.translator;

    ui.add_space(10.0);
    ui.label(egui::RichText::new(constants::APP_NAME).size(22.0).strong());
    ui.label(egui::RichText::new(tr.t("app.tagline")).small().weak());
    ui.add_space(8.0);
    ui.separator();
    ui.add_space(4.0);

    let counts = state.ledger.counts();
    for &page in Page::all() {
        let mut text = tr.t(page.translation_key()).to_string();
        if page == Page::History && counts.processing > 0 {
            text = format!("{text}  ({})", counts.processing);
        }
        let label = egui::RichText::new(text).size(15.0);
        if ui
            .add_sized(
                [ui.available_width(), 28.0],
                egui::SelectableLabel::new(state.page == page, label),
            )
            .clicked()
        {
            state.page = page;
        }
    }

    ui.with_layout(egui::Layout::bottom_up(egui::Align::LEFT), |ui| {
        ui.add_space(8.0);
        ui.label(
            egui::RichText::new(format!("v{}", constants::APP_VERSION))
                .small()
                .weak(),
        );
        if ui.link(tr.t("about.title")).clicked() {
            state.show_about = true;
        }

        // Update button: label follows the checker status.
        let status = state.update.status().clone();
        let mut text = egui::RichText::new(tr.t(status.translation_key()));
        if status == UpdateStatus::Available {
            text = text.color(theme::ACCENT).strong();
        }
        let response = ui.add_enabled(state.update.can_check(), egui::Button::new(text));
        let response = match &status {
            UpdateStatus::Failed(message) => response.on_hover_text(message.as_str()),
            _ => response,
        };
        if response.clicked() {
            if status == UpdateStatus::Available {
                state.update.confirm_open = true;
            } else {
                state.pending_update_check = true;
            }
        }

        ui.add_space(6.0);
        let current = tr.language();
        egui::ComboBox::from_id_salt("language_select")
            .selected_text(current.native_name())
            .show_ui(ui, |ui| {
                for &language in Language::all() {
                    if ui
                        .selectable_label(language == current, language.native_name())
                        .clicked()
                    {
                        chosen_language = Some(language);
                    }
                }
            });
        ui.label(egui::RichText::new(tr.t("settings.language")).small().weak());
        ui.separator();
    });

    if let Some(language) = chosen_language {
        state.set_language(language);
    }
}
