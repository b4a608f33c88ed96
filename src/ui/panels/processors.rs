// StockSync - ui/panels/processors.rs
//
// Processors page: one card per backend transformation. Each card shows
// its input slots as drop zones with a browse button, the MB51 movement
// type selector, and the submit button. Pressing submit only queues the
// card index in `pending_jobs`; the frame loop opens the ledger record
// and spawns the backend call.

use crate::app::state::AppState;
use crate::core::i18n::Translator;
use crate::core::model::InputFile;
use crate::core::processor::InputSlot;
use crate::core::submission::SubmissionUnit;
use crate::ui::theme;
use crate::util::constants;

/// Render the Processors page into the central panel.
pub fn render(ui: &mut egui::Ui, state: &mut AppState) {
    let tr = &state.translator;

    ui.heading(tr.t("processors.title"));
    ui.label(egui::RichText::new(tr.t("processors.subtitle")).weak());
    ui.add_space(10.0);

    egui::ScrollArea::vertical()
        .id_salt("processors_scroll")
        .auto_shrink([false, false])
        .show(ui, |ui| {
            ui.horizontal_wrapped(|ui| {
                ui.spacing_mut().item_spacing = egui::vec2(14.0, 14.0);
                for (index, unit) in state.cards.iter_mut().enumerate() {
                    if card(ui, tr, index, unit) {
                        state.pending_jobs.push(index);
                    }
                }
            });
        });
}

/// One processor card. Returns true when submit was pressed.
fn card(ui: &mut egui::Ui, tr: &Translator, index: usize, unit: &mut SubmissionUnit) -> bool {
    let kind = unit.kind();
    let mut submit = false;

    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.set_width(theme::CARD_WIDTH);
        ui.label(egui::RichText::new(tr.t(kind.title_key())).size(17.0).strong());
        ui.label(egui::RichText::new(tr.t(kind.description_key())).weak());
        ui.add_space(8.0);

        let slots = unit.slots().to_vec();
        for slot in &slots {
            slot_zone(ui, tr, index, unit, slot);
            ui.add_space(4.0);
        }

        if kind.takes_movement_type() {
            ui.add_space(4.0);
            ui.add_enabled_ui(!unit.in_flight(), |ui| {
                ui.horizontal(|ui| {
                    ui.label(tr.t("processors.mb51.movementType"));
                    egui::ComboBox::from_id_salt(("movement_type", index))
                        .selected_text(unit.movement_type.to_string())
                        .show_ui(ui, |ui| {
                            for &mt in constants::MB51_MOVEMENT_TYPES {
                                ui.selectable_value(&mut unit.movement_type, mt, mt.to_string());
                            }
                        });
                });
            });
        }

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            let label = if unit.in_flight() {
                tr.t("processors.processing")
            } else {
                tr.t("processors.submit")
            };
            let response = ui.add_enabled(
                unit.can_submit(),
                egui::Button::new(egui::RichText::new(label).strong())
                    .min_size(egui::vec2(120.0, 28.0)),
            );
            if response.clicked() {
                submit = true;
            }
            if unit.in_flight() {
                ui.spinner();
            } else if !unit.all_ready() {
                ui.label(egui::RichText::new(tr.t("processors.missingFiles")).small().weak());
            }
        });
    });

    submit
}

/// Drop zone for one input slot: file name with a clear button once
/// selected, otherwise a browse button.
fn slot_zone(
    ui: &mut egui::Ui,
    tr: &Translator,
    index: usize,
    unit: &mut SubmissionUnit,
    slot: &InputSlot,
) {
    ui.label(egui::RichText::new(tr.t(slot.label_key)).small());

    let enabled = !unit.in_flight();
    let selected = unit.selection(slot.id).map(|f| f.name.clone());

    egui::Frame::canvas(ui.style()).show(ui, |ui| {
        ui.set_min_height(theme::DROP_ZONE_HEIGHT - 12.0);
        ui.set_width(ui.available_width());
        ui.horizontal_centered(|ui| match selected {
            Some(name) => {
                ui.label(egui::RichText::new(format!("\u{1f4c4} {name}")).monospace());
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui
                        .add_enabled(enabled, egui::Button::new("\u{2715}").small())
                        .on_hover_text(tr.t("processors.clearFile"))
                        .clicked()
                    {
                        unit.clear_slot(slot.id);
                    }
                });
            }
            None => {
                ui.label(egui::RichText::new(tr.t("processors.dropHint")).weak());
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui
                        .add_enabled(enabled, egui::Button::new(tr.t("processors.browse")))
                        .clicked()
                    {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter(tr.t("processors.spreadsheets"), slot.accept)
                            .pick_file()
                        {
                            if slot.accepts(&path) {
                                unit.select(slot.id, InputFile::from_path(path));
                            } else {
                                tracing::warn!(
                                    card = index,
                                    slot = slot.id,
                                    path = %path.display(),
                                    "Picked file has an unsupported extension"
                                );
                            }
                        }
                    }
                });
            }
        });
    });
}
