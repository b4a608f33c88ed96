// StockSync - ui/panels/analytics.rs
//
// Analytics page: one tab per registry group. Each group takes one shared
// input file; the run button fans it out to every implemented module and
// the results are rendered per module (rupture view or raw JSON). Planned
// modules are shown as "coming soon" cards and never run.

use crate::app::state::{AnalyticsPanel, AppState};
use crate::core::analytics::{AnalyticsGroup, ModuleInfo, ResultView};
use crate::core::fanout::{FanoutOutcome, ModuleFailure};
use crate::core::i18n::Translator;
use crate::core::model::InputFile;
use crate::ui::panels::rupture;
use crate::ui::theme;
use serde_json::Value;

/// Render the Analytics page into the central panel.
pub fn render(ui: &mut egui::Ui, state: &mut AppState) {
    let registry = state.registry.clone();
    let tr = &state.translator;

    ui.heading(tr.t("analytics.title"));
    ui.label(egui::RichText::new(tr.t("analytics.subtitle")).weak());
    ui.add_space(8.0);

    // Group tabs with implemented/total module counts.
    ui.horizontal(|ui| {
        for (index, group) in registry.groups().iter().enumerate() {
            let implemented = group.implemented().count();
            let text = format!("{}  {implemented}/{}", tr.t(group.label_key), group.modules.len());
            if ui.selectable_label(state.active_group == index, text).clicked() {
                state.active_group = index;
            }
        }
    });
    ui.separator();

    let index = state.active_group;
    let (Some(panel), Some(group)) = (
        state.analytics.get_mut(index),
        registry.groups().get(index),
    ) else {
        return;
    };

    let mut picked: Option<InputFile> = None;
    let mut clear = false;
    let mut run = false;

    egui::ScrollArea::vertical()
        .id_salt("analytics_scroll")
        .auto_shrink([false, false])
        .show(ui, |ui| {
            ui.label(egui::RichText::new(tr.t(group.description_key)).weak());
            ui.add_space(8.0);

            input_row(ui, tr, group, panel, &mut picked, &mut clear, &mut run);
            ui.add_space(10.0);

            module_cards(ui, tr, group);
            ui.add_space(12.0);

            // Taken out for the duration of the frame so the rupture view can
            // borrow the panel mutably.
            if let Some(outcome) = panel.outcome.take() {
                ui.separator();
                results(ui, tr, group, panel, &outcome, &mut state.pending_save, &mut state.status_message);
                panel.outcome = Some(outcome);
            }
        });

    if let Some(file) = picked {
        if !state.select_analytics_file(index, file) {
            state.status_message = state.translator.t("analytics.fileRejected").to_string();
        }
    }
    if clear {
        state.clear_analytics_file(index);
    }
    if run {
        state.pending_analytics = Some(index);
    }
}

fn input_row(
    ui: &mut egui::Ui,
    tr: &Translator,
    group: &AnalyticsGroup,
    panel: &AnalyticsPanel,
    picked: &mut Option<InputFile>,
    clear: &mut bool,
    run: &mut bool,
) {
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.set_width(ui.available_width());
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new(group.input_file_label).strong());
            ui.separator();
            match &panel.file {
                Some(file) => {
                    ui.label(egui::RichText::new(format!("\u{1f4c4} {}", file.name)).monospace());
                    if ui
                        .add_enabled(!panel.running, egui::Button::new("\u{2715}").small())
                        .on_hover_text(tr.t("processors.clearFile"))
                        .clicked()
                    {
                        *clear = true;
                    }
                }
                None => {
                    ui.label(egui::RichText::new(tr.t("processors.dropHint")).weak());
                }
            }
            if ui
                .add_enabled(!panel.running, egui::Button::new(tr.t("processors.browse")))
                .clicked()
            {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter(tr.t("processors.spreadsheets"), group.accept)
                    .pick_file()
                {
                    *picked = Some(InputFile::from_path(path));
                }
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let can_run = panel.file.is_some() && group.has_implemented() && !panel.running;
                let label = if panel.running {
                    tr.t("analytics.running")
                } else {
                    tr.t("analytics.run")
                };
                let response = ui.add_enabled(
                    can_run,
                    egui::Button::new(egui::RichText::new(label).strong()).min_size(egui::vec2(110.0, 28.0)),
                );
                let response = if group.has_implemented() {
                    response
                } else {
                    response.on_disabled_hover_text(tr.t("analytics.nothingToRun"))
                };
                if response.clicked() {
                    *run = true;
                }
                if panel.running {
                    ui.spinner();
                }
            });
        });
    });
}

fn module_cards(ui: &mut egui::Ui, tr: &Translator, group: &AnalyticsGroup) {
    ui.horizontal_wrapped(|ui| {
        for (info, _) in group.implemented() {
            module_card(ui, tr, info, false);
        }
        for info in group.planned() {
            module_card(ui, tr, info, true);
        }
    });
}

fn module_card(ui: &mut egui::Ui, tr: &Translator, info: &ModuleInfo, planned: bool) {
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.set_width(240.0);
        ui.horizontal(|ui| {
            let title = egui::RichText::new(format!("{}  {}", info.icon, tr.t(info.title_key))).strong();
            if planned {
                ui.label(title.color(theme::PLANNED_COLOUR));
                ui.label(
                    egui::RichText::new(tr.t("analytics.comingSoon"))
                        .small()
                        .italics()
                        .color(theme::PLANNED_COLOUR),
                );
            } else {
                ui.label(title);
            }
        });
        let description = egui::RichText::new(tr.t(info.description_key)).small();
        ui.label(if planned { description.color(theme::PLANNED_COLOUR) } else { description.weak() });
    });
}

fn results(
    ui: &mut egui::Ui,
    tr: &Translator,
    group: &AnalyticsGroup,
    panel: &mut AnalyticsPanel,
    outcome: &FanoutOutcome,
    pending_save: &mut Option<crate::app::state::SaveRequest>,
    status_message: &mut String,
) {
    let error_colour = theme::status_colour(crate::core::model::JobStatus::Error);
    match outcome {
        FanoutOutcome::Failed(failure) => {
            ui.colored_label(
                error_colour,
                tr.tf("analytics.failed", &[("error", failure.message.as_str())]),
            );
        }
        FanoutOutcome::NoData { failures } => {
            ui.label(egui::RichText::new(tr.t("analytics.noData")).weak());
            failure_list(ui, tr, failures);
        }
        FanoutOutcome::Completed { results, failures } => {
            failure_list(ui, tr, failures);
            for (info, _) in group.implemented() {
                let Some(payload) = results.get(info.id) else {
                    continue;
                };
                ui.add_space(8.0);
                match info.view {
                    ResultView::StockRupture if panel.series.is_some() => {
                        rupture::render(ui, tr, panel, pending_save, status_message);
                    }
                    _ => raw_view(ui, tr, info, payload),
                }
            }
        }
    }
}

fn failure_list(ui: &mut egui::Ui, tr: &Translator, failures: &[ModuleFailure]) {
    if failures.is_empty() {
        return;
    }
    let colour = theme::status_colour(crate::core::model::JobStatus::Error);
    ui.colored_label(
        colour,
        tr.tf("analytics.partial", &[("failed", failures.len().to_string().as_str())]),
    );
    for f in failures {
        ui.label(egui::RichText::new(format!("  {}: {}", f.module_id, f.message)).small().color(colour));
    }
}

fn raw_view(ui: &mut egui::Ui, tr: &Translator, info: &ModuleInfo, payload: &Value) {
    egui::CollapsingHeader::new(tr.t(info.title_key))
        .id_salt(("raw_result", info.id))
        .default_open(true)
        .show(ui, |ui| {
            let text = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
            egui::ScrollArea::vertical()
                .id_salt(("raw_scroll", info.id))
                .max_height(320.0)
                .show(ui, |ui| {
                    ui.label(egui::RichText::new(text).monospace().size(12.0));
                });
        });
}
