// StockSync - ui/panels/history.rs
//
// History page: searchable, status-filtered table of the session's jobs,
// with download of successful artifacts and a details window per record.

use crate::app::state::{AppState, SaveRequest};
use crate::core::i18n::Translator;
use crate::core::ledger::StatusFilter;
use crate::core::model::{JobRecord, JobStatus};
use crate::ui::theme;

/// Render the History page into the central panel.
pub fn render(ui: &mut egui::Ui, state: &mut AppState) {
    let tr = &state.translator;
    let counts = state.ledger.counts();

    ui.heading(tr.t("history.title"));
    ui.label(egui::RichText::new(tr.t("history.subtitle")).weak());
    ui.add_space(8.0);

    // -------------------------------------------------------------------------
    // Search + status chips
    // -------------------------------------------------------------------------
    ui.horizontal(|ui| {
        ui.add(
            egui::TextEdit::singleline(&mut state.history_filter.search)
                .hint_text(tr.t("history.searchPlaceholder"))
                .desired_width(260.0),
        );
        if state.history_filter.is_active() && ui.small_button(tr.t("history.clearFilters")).clicked() {
            state.history_filter = Default::default();
        }
        ui.separator();
        for &chip in StatusFilter::all() {
            let count = match chip {
                StatusFilter::All => counts.processing + counts.success + counts.error,
                StatusFilter::Success => counts.success,
                StatusFilter::Error => counts.error,
                StatusFilter::Processing => counts.processing,
            };
            let text = format!("{} ({count})", tr.t(chip.translation_key()));
            if ui
                .selectable_label(state.history_filter.status == chip, text)
                .clicked()
            {
                state.history_filter.status = chip;
            }
        }
    });
    ui.add_space(6.0);
    ui.separator();

    if state.ledger.is_empty() {
        ui.add_space(40.0);
        ui.vertical_centered(|ui| {
            ui.label(egui::RichText::new(tr.t("history.empty")).size(16.0).weak());
        });
        return;
    }

    // -------------------------------------------------------------------------
    // Table
    // -------------------------------------------------------------------------
    let mut download: Option<SaveRequest> = None;
    let mut open_details = None;
    let mut shown = 0usize;

    egui::ScrollArea::vertical()
        .id_salt("history_table")
        .auto_shrink([false, false])
        .show(ui, |ui| {
            egui::Grid::new("history_grid")
                .num_columns(5)
                .striped(true)
                .min_row_height(theme::ROW_HEIGHT)
                .spacing([16.0, 6.0])
                .show(ui, |ui| {
                    ui.strong(tr.t("history.time"));
                    ui.strong(tr.t("history.processor"));
                    ui.strong(tr.t("history.files"));
                    ui.strong(tr.t("history.status"));
                    ui.strong(tr.t("history.actions"));
                    ui.end_row();

                    for record in state.ledger.filtered(&state.history_filter) {
                        shown += 1;
                        ui.label(record.timestamp.format("%H:%M:%S").to_string())
                            .on_hover_text(record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string());
                        ui.label(&record.processor_name);
                        ui.label(egui::RichText::new(record.input_files.join(", ")).monospace().size(12.0));
                        status_badge(ui, tr, record.status);
                        ui.horizontal(|ui| {
                            if let (Some(artifact), Some(name)) = (&record.output, record.download_name()) {
                                if ui.small_button(tr.t("history.download")).clicked() {
                                    download = Some(SaveRequest {
                                        bytes: artifact.bytes.clone(),
                                        suggested_name: name,
                                    });
                                }
                            }
                            if ui.small_button(tr.t("history.details")).clicked() {
                                open_details = Some(record.id.clone());
                            }
                        });
                        ui.end_row();
                    }
                });

            if shown == 0 {
                ui.add_space(20.0);
                ui.label(egui::RichText::new(tr.t("history.noMatches")).weak());
            }
        });

    if download.is_some() {
        state.pending_save = download;
    }
    if open_details.is_some() {
        state.details_job = open_details;
    }
}

fn status_badge(ui: &mut egui::Ui, tr: &Translator, status: JobStatus) {
    ui.horizontal(|ui| {
        ui.label(
            egui::RichText::new(format!(" {} ", tr.t(status.translation_key())))
                .color(egui::Color32::WHITE)
                .background_color(theme::status_colour(status))
                .small()
                .strong(),
        );
        if status == JobStatus::Processing {
            ui.spinner();
        }
    });
}

/// Render the job details window (if `state.details_job` is set).
pub fn render_details(ctx: &egui::Context, state: &mut AppState) {
    let Some(id) = state.details_job.clone() else {
        return;
    };
    let Some(record) = state.ledger.get(&id) else {
        state.details_job = None;
        return;
    };
    let tr = &state.translator;

    let mut open = true;
    let mut download = None;
    egui::Window::new(tr.t("history.detailsTitle"))
        .open(&mut open)
        .collapsible(false)
        .resizable(true)
        .min_width(420.0)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            detail_grid(ui, tr, record);
            if let (Some(artifact), Some(name)) = (&record.output, record.download_name()) {
                ui.add_space(8.0);
                if ui.button(tr.t("history.download")).clicked() {
                    download = Some(SaveRequest {
                        bytes: artifact.bytes.clone(),
                        suggested_name: name,
                    });
                }
            }
        });

    if download.is_some() {
        state.pending_save = download;
    }
    if !open {
        state.details_job = None;
    }
}

fn detail_grid(ui: &mut egui::Ui, tr: &Translator, record: &JobRecord) {
    egui::Grid::new("job_details")
        .num_columns(2)
        .spacing([16.0, 4.0])
        .show(ui, |ui| {
            ui.label(tr.t("history.jobId"));
            ui.label(egui::RichText::new(record.id.as_str()).monospace());
            ui.end_row();

            ui.label(tr.t("history.processor"));
            ui.label(&record.processor_name);
            ui.end_row();

            ui.label(tr.t("history.time"));
            ui.label(record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string());
            ui.end_row();

            ui.label(tr.t("history.status"));
            status_badge(ui, tr, record.status);
            ui.end_row();

            ui.label(tr.t("history.files"));
            ui.vertical(|ui| {
                for f in &record.input_files {
                    ui.label(egui::RichText::new(f).monospace());
                }
            });
            ui.end_row();

            if let Some(artifact) = &record.output {
                ui.label(tr.t("history.output"));
                ui.label(format!("{} \u{00b7} {}", artifact.extension().to_uppercase(), human_size(artifact.size())));
                ui.end_row();
            }

            if let Some(error) = &record.error {
                ui.label(tr.t("history.error"));
                ui.colored_label(theme::status_colour(JobStatus::Error), error);
                ui.end_row();
            }
        });
}

/// Byte count as B / KB / MB.
fn human_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / (KB * KB))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_size_units() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KB");
        assert_eq!(human_size(3 * 1024 * 1024 / 2), "1.5 MB");
    }
}
