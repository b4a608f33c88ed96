// StockSync - gui.rs
//
// Top-level eframe::App implementation.
// Wires together all UI panels, drains background task completions and
// performs the side effects panels request through `AppState` flags.

use crate::app::state::{AppState, Page};
use crate::app::tasks::TaskRunner;
use crate::core::submission::JobProcessor;
use crate::platform::host::HostBridge;
use crate::ui;
use crate::util::constants;
use std::sync::Arc;
use std::time::Instant;

/// The StockSync application.
pub struct StockSyncApp {
    pub state: AppState,
    tasks: TaskRunner,
    host: Arc<dyn HostBridge>,
    processor: Arc<dyn JobProcessor>,
    /// `(dark_mode, font_size)` last pushed into the egui style.
    applied_style: Option<(bool, f32)>,
}

impl StockSyncApp {
    pub fn new(
        ctx: &egui::Context,
        state: AppState,
        runtime: tokio::runtime::Handle,
        host: Arc<dyn HostBridge>,
        processor: Arc<dyn JobProcessor>,
    ) -> Self {
        let mut tasks = TaskRunner::new(runtime);
        tasks.set_repaint_context(ctx.clone());
        Self {
            state,
            tasks,
            host,
            processor,
            applied_style: None,
        }
    }

    /// Push theme and font size into egui when either changed.
    fn apply_style(&mut self, ctx: &egui::Context) {
        let wanted = (self.state.dark_mode, self.state.font_size);
        if self.applied_style == Some(wanted) {
            return;
        }
        let (dark, size) = wanted;
        ctx.set_visuals(if dark {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        });
        ctx.style_mut(|style| {
            for (text_style, font_id) in style.text_styles.iter_mut() {
                font_id.size = match text_style {
                    egui::TextStyle::Small => size * 0.78,
                    egui::TextStyle::Heading => size * 1.5,
                    _ => size,
                };
            }
        });
        self.applied_style = Some(wanted);
        tracing::debug!(dark, font_size = size, "Style applied");
    }

    /// Consume the request flags panels set during the previous frame.
    fn handle_requests(&mut self, ctx: &egui::Context, now: Instant) {
        // Processor submissions.
        for index in std::mem::take(&mut self.state.pending_jobs) {
            if let Some(pending) = self.state.begin_job(index) {
                self.tasks.spawn_job(index, pending, self.processor.clone());
            }
        }

        // Analytics run.
        if let Some(index) = self.state.pending_analytics.take() {
            if let Some((group, run, file)) = self.state.begin_analytics(index) {
                self.tasks.spawn_analytics(
                    self.state.registry.clone(),
                    group,
                    run,
                    file,
                    self.state.fanout_policy,
                );
            }
        }

        // Save through the native dialog. Blocks this frame until the user answers.
        self.state.save_pending(self.host.as_ref());

        // Update check: manual request or the startup timer.
        let manual = std::mem::take(&mut self.state.pending_update_check);
        let due = self.state.update.tick(now);
        if (manual || due) && self.state.update.start_check(now) {
            self.tasks.spawn_update_check(self.host.clone());
        }

        // Confirmed update: launch the updater, then close the window.
        if std::mem::take(&mut self.state.pending_begin_update)
            && self.state.update.begin_update(now)
        {
            match self.host.begin_update() {
                Ok(()) => {
                    tracing::info!("Closing for update");
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Could not launch updater");
                    self.state.update.update_failed(e.to_string(), now);
                }
            }
        }

        if let Some(delay) = self.state.update.next_deadline(now) {
            ctx.request_repaint_after(delay);
        }
    }

    /// Route files dropped onto the window and draw the hover overlay.
    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let hovering = ctx.input(|i| !i.raw.hovered_files.is_empty());
        if hovering && self.state.page != Page::History {
            let screen = ctx.screen_rect();
            let painter = ctx.layer_painter(egui::LayerId::new(
                egui::Order::Foreground,
                egui::Id::new("drop_overlay"),
            ));
            painter.rect_filled(screen, 0.0, egui::Color32::from_black_alpha(150));
            painter.text(
                screen.center(),
                egui::Align2::CENTER_CENTER,
                self.state.translator.t("processors.dropOverlay"),
                egui::FontId::proportional(22.0),
                egui::Color32::WHITE,
            );
        }

        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        for file in dropped {
            if let Some(path) = file.path {
                self.state.route_dropped_file(&path);
            }
        }
    }
}

impl eframe::App for StockSyncApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        self.apply_style(ctx);

        for msg in self.tasks.poll(constants::MAX_TASK_MESSAGES_PER_FRAME) {
            self.state.apply(msg, now);
        }

        self.handle_requests(ctx, now);
        self.handle_dropped_files(ctx);

        // Top menu bar
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                let tr = &self.state.translator;
                ui.menu_button(tr.t("menu.file"), |ui| {
                    if ui.button(tr.t("menu.exit")).clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
                ui.menu_button(tr.t("menu.view"), |ui| {
                    ui.checkbox(&mut self.state.dark_mode, tr.t("menu.darkMode"));
                    ui.horizontal(|ui| {
                        ui.label(tr.t("menu.fontSize"));
                        ui.add(
                            egui::Slider::new(
                                &mut self.state.font_size,
                                constants::MIN_FONT_SIZE..=constants::MAX_FONT_SIZE,
                            )
                            .step_by(0.5),
                        );
                    });
                    ui.separator();
                    let label = format!("{} ({})", tr.t("menu.warnings"), self.state.warnings.len());
                    if ui.button(label).clicked() {
                        self.state.show_warnings = true;
                        ui.close_menu();
                    }
                });
                ui.menu_button(tr.t("menu.help"), |ui| {
                    if ui
                        .add_enabled(self.state.update.can_check(), egui::Button::new(tr.t("update.check")))
                        .clicked()
                    {
                        self.state.pending_update_check = true;
                        ui.close_menu();
                    }
                    if ui.button(tr.t("about.title")).clicked() {
                        self.state.show_about = true;
                        ui.close_menu();
                    }
                });
            });
        });

        // Status bar
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let tr = &self.state.translator;
                let counts = self.state.ledger.counts();
                if counts.processing > 0 {
                    ui.spinner();
                    ui.separator();
                }
                ui.label(&self.state.status_message);
                if let Some(path) = &self.state.last_saved {
                    if ui.small_button(tr.t("status.showInFolder")).clicked() {
                        crate::platform::fs::reveal_in_file_manager(path);
                    }
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if !self.state.warnings.is_empty()
                        && ui
                            .small_button(format!("\u{26a0} {}", self.state.warnings.len()))
                            .clicked()
                    {
                        self.state.show_warnings = true;
                    }
                    if self.state.debug_mode {
                        ui.label(egui::RichText::new("DEBUG").small().weak());
                    }
                });
            });
        });

        egui::SidePanel::left("sidebar")
            .exact_width(ui::theme::SIDEBAR_WIDTH)
            .resizable(false)
            .show(ctx, |ui| {
                ui::panels::sidebar::render(ui, &mut self.state);
            });

        egui::CentralPanel::default().show(ctx, |ui| match self.state.page {
            Page::Processors => ui::panels::processors::render(ui, &mut self.state),
            Page::History => ui::panels::history::render(ui, &mut self.state),
            Page::Analytics => ui::panels::analytics::render(ui, &mut self.state),
        });

        // Dialogs
        ui::panels::history::render_details(ctx, &mut self.state);
        ui::panels::update::render(ctx, &mut self.state);
        ui::panels::warnings::render(ctx, &mut self.state);
        ui::panels::about::render(ctx, &mut self.state);
    }

    /// Called by eframe when the application window is about to close.
    ///
    /// Backend shutdown happens in `main` once `run_native` returns.
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        let counts = self.state.ledger.counts();
        if counts.processing > 0 {
            tracing::warn!(in_flight = counts.processing, "Closing with jobs still processing");
        }
        tracing::info!(jobs = self.state.ledger.len(), "Window closing");
    }
}
