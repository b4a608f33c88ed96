// StockSync - app/state.rs
//
// Application state. Owns the session job ledger, the processor cards,
// analytics panel state, the update checker and the flags panels use to
// ask the frame loop for side effects (spawning tasks, saving files).
// Owned by the eframe::App implementation; only touched on the UI thread.

use crate::app::tasks::TaskMessage;
use crate::core::analytics::{AnalyticsRegistry, ResultView};
use crate::core::fanout::{FanoutOutcome, FanoutPolicy};
use crate::core::i18n::{Language, Translator};
use crate::core::ledger::{HistoryFilter, JobLedger, JobOutcome};
use crate::core::model::{accepts_extension, InputFile, JobId, JobStatus};
use crate::core::processor::ProcessorKind;
use crate::core::rupture::RuptureSeries;
use crate::core::submission::{PendingSubmission, SubmissionUnit};
use crate::core::update::UpdateChecker;
use crate::platform::host::HostBridge;
use crate::util::error::HostError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Top-level pages reachable from the sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Processors,
    History,
    Analytics,
}

impl Page {
    pub fn all() -> &'static [Page] {
        &[Self::Processors, Self::History, Self::Analytics]
    }

    pub fn translation_key(&self) -> &'static str {
        match self {
            Self::Processors => "nav.processors",
            Self::History => "nav.history",
            Self::Analytics => "nav.analytics",
        }
    }
}

/// Which tab of the stock-rupture result is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuptureTab {
    #[default]
    Chart,
    Data,
}

/// Per-group state of the Analytics page.
#[derive(Debug, Clone)]
pub struct AnalyticsPanel {
    pub group_id: &'static str,
    pub file: Option<InputFile>,
    pub running: bool,
    /// Incremented on every dispatch; results from older runs are dropped.
    pub run: u64,
    pub outcome: Option<FanoutOutcome>,
    /// Parsed stock-rupture series from the latest outcome, if any.
    pub series: Option<RuptureSeries>,
    pub rupture_filter: String,
    pub rupture_tab: RuptureTab,
}

impl AnalyticsPanel {
    fn new(group_id: &'static str) -> Self {
        Self {
            group_id,
            file: None,
            running: false,
            run: 0,
            outcome: None,
            series: None,
            rupture_filter: String::new(),
            rupture_tab: RuptureTab::default(),
        }
    }

    fn clear_results(&mut self) {
        self.outcome = None;
        self.series = None;
        self.rupture_filter.clear();
    }
}

/// Bytes waiting to go through the host save dialog.
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub bytes: Vec<u8>,
    pub suggested_name: String,
}

/// Top-level application state.
pub struct AppState {
    pub page: Page,
    pub translator: Translator,

    /// Session job history.
    pub ledger: JobLedger,

    /// One submission unit per processor card, in `ProcessorKind::all()` order.
    pub cards: Vec<SubmissionUnit>,

    pub history_filter: HistoryFilter,

    /// Record shown in the details window.
    pub details_job: Option<JobId>,

    pub registry: Arc<AnalyticsRegistry>,

    /// One panel per registry group, in registry order.
    pub analytics: Vec<AnalyticsPanel>,

    /// Index into `analytics` of the visible group tab.
    pub active_group: usize,

    pub fanout_policy: FanoutPolicy,

    pub update: UpdateChecker,

    /// Status message for the status bar.
    pub status_message: String,

    /// Non-fatal warnings (config validation, backend startup).
    pub warnings: Vec<String>,

    /// Path of the last file saved through the host, for "show in folder".
    pub last_saved: Option<PathBuf>,

    pub dark_mode: bool,
    pub font_size: f32,
    pub show_about: bool,
    pub show_warnings: bool,

    /// Whether debug mode is enabled.
    pub debug_mode: bool,

    // -- Requests from panels, consumed by the frame loop --
    /// Cards whose submit button was pressed this frame.
    pub pending_jobs: Vec<usize>,
    /// Analytics panel whose run button was pressed.
    pub pending_analytics: Option<usize>,
    pub pending_save: Option<SaveRequest>,
    pub pending_update_check: bool,
    pub pending_begin_update: bool,
}

impl AppState {
    pub fn new(
        registry: Arc<AnalyticsRegistry>,
        language: Language,
        fanout_policy: FanoutPolicy,
        check_updates: bool,
        debug_mode: bool,
    ) -> Self {
        let analytics = registry
            .groups()
            .iter()
            .map(|g| AnalyticsPanel::new(g.id))
            .collect();
        let translator = Translator::new(language);
        let status_message = translator.t("status.ready").to_string();
        Self {
            page: Page::Processors,
            translator,
            ledger: JobLedger::new(),
            cards: ProcessorKind::all()
                .iter()
                .map(|&k| SubmissionUnit::new(k))
                .collect(),
            history_filter: HistoryFilter::default(),
            details_job: None,
            registry,
            analytics,
            active_group: 0,
            fanout_policy,
            update: UpdateChecker::new(Instant::now(), check_updates),
            status_message,
            warnings: Vec::new(),
            last_saved: None,
            dark_mode: false,
            font_size: crate::util::constants::DEFAULT_FONT_SIZE,
            show_about: false,
            show_warnings: false,
            debug_mode,
            pending_jobs: Vec::new(),
            pending_analytics: None,
            pending_save: None,
            pending_update_check: false,
            pending_begin_update: false,
        }
    }

    /// Translate a key in the active language.
    pub fn t<'a>(&'a self, key: &'a str) -> &'a str {
        self.translator.t(key)
    }

    pub fn set_language(&mut self, language: Language) {
        if self.translator.language() != language {
            tracing::info!(language = %language, "UI language changed");
            self.translator = Translator::new(language);
        }
    }

    // =========================================================================
    // Processor jobs
    // =========================================================================

    /// Open a ledger record for card `index`. `None` when the card is gated.
    pub fn begin_job(&mut self, index: usize) -> Option<PendingSubmission> {
        let card = self.cards.get_mut(index)?;
        let name = self.translator.t(card.kind().title_key()).to_string();
        let pending = card.begin(&mut self.ledger, name)?;
        self.status_message = self.translator.tf(
            "status.jobStarted",
            &[("name", self.translator.t(pending.request.kind.title_key()))],
        );
        Some(pending)
    }

    /// Apply one background completion.
    pub fn apply(&mut self, msg: TaskMessage, now: Instant) {
        match msg {
            TaskMessage::JobFinished {
                card,
                ticket,
                result,
            } => {
                let id = ticket.id().clone();
                let Some(unit) = self.cards.get_mut(card) else {
                    tracing::warn!(card, job = %id, "Job finished for unknown card");
                    let outcome = match result {
                        Ok(artifact) => JobOutcome::Success(artifact),
                        Err(e) => JobOutcome::Failed(e.to_string()),
                    };
                    if let Err(e) = self.ledger.complete(ticket, outcome) {
                        tracing::error!(job = %id, error = %e, "Could not settle job");
                    }
                    return;
                };
                let title = self.translator.t(unit.kind().title_key()).to_string();
                let error = result.as_ref().err().map(|e| e.to_string());
                match unit.finish(&mut self.ledger, ticket, result) {
                    Ok(JobStatus::Success) => {
                        self.status_message =
                            self.translator.tf("status.jobSucceeded", &[("name", title.as_str())]);
                    }
                    Ok(_) => {
                        self.status_message = self.translator.tf(
                            "status.jobFailed",
                            &[("name", title.as_str()), ("error", error.as_deref().unwrap_or(""))],
                        );
                    }
                    Err(e) => {
                        tracing::error!(job = %id, error = %e, "Could not settle job");
                    }
                }
            }
            TaskMessage::AnalyticsFinished {
                group,
                run,
                outcome,
            } => {
                let Some(panel) = self.analytics.iter_mut().find(|p| p.group_id == group) else {
                    return;
                };
                if panel.run != run {
                    tracing::debug!(group, run, current = panel.run, "Dropping stale analytics result");
                    return;
                }
                panel.running = false;
                panel.series = outcome.results().and_then(|results| {
                    let g = self.registry.group(group)?;
                    g.implemented()
                        .find(|(info, _)| info.view == ResultView::StockRupture)
                        .and_then(|(info, _)| results.get(info.id))
                        .and_then(RuptureSeries::from_payload)
                });
                self.status_message = match &outcome {
                    FanoutOutcome::Completed { results, failures } if failures.is_empty() => self
                        .translator
                        .tf("analytics.completed", &[("count", results.len().to_string().as_str())]),
                    FanoutOutcome::Completed { failures, .. } => self.translator.tf(
                        "analytics.partial",
                        &[("failed", failures.len().to_string().as_str())],
                    ),
                    FanoutOutcome::NoData { .. } => self.translator.t("analytics.noData").to_string(),
                    FanoutOutcome::Failed(f) => {
                        self.translator.tf("analytics.failed", &[("error", f.message.as_str())])
                    }
                };
                panel.outcome = Some(outcome);
            }
            TaskMessage::UpdateChecked { result } => {
                self.update.finish_check(result, now);
            }
        }
    }

    // =========================================================================
    // Saving
    // =========================================================================

    /// Push the pending save request (if any) through the host dialog.
    ///
    /// Blocks until the user answers. Returns true when a request was handled.
    pub fn save_pending(&mut self, host: &dyn HostBridge) -> bool {
        let Some(request) = self.pending_save.take() else {
            return false;
        };
        let result = host.save_file(&request.bytes, &request.suggested_name);
        let saved = match result {
            Ok(true) => host.last_saved_path(),
            _ => None,
        };
        self.finish_save(&request.suggested_name, result, saved);
        true
    }

    /// Report the outcome of a save. Results and records stay as they were;
    /// only the status line and `last_saved` change.
    pub fn finish_save(
        &mut self,
        suggested_name: &str,
        result: Result<bool, HostError>,
        saved: Option<PathBuf>,
    ) {
        match result {
            Ok(true) => {
                let shown = saved
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| suggested_name.to_string());
                self.status_message = self.translator.tf("status.saved", &[("path", shown.as_str())]);
                self.last_saved = saved;
            }
            Ok(false) => {
                tracing::debug!(name = suggested_name, "Save cancelled");
                self.status_message = self.translator.t("status.saveCancelled").to_string();
            }
            Err(e) => {
                tracing::error!(name = suggested_name, error = %e, "Save failed");
                self.status_message =
                    self.translator.tf("status.saveFailed", &[("error", e.to_string().as_str())]);
            }
        }
    }

    // =========================================================================
    // Analytics
    // =========================================================================

    /// Set the shared input file of panel `index`. Returns false when the
    /// extension is not accepted or a run is in progress.
    pub fn select_analytics_file(&mut self, index: usize, file: InputFile) -> bool {
        let Some(group) = self.analytics.get(index).and_then(|p| self.registry.group(p.group_id))
        else {
            return false;
        };
        let accepted = accepts_extension(&file.path, group.accept);
        let Some(panel) = self.analytics.get_mut(index) else {
            return false;
        };
        if !accepted || panel.running {
            return false;
        }
        panel.file = Some(file);
        panel.clear_results();
        true
    }

    pub fn clear_analytics_file(&mut self, index: usize) {
        if let Some(panel) = self.analytics.get_mut(index) {
            if !panel.running {
                panel.file = None;
                panel.clear_results();
            }
        }
    }

    /// Mark panel `index` as running. Returns what the task needs, or `None`
    /// when there is no file, no implemented module, or a run in progress.
    pub fn begin_analytics(&mut self, index: usize) -> Option<(&'static str, u64, InputFile)> {
        let panel = self.analytics.get(index)?;
        let group = self.registry.group(panel.group_id)?;
        if panel.running || !group.has_implemented() {
            return None;
        }
        let file = panel.file.clone()?;

        let panel = self.analytics.get_mut(index)?;
        panel.running = true;
        panel.run += 1;
        panel.clear_results();
        self.status_message = self.translator.t("analytics.running").to_string();
        Some((panel.group_id, panel.run, file))
    }

    // =========================================================================
    // Drag and drop
    // =========================================================================

    /// Route a file dropped on the window to the visible page.
    ///
    /// Processors: the first empty slot (card order, slot order) that accepts
    /// the extension and whose card is idle. Analytics: the visible group.
    pub fn route_dropped_file(&mut self, path: &Path) -> bool {
        let file = InputFile::from_path(path);
        let routed = match self.page {
            Page::Processors => self.cards.iter_mut().any(|card| {
                if card.in_flight() {
                    return false;
                }
                let slot = card
                    .slots()
                    .iter()
                    .find(|s| card.selection(s.id).is_none() && s.accepts(path))
                    .map(|s| s.id);
                slot.is_some_and(|id| card.select(id, file.clone()))
            }),
            Page::Analytics => self.select_analytics_file(self.active_group, file.clone()),
            Page::History => false,
        };
        if routed {
            tracing::debug!(file = %file.name, page = ?self.page, "Dropped file routed");
        } else {
            self.status_message = self.translator.tf("status.dropRejected", &[("name", file.name.as_str())]);
        }
        routed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analytics::AnalyticFetch;
    use crate::core::fanout::ModuleFailure;
    use crate::core::model::Artifact;
    use crate::util::error::BackendError;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct Unused;

    #[async_trait]
    impl AnalyticFetch for Unused {
        async fn fetch(&self, _file: &InputFile) -> Result<Value, BackendError> {
            Ok(Value::Null)
        }
    }

    fn state() -> AppState {
        AppState::new(
            Arc::new(AnalyticsRegistry::builtin(Arc::new(Unused))),
            Language::En,
            FanoutPolicy::AllOrNothing,
            false,
            false,
        )
    }

    /// Host whose save dialog answers with a fixed outcome.
    struct ScriptedHost {
        answer: fn() -> Result<bool, HostError>,
        saved_to: Option<PathBuf>,
        calls: std::sync::Mutex<Vec<String>>,
    }

    impl ScriptedHost {
        fn new(answer: fn() -> Result<bool, HostError>) -> Self {
            Self {
                answer,
                saved_to: Some(PathBuf::from("/home/user/out.csv")),
                calls: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HostBridge for ScriptedHost {
        fn save_file(&self, _data: &[u8], suggested_name: &str) -> Result<bool, HostError> {
            self.calls.lock().unwrap().push(suggested_name.to_string());
            (self.answer)()
        }

        fn app_version(&self) -> &str {
            "1.2.0"
        }

        async fn check_for_update(&self) -> Result<bool, crate::util::error::UpdateError> {
            Ok(false)
        }

        fn begin_update(&self) -> Result<(), HostError> {
            Ok(())
        }

        fn last_saved_path(&self) -> Option<PathBuf> {
            self.saved_to.clone()
        }
    }

    /// State with a completed stock-rupture result and a pending export.
    fn state_with_export() -> AppState {
        let mut s = state();
        s.analytics[0].series = RuptureSeries::from_payload(&json!({
            "2025-01-02": {"Test": 1, "PDR": 2, "Other": 3},
        }));
        s.pending_save = Some(SaveRequest {
            bytes: b"Date,Test\n".to_vec(),
            suggested_name: "stock-ruptures.csv".into(),
        });
        s
    }

    #[test]
    fn test_job_message_settles_card_and_ledger() {
        let mut s = state();
        s.cards[1].select("mb52", InputFile::from_path("/tmp/mb52.xlsx"));
        let pending = s.begin_job(1).unwrap();
        assert!(s.begin_job(1).is_none(), "card is in flight");

        s.apply(
            TaskMessage::JobFinished {
                card: 1,
                ticket: pending.ticket,
                result: Err(BackendError::Status {
                    endpoint: "/processors/mb52".into(),
                    status: 400,
                    message: "bad sheet".into(),
                }),
            },
            Instant::now(),
        );

        let record = s.ledger.records().next().unwrap();
        assert_eq!(record.status, JobStatus::Error);
        assert_eq!(record.error.as_deref(), Some("bad sheet"));
        assert!(s.status_message.contains("bad sheet"));
        assert!(!s.cards[1].in_flight());
        assert!(s.cards[1].selection("mb52").is_none());
    }

    #[test]
    fn test_unknown_card_still_settles_record() {
        let mut s = state();
        s.cards[1].select("mb52", InputFile::from_path("/tmp/mb52.xlsx"));
        let pending = s.begin_job(1).unwrap();
        s.apply(
            TaskMessage::JobFinished {
                card: 99,
                ticket: pending.ticket,
                result: Ok(Artifact {
                    bytes: b"a,b\n".to_vec(),
                    content_type: "text/csv".into(),
                    file_name: None,
                }),
            },
            Instant::now(),
        );
        assert_eq!(s.ledger.records().next().unwrap().status, JobStatus::Success);
    }

    #[test]
    fn test_save_success_records_path() {
        let mut s = state_with_export();
        let host = ScriptedHost::new(|| Ok(true));
        assert!(s.save_pending(&host));
        assert!(s.pending_save.is_none());
        assert_eq!(host.calls.lock().unwrap().as_slice(), ["stock-ruptures.csv"]);
        assert_eq!(s.last_saved, Some(PathBuf::from("/home/user/out.csv")));
        assert_eq!(s.status_message, "Saved to /home/user/out.csv");
        assert!(!s.save_pending(&host), "nothing left to save");
    }

    #[test]
    fn test_save_cancel_keeps_result_and_previous_path() {
        let mut s = state_with_export();
        s.last_saved = Some(PathBuf::from("/earlier.csv"));
        let before = s.analytics[0].series.clone();
        assert!(s.save_pending(&ScriptedHost::new(|| Ok(false))));
        assert_eq!(s.status_message, "Save cancelled");
        assert_eq!(s.last_saved, Some(PathBuf::from("/earlier.csv")));
        assert_eq!(s.analytics[0].series, before);
        assert!(before.is_some());
    }

    #[test]
    fn test_save_failure_is_reported_not_raised() {
        let mut s = state_with_export();
        let before = s.analytics[0].series.clone();
        let host = ScriptedHost::new(|| {
            Err(HostError::Io {
                path: PathBuf::from("/readonly/out.csv"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            })
        });
        assert!(s.save_pending(&host));
        assert!(s.status_message.starts_with("Could not save file: "));
        assert!(s.status_message.contains("/readonly/out.csv"));
        assert!(s.last_saved.is_none());
        assert_eq!(s.analytics[0].series, before);
    }

    #[test]
    fn test_gated_card_creates_no_record() {
        let mut s = state();
        s.cards[0].select("me2n", InputFile::from_path("/tmp/me2n.xlsx"));
        assert!(s.begin_job(0).is_none());
        assert!(s.ledger.is_empty());
    }

    #[test]
    fn test_analytics_results_parse_rupture_series() {
        let mut s = state();
        assert!(s.select_analytics_file(0, InputFile::from_path("/tmp/etat.xlsx")));
        let (group, run, _) = s.begin_analytics(0).unwrap();
        assert!(s.begin_analytics(0).is_none(), "already running");

        let mut results = crate::core::fanout::AnalyticResults::new();
        results.insert(
            "stock-ruptures".to_string(),
            json!({"2025-01-02": {"Test": 1, "PDR": 2, "Other": 3}}),
        );
        s.apply(
            TaskMessage::AnalyticsFinished {
                group,
                run,
                outcome: FanoutOutcome::Completed {
                    results,
                    failures: Vec::new(),
                },
            },
            Instant::now(),
        );
        let panel = &s.analytics[0];
        assert!(!panel.running);
        assert_eq!(panel.series.as_ref().unwrap().rows().len(), 1);
    }

    #[test]
    fn test_stale_analytics_result_dropped() {
        let mut s = state();
        s.select_analytics_file(0, InputFile::from_path("/tmp/etat.xlsx"));
        let (group, run, _) = s.begin_analytics(0).unwrap();
        s.apply(
            TaskMessage::AnalyticsFinished {
                group,
                run: run + 41,
                outcome: FanoutOutcome::Failed(ModuleFailure {
                    module_id: "stock-ruptures".into(),
                    message: "old".into(),
                }),
            },
            Instant::now(),
        );
        assert!(s.analytics[0].running);
        assert!(s.analytics[0].outcome.is_none());
    }

    #[test]
    fn test_group_without_implemented_modules_never_runs() {
        let mut s = state();
        assert!(s.select_analytics_file(1, InputFile::from_path("/tmp/master.xlsx")));
        assert!(s.begin_analytics(1).is_none());
    }

    #[test]
    fn test_analytics_file_extension_checked() {
        let mut s = state();
        assert!(!s.select_analytics_file(0, InputFile::from_path("/tmp/etat.pdf")));
        assert!(s.analytics[0].file.is_none());
    }

    #[test]
    fn test_dropped_files_fill_first_free_slot() {
        let mut s = state();
        assert!(s.route_dropped_file(Path::new("/tmp/a.xlsx")));
        assert!(s.route_dropped_file(Path::new("/tmp/b.xlsx")));
        assert!(s.route_dropped_file(Path::new("/tmp/c.xlsx")));
        assert_eq!(s.cards[0].selection("me2n").unwrap().name, "a.xlsx");
        assert_eq!(s.cards[0].selection("ebm").unwrap().name, "b.xlsx");
        assert_eq!(s.cards[1].selection("mb52").unwrap().name, "c.xlsx");
        assert!(!s.route_dropped_file(Path::new("/tmp/notes.pdf")));

        s.page = Page::History;
        assert!(!s.route_dropped_file(Path::new("/tmp/d.xlsx")));
    }

    #[test]
    fn test_update_message_feeds_checker() {
        let mut s = state();
        let now = Instant::now();
        assert!(s.update.start_check(now));
        s.apply(TaskMessage::UpdateChecked { result: Ok(true) }, now);
        assert!(s.update.confirm_open);
    }

    #[test]
    fn test_success_message_names_processor() {
        let mut s = state();
        s.cards[2].select("mb51", InputFile::from_path("/tmp/mb51.xlsx"));
        let pending = s.begin_job(2).unwrap();
        assert_eq!(pending.request.movement_type, Some(102));
        s.apply(
            TaskMessage::JobFinished {
                card: 2,
                ticket: pending.ticket,
                result: Ok(Artifact {
                    bytes: vec![1],
                    content_type: String::new(),
                    file_name: None,
                }),
            },
            Instant::now(),
        );
        assert!(s.status_message.contains(s.t("processors.mb51.title")));
    }
}
