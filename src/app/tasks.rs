// StockSync - app/tasks.rs
//
// Background task plumbing. Backend calls, analytics runs and update checks
// run on the tokio runtime; each sends exactly one `TaskMessage` back over
// an mpsc channel, which the UI thread drains once per frame.
//
// Architecture:
//   - `TaskRunner` lives on the UI thread and owns the receiver.
//   - Spawned tasks own a `Sender` clone and everything they need by value
//     (the ledger ticket travels out and back inside the message).
//   - The ledger is never touched off the UI thread.

use crate::core::analytics::AnalyticsRegistry;
use crate::core::fanout::{self, FanoutOutcome, FanoutPolicy};
use crate::core::ledger::JobTicket;
use crate::core::model::{Artifact, InputFile};
use crate::core::submission::{JobProcessor, PendingSubmission};
use crate::platform::host::HostBridge;
use crate::util::error::BackendError;
use std::sync::{mpsc, Arc};
use tokio::runtime::Handle;

/// Completion of one background task.
#[derive(Debug)]
pub enum TaskMessage {
    /// A processor job settled. `card` indexes `AppState::cards`.
    JobFinished {
        card: usize,
        ticket: JobTicket,
        result: Result<Artifact, BackendError>,
    },

    /// An analytics run settled. `run` guards against stale results when the
    /// user changed the input file in the meantime.
    AnalyticsFinished {
        group: &'static str,
        run: u64,
        outcome: FanoutOutcome,
    },

    /// The release feed answered (or failed).
    UpdateChecked { result: Result<bool, String> },
}

/// Spawns background work and collects its completions.
pub struct TaskRunner {
    runtime: Handle,
    tx: mpsc::Sender<TaskMessage>,
    rx: mpsc::Receiver<TaskMessage>,
    /// Woken when a message is sent so results appear without input events.
    repaint: Option<egui::Context>,
}

impl TaskRunner {
    pub fn new(runtime: Handle) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            runtime,
            tx,
            rx,
            repaint: None,
        }
    }

    pub fn set_repaint_context(&mut self, ctx: egui::Context) {
        self.repaint = Some(ctx);
    }

    fn sender(&self) -> Reporter {
        Reporter {
            tx: self.tx.clone(),
            repaint: self.repaint.clone(),
        }
    }

    /// Send `pending.request` to the backend.
    pub fn spawn_job(
        &self,
        card: usize,
        pending: PendingSubmission,
        processor: Arc<dyn JobProcessor>,
    ) {
        let reporter = self.sender();
        tracing::info!(
            job = %pending.ticket.id(),
            processor = pending.request.kind.key(),
            files = pending.request.files.len(),
            "Job dispatched"
        );
        self.runtime.spawn(async move {
            let PendingSubmission { ticket, request } = pending;
            let result = processor.process(&request).await;
            reporter.send(TaskMessage::JobFinished {
                card,
                ticket,
                result,
            });
        });
    }

    /// Run every implemented module of `group_id` against `file`.
    pub fn spawn_analytics(
        &self,
        registry: Arc<AnalyticsRegistry>,
        group_id: &'static str,
        run: u64,
        file: InputFile,
        policy: FanoutPolicy,
    ) {
        let reporter = self.sender();
        tracing::info!(group = group_id, run, file = %file.name, "Analytics dispatched");
        self.runtime.spawn(async move {
            let outcome = match registry.group(group_id) {
                Some(group) => fanout::run_with_policy(group, &file, policy).await,
                None => FanoutOutcome::NoData {
                    failures: Vec::new(),
                },
            };
            reporter.send(TaskMessage::AnalyticsFinished {
                group: group_id,
                run,
                outcome,
            });
        });
    }

    /// Query the release feed through the host.
    pub fn spawn_update_check(&self, host: Arc<dyn HostBridge>) {
        let reporter = self.sender();
        self.runtime.spawn(async move {
            let result = host.check_for_update().await.map_err(|e| e.to_string());
            if let Err(ref e) = result {
                tracing::warn!(error = %e, "Update check failed");
            }
            reporter.send(TaskMessage::UpdateChecked { result });
        });
    }

    /// Drain up to `max` pending messages without blocking.
    pub fn poll(&self, max: usize) -> Vec<TaskMessage> {
        let mut messages = Vec::new();
        while messages.len() < max {
            match self.rx.try_recv() {
                Ok(msg) => messages.push(msg),
                Err(_) => break,
            }
        }
        messages
    }
}

/// Sending half handed to a spawned task.
struct Reporter {
    tx: mpsc::Sender<TaskMessage>,
    repaint: Option<egui::Context>,
}

impl Reporter {
    fn send(self, msg: TaskMessage) {
        if self.tx.send(msg).is_err() {
            // Receiver dropped (window closed); nothing left to update.
            tracing::debug!("Task finished after UI shutdown");
            return;
        }
        if let Some(ctx) = self.repaint {
            ctx.request_repaint();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::JobLedger;
    use crate::core::model::JobStatus;
    use crate::core::processor::ProcessorKind;
    use crate::core::submission::SubmissionUnit;
    use async_trait::async_trait;
    use crate::core::processor::ProcessRequest;
    use std::time::{Duration, Instant};

    struct Echo;

    #[async_trait]
    impl JobProcessor for Echo {
        async fn process(&self, request: &ProcessRequest) -> Result<Artifact, BackendError> {
            Ok(Artifact {
                bytes: request.kind.key().as_bytes().to_vec(),
                content_type: "text/csv".into(),
                file_name: None,
            })
        }
    }

    fn wait_for(runner: &TaskRunner) -> TaskMessage {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(msg) = runner.poll(1).pop() {
                return msg;
            }
            assert!(Instant::now() < deadline, "no task message within 5 s");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_job_round_trip_through_channel() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let runner = TaskRunner::new(rt.handle().clone());
        let mut ledger = JobLedger::new();
        let mut unit = SubmissionUnit::new(ProcessorKind::Mb52);
        unit.select("mb52", InputFile::from_path("/tmp/mb52.xlsx"));

        let pending = unit.begin(&mut ledger, "MB52").unwrap();
        let id = pending.ticket.id().clone();
        runner.spawn_job(0, pending, Arc::new(Echo));
        assert_eq!(ledger.get(&id).unwrap().status, JobStatus::Processing);

        match wait_for(&runner) {
            TaskMessage::JobFinished { card, ticket, result } => {
                assert_eq!(card, 0);
                assert_eq!(unit.finish(&mut ledger, ticket, result), Ok(JobStatus::Success));
            }
            other => panic!("unexpected message {other:?}"),
        }
        assert_eq!(ledger.get(&id).unwrap().output.as_ref().unwrap().bytes, b"mb52");
    }

    #[test]
    fn test_unknown_group_reports_no_data() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let runner = TaskRunner::new(rt.handle().clone());
        let registry = Arc::new(AnalyticsRegistry::new(Vec::new()));
        runner.spawn_analytics(
            registry,
            "missing",
            7,
            InputFile::from_path("/tmp/x.xlsx"),
            FanoutPolicy::AllOrNothing,
        );
        match wait_for(&runner) {
            TaskMessage::AnalyticsFinished { group, run, outcome } => {
                assert_eq!(group, "missing");
                assert_eq!(run, 7);
                assert!(matches!(outcome, FanoutOutcome::NoData { .. }));
            }
            other => panic!("unexpected message {other:?}"),
        }
    }
}
