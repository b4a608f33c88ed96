// StockSync - core/submission.rs
//
// File Submission Unit: binds the required input slots of one processor
// card to the files the user picked, gates submission until every slot is
// filled, and drives the ledger record of each submitted job.
//
// The submission is split in two halves so the UI thread can keep owning
// the ledger while the backend call runs on the async runtime:
//   `begin`  -> creates the `Processing` record and returns the request
//   `finish` -> settles the record and resets the card
// `submit` composes both around an awaited backend call.

use crate::core::ledger::{JobLedger, JobOutcome, JobTicket, NewJob};
use crate::core::model::{Artifact, InputFile, JobId, JobStatus};
use crate::core::processor::{InputSlot, ProcessRequest, ProcessorKind};
use crate::util::constants;
use crate::util::error::{BackendError, LedgerError};
use async_trait::async_trait;
use std::collections::HashMap;

/// Anything that can run a processing job to completion.
#[async_trait]
pub trait JobProcessor: Send + Sync {
    async fn process(&self, request: &ProcessRequest) -> Result<Artifact, BackendError>;
}

/// A job whose ledger record exists and whose backend call is about to start.
#[derive(Debug)]
pub struct PendingSubmission {
    pub ticket: JobTicket,
    pub request: ProcessRequest,
}

/// State of one processor card.
#[derive(Debug, Clone)]
pub struct SubmissionUnit {
    kind: ProcessorKind,
    slots: Vec<InputSlot>,
    selections: HashMap<&'static str, InputFile>,
    in_flight: bool,

    /// MB51 reversal movement type; ignored by the other processors.
    pub movement_type: u16,
}

impl SubmissionUnit {
    pub fn new(kind: ProcessorKind) -> Self {
        Self {
            kind,
            slots: kind.slots(),
            selections: HashMap::new(),
            in_flight: false,
            movement_type: constants::DEFAULT_MB51_MOVEMENT_TYPE,
        }
    }

    pub fn kind(&self) -> ProcessorKind {
        self.kind
    }

    pub fn slots(&self) -> &[InputSlot] {
        &self.slots
    }

    /// Assign `file` to `slot_id`.
    ///
    /// Returns false (and changes nothing) for an unknown slot or while a
    /// submission is in flight, since the drop zones are disabled then.
    pub fn select(&mut self, slot_id: &str, file: InputFile) -> bool {
        if self.in_flight {
            return false;
        }
        let Some(slot) = self.slots.iter().find(|s| s.id == slot_id) else {
            return false;
        };
        tracing::debug!(processor = self.kind.key(), slot = slot.id, file = %file.name, "File selected");
        self.selections.insert(slot.id, file);
        true
    }

    pub fn clear_slot(&mut self, slot_id: &str) {
        if !self.in_flight {
            self.selections.remove(slot_id);
        }
    }

    pub fn selection(&self, slot_id: &str) -> Option<&InputFile> {
        self.selections.get(slot_id)
    }

    /// True iff every declared slot has a file.
    pub fn all_ready(&self) -> bool {
        self.slots.iter().all(|s| self.selections.contains_key(s.id))
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn can_submit(&self) -> bool {
        self.all_ready() && !self.in_flight
    }

    /// Open the ledger record and build the backend request.
    ///
    /// Returns `None` without touching the ledger unless every slot is filled
    /// and no submission from this card is in flight.
    pub fn begin(
        &mut self,
        ledger: &mut JobLedger,
        processor_name: impl Into<String>,
    ) -> Option<PendingSubmission> {
        if !self.can_submit() {
            tracing::debug!(
                processor = self.kind.key(),
                ready = self.all_ready(),
                in_flight = self.in_flight,
                "Submission gated"
            );
            return None;
        }

        let files: Vec<(&'static str, InputFile)> = self
            .slots
            .iter()
            .filter_map(|s| self.selections.get(s.id).map(|f| (s.field, f.clone())))
            .collect();

        let ticket = ledger.begin(NewJob {
            processor_name: processor_name.into(),
            processor_key: self.kind.key().to_string(),
            input_files: files.iter().map(|(_, f)| f.name.clone()).collect(),
        });
        self.in_flight = true;

        let mut request = ProcessRequest::new(self.kind, files);
        if self.kind.takes_movement_type() {
            request = request.with_movement_type(self.movement_type);
        }

        Some(PendingSubmission { ticket, request })
    }

    /// Settle the ledger record and reset the card.
    ///
    /// Selections are cleared whatever the outcome so the card is ready for
    /// the next job.
    pub fn finish(
        &mut self,
        ledger: &mut JobLedger,
        ticket: JobTicket,
        result: Result<Artifact, BackendError>,
    ) -> Result<JobStatus, LedgerError> {
        self.in_flight = false;
        self.selections.clear();

        let outcome = match result {
            Ok(artifact) => JobOutcome::Success(artifact),
            Err(e) => JobOutcome::Failed(e.to_string()),
        };
        ledger.complete(ticket, outcome).map(|r| r.status)
    }

    /// Run a whole submission: open the record, await the backend, settle.
    ///
    /// Returns the id of the created record, or `None` when gated.
    pub async fn submit(
        &mut self,
        ledger: &mut JobLedger,
        processor_name: impl Into<String>,
        processor: &dyn JobProcessor,
    ) -> Option<JobId> {
        let pending = self.begin(ledger, processor_name)?;
        let id = pending.ticket.id().clone();
        let result = processor.process(&pending.request).await;
        if let Err(e) = self.finish(ledger, pending.ticket, result) {
            tracing::error!(job = %id, error = %e, "Could not settle job");
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Records every request and answers with a canned result.
    struct FakeProcessor {
        calls: AtomicUsize,
        seen: Mutex<Vec<ProcessRequest>>,
        fail_with: Option<String>,
    }

    impl FakeProcessor {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
                fail_with: None,
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                fail_with: Some(message.to_string()),
                ..Self::ok()
            }
        }
    }

    #[async_trait]
    impl JobProcessor for FakeProcessor {
        async fn process(&self, request: &ProcessRequest) -> Result<Artifact, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.clone());
            match &self.fail_with {
                Some(message) => Err(BackendError::Status {
                    endpoint: request.kind.endpoint().to_string(),
                    status: 500,
                    message: message.clone(),
                }),
                None => Ok(Artifact {
                    bytes: b"PK".to_vec(),
                    content_type: "application/zip".to_string(),
                    file_name: None,
                }),
            }
        }
    }

    fn file(name: &str) -> InputFile {
        InputFile::from_path(format!("/data/{name}"))
    }

    #[tokio::test]
    async fn test_incomplete_slots_create_nothing_and_call_nothing() {
        let mut ledger = JobLedger::new();
        let backend = FakeProcessor::ok();
        let mut unit = SubmissionUnit::new(ProcessorKind::GlobalOrders);
        unit.select("me2n", file("me2n.xlsx"));

        assert!(!unit.all_ready());
        let id = unit.submit(&mut ledger, "Global Orders", &backend).await;

        assert!(id.is_none());
        assert!(ledger.is_empty());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        // Partial selection is kept for the user to complete.
        assert!(unit.selection("me2n").is_some());
    }

    #[test]
    fn test_begin_records_processing_before_backend_runs() {
        let mut ledger = JobLedger::new();
        let mut unit = SubmissionUnit::new(ProcessorKind::Mb52);
        unit.select("mb52", file("stock.xlsx"));

        let pending = unit.begin(&mut ledger, "MB52").unwrap();
        let record = ledger.get(pending.ticket.id()).unwrap();
        assert_eq!(record.status, JobStatus::Processing);
        assert_eq!(record.input_files, vec!["stock.xlsx".to_string()]);
        assert!(unit.in_flight());

        // A second click while in flight is a no-op.
        assert!(unit.begin(&mut ledger, "MB52").is_none());
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn test_successful_submit_settles_once_and_clears_files() {
        let mut ledger = JobLedger::new();
        let backend = FakeProcessor::ok();
        let mut unit = SubmissionUnit::new(ProcessorKind::GlobalOrders);
        unit.select("me2n", file("me2n.xlsx"));
        unit.select("ebm", file("ebm.csv"));

        let id = unit.submit(&mut ledger, "Global Orders", &backend).await.unwrap();

        assert_eq!(ledger.len(), 1);
        let record = ledger.get(&id).unwrap();
        assert_eq!(record.status, JobStatus::Success);
        assert!(record.output.is_some());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert!(!unit.in_flight());
        assert!(unit.selection("me2n").is_none());
        assert!(unit.selection("ebm").is_none());

        let seen = backend.seen.lock().unwrap();
        let fields: Vec<_> = seen[0].files.iter().map(|(f, _)| *f).collect();
        assert_eq!(fields, vec!["me2n_file", "ebm_file"]);
    }

    #[tokio::test]
    async fn test_failed_submit_records_error_and_clears_files() {
        let mut ledger = JobLedger::new();
        let backend = FakeProcessor::failing("Missing required columns");
        let mut unit = SubmissionUnit::new(ProcessorKind::Mb51);
        unit.movement_type = 122;
        unit.select("mb51", file("moves.xlsx"));

        let id = unit.submit(&mut ledger, "MB51", &backend).await.unwrap();

        let record = ledger.get(&id).unwrap();
        assert_eq!(record.status, JobStatus::Error);
        assert!(record.output.is_none());
        assert_eq!(record.error.as_deref(), Some("Missing required columns"));
        assert!(unit.selection("mb51").is_none());
        assert_eq!(backend.seen.lock().unwrap()[0].movement_type, Some(122));
    }

    #[test]
    fn test_select_rejects_unknown_slot_and_in_flight_changes() {
        let mut ledger = JobLedger::new();
        let mut unit = SubmissionUnit::new(ProcessorKind::Mb52);
        assert!(!unit.select("nope", file("a.xlsx")));
        assert!(unit.select("mb52", file("a.xlsx")));
        let _pending = unit.begin(&mut ledger, "MB52").unwrap();
        assert!(!unit.select("mb52", file("b.xlsx")));
        assert_eq!(unit.selection("mb52").unwrap().name, "a.xlsx");
    }

    #[test]
    fn test_interleaved_cards_complete_out_of_order() {
        let mut ledger = JobLedger::new();
        let mut orders = SubmissionUnit::new(ProcessorKind::GlobalOrders);
        let mut mb52 = SubmissionUnit::new(ProcessorKind::Mb52);
        let mut mb51 = SubmissionUnit::new(ProcessorKind::Mb51);
        orders.select("me2n", file("me2n.xlsx"));
        orders.select("ebm", file("ebm.xlsx"));
        mb52.select("mb52", file("stock.xlsx"));
        mb51.select("mb51", file("moves.xlsx"));

        let p1 = orders.begin(&mut ledger, "Global Orders").unwrap();
        let p2 = mb52.begin(&mut ledger, "MB52").unwrap();
        let p3 = mb51.begin(&mut ledger, "MB51").unwrap();
        let ids = [
            p3.ticket.id().clone(),
            p2.ticket.id().clone(),
            p1.ticket.id().clone(),
        ];

        let ok = || {
            Ok(Artifact {
                bytes: vec![1],
                content_type: String::new(),
                file_name: None,
            })
        };
        mb51.finish(&mut ledger, p3.ticket, ok()).unwrap();
        orders.finish(&mut ledger, p1.ticket, ok()).unwrap();
        mb52.finish(
            &mut ledger,
            p2.ticket,
            Err(BackendError::MalformedBody {
                endpoint: "/processors/mb52".to_string(),
                reason: "empty body".to_string(),
            }),
        )
        .unwrap();

        let order: Vec<_> = ledger.records().map(|r| r.id.clone()).collect();
        assert_eq!(order, ids.to_vec());
    }
}
