// StockSync - core/ledger.rs
//
// Session job ledger: the ordered, in-memory history of submitted jobs.
//
// Rules:
//   - Records are prepended (most recent first) and never removed.
//   - A record is created in `Processing` and moves exactly once to
//     `Success` or `Error`.
//   - The only way to move a record is to hand back the `JobTicket` returned
//     when it was created. Tickets are not `Clone`, so only the submission
//     flow that created a record can settle it, and only once.
//
// The ledger is a plain owned value. The UI thread owns it inside `AppState`
// and passes `&mut` to whichever component creates or settles jobs.

use crate::core::model::{Artifact, JobId, JobRecord, JobStatus};
use crate::util::error::LedgerError;
use chrono::Local;
use std::collections::VecDeque;

/// Exclusive right to settle one ledger record.
#[derive(Debug)]
pub struct JobTicket {
    id: JobId,
}

impl JobTicket {
    pub fn id(&self) -> &JobId {
        &self.id
    }
}

/// Data needed to open a new record.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub processor_name: String,
    pub processor_key: String,
    pub input_files: Vec<String>,
}

/// Terminal outcome of a job.
#[derive(Debug, Clone)]
pub enum JobOutcome {
    Success(Artifact),
    Failed(String),
}

/// Per-status record counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerCounts {
    pub processing: usize,
    pub success: usize,
    pub error: usize,
}

/// In-memory job history for the current session.
#[derive(Debug, Default)]
pub struct JobLedger {
    records: VecDeque<JobRecord>,
    next_sequence: u64,
}

impl JobLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a `Processing` record at the front of the ledger.
    pub fn begin(&mut self, job: NewJob) -> JobTicket {
        self.next_sequence += 1;
        let id = JobId::generate(self.next_sequence);

        tracing::info!(
            job = %id,
            processor = %job.processor_key,
            files = job.input_files.len(),
            "Job submitted"
        );

        self.records.push_front(JobRecord {
            id: id.clone(),
            processor_name: job.processor_name,
            processor_key: job.processor_key,
            timestamp: Local::now(),
            status: JobStatus::Processing,
            input_files: job.input_files,
            output: None,
            error: None,
        });

        JobTicket { id }
    }

    /// Settle the record behind `ticket`.
    ///
    /// Fails without touching anything if the record is unknown or already
    /// terminal.
    pub fn complete(
        &mut self,
        ticket: JobTicket,
        outcome: JobOutcome,
    ) -> Result<&JobRecord, LedgerError> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == ticket.id)
            .ok_or_else(|| LedgerError::UnknownJob {
                id: ticket.id.to_string(),
            })?;

        if record.status.is_terminal() {
            tracing::warn!(job = %record.id, status = record.status.label(), "Ignoring second transition");
            return Err(LedgerError::AlreadySettled {
                id: record.id.to_string(),
                status: record.status.label(),
            });
        }

        match outcome {
            JobOutcome::Success(artifact) => {
                tracing::info!(job = %record.id, bytes = artifact.size(), "Job succeeded");
                record.status = JobStatus::Success;
                record.output = Some(artifact);
            }
            JobOutcome::Failed(message) => {
                tracing::warn!(job = %record.id, error = %message, "Job failed");
                record.status = JobStatus::Error;
                record.error = Some(message);
            }
        }

        Ok(record)
    }

    /// All records, most recent first.
    pub fn records(&self) -> impl Iterator<Item = &JobRecord> {
        self.records.iter()
    }

    pub fn get(&self, id: &JobId) -> Option<&JobRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records matching `filter`, most recent first.
    pub fn filtered<'a>(&'a self, filter: &'a HistoryFilter) -> impl Iterator<Item = &'a JobRecord> {
        self.records.iter().filter(move |r| filter.matches(r))
    }

    pub fn counts(&self) -> LedgerCounts {
        self.records
            .iter()
            .fold(LedgerCounts::default(), |mut acc, r| {
                match r.status {
                    JobStatus::Processing => acc.processing += 1,
                    JobStatus::Success => acc.success += 1,
                    JobStatus::Error => acc.error += 1,
                }
                acc
            })
    }
}

// =============================================================================
// History filtering
// =============================================================================

/// Status chip selected on the history page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Success,
    Error,
    Processing,
}

impl StatusFilter {
    pub fn all() -> &'static [StatusFilter] {
        &[Self::All, Self::Success, Self::Error, Self::Processing]
    }

    pub fn translation_key(&self) -> &'static str {
        match self {
            Self::All => "history.filterAll",
            Self::Success => "history.filterSuccess",
            Self::Error => "history.filterError",
            Self::Processing => "history.filterProcessing",
        }
    }

    fn accepts(&self, status: JobStatus) -> bool {
        match self {
            Self::All => true,
            Self::Success => status == JobStatus::Success,
            Self::Error => status == JobStatus::Error,
            Self::Processing => status == JobStatus::Processing,
        }
    }
}

/// Search text + status filter applied to the history table.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    /// Case-insensitive substring matched against processor name and file names.
    pub search: String,
    pub status: StatusFilter,
}

impl HistoryFilter {
    pub fn matches(&self, record: &JobRecord) -> bool {
        if !self.status.accepts(record.status) {
            return false;
        }
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        record.processor_name.to_lowercase().contains(&needle)
            || record
                .input_files
                .iter()
                .any(|f| f.to_lowercase().contains(&needle))
    }

    pub fn is_active(&self) -> bool {
        self.status != StatusFilter::All || !self.search.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_job(key: &str, files: &[&str]) -> NewJob {
        NewJob {
            processor_name: key.to_uppercase(),
            processor_key: key.to_string(),
            input_files: files.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn artifact(tag: u8) -> Artifact {
        Artifact {
            bytes: vec![tag; 4],
            content_type: "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
                .to_string(),
            file_name: None,
        }
    }

    #[test]
    fn test_begin_creates_processing_record_at_front() {
        let mut ledger = JobLedger::new();
        let first = ledger.begin(new_job("mb52", &["stock.xlsx"]));
        let second = ledger.begin(new_job("mb51", &["moves.xlsx"]));

        let ids: Vec<_> = ledger.records().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![second.id().clone(), first.id().clone()]);
        assert!(ledger.records().all(|r| r.status == JobStatus::Processing));
        assert!(ledger.records().all(|r| r.output.is_none()));
    }

    #[test]
    fn test_complete_success_attaches_artifact() {
        let mut ledger = JobLedger::new();
        let ticket = ledger.begin(new_job("mb52", &["stock.xlsx"]));
        let record = ledger.complete(ticket, JobOutcome::Success(artifact(7))).unwrap();
        assert_eq!(record.status, JobStatus::Success);
        assert_eq!(record.output.as_ref().unwrap().bytes, vec![7; 4]);
        assert!(record.error.is_none());
    }

    #[test]
    fn test_complete_failure_has_no_artifact() {
        let mut ledger = JobLedger::new();
        let ticket = ledger.begin(new_job("mb51", &["moves.xlsx"]));
        let record = ledger
            .complete(ticket, JobOutcome::Failed("boom".to_string()))
            .unwrap();
        assert_eq!(record.status, JobStatus::Error);
        assert!(record.output.is_none());
        assert_eq!(record.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_terminal_status_is_final() {
        let mut ledger = JobLedger::new();
        let ticket = ledger.begin(new_job("mb52", &["stock.xlsx"]));
        let id = ticket.id().clone();
        ledger.complete(ticket, JobOutcome::Failed("first".to_string())).unwrap();

        // A forged second ticket for the same record must be rejected.
        let forged = JobTicket { id: id.clone() };
        let err = ledger
            .complete(forged, JobOutcome::Success(artifact(1)))
            .unwrap_err();
        assert!(matches!(err, LedgerError::AlreadySettled { status: "error", .. }));

        let record = ledger.get(&id).unwrap();
        assert_eq!(record.status, JobStatus::Error);
        assert!(record.output.is_none());
        assert_eq!(record.error.as_deref(), Some("first"));
    }

    #[test]
    fn test_ticket_from_other_ledger_is_unknown() {
        let mut a = JobLedger::new();
        let mut b = JobLedger::new();
        let ticket = a.begin(new_job("mb52", &["x.xlsx"]));
        let err = b.complete(ticket, JobOutcome::Failed("x".to_string())).unwrap_err();
        assert!(matches!(err, LedgerError::UnknownJob { .. }));
    }

    #[test]
    fn test_order_is_by_creation_not_completion() {
        let mut ledger = JobLedger::new();
        let t1 = ledger.begin(new_job("global-orders", &["me2n.xlsx", "ebm.csv"]));
        let t2 = ledger.begin(new_job("mb52", &["stock.xlsx"]));
        let t3 = ledger.begin(new_job("mb51", &["moves.xlsx"]));
        let (id1, id2, id3) = (t1.id().clone(), t2.id().clone(), t3.id().clone());

        // Completion order: 2, 3, 1.
        ledger.complete(t2, JobOutcome::Success(artifact(2))).unwrap();
        ledger.complete(t3, JobOutcome::Failed("bad".to_string())).unwrap();
        ledger.complete(t1, JobOutcome::Success(artifact(1))).unwrap();

        let ids: Vec<_> = ledger.records().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![id3, id2, id1]);
        assert_eq!(
            ledger.counts(),
            LedgerCounts {
                processing: 0,
                success: 2,
                error: 1
            }
        );
    }

    #[test]
    fn test_history_filter_search_and_status() {
        let mut ledger = JobLedger::new();
        let t1 = ledger.begin(new_job("global-orders", &["ME2N_march.xlsx", "ebm.csv"]));
        let _t2 = ledger.begin(new_job("mb52", &["stock.xlsx"]));
        ledger.complete(t1, JobOutcome::Success(artifact(1))).unwrap();

        let by_file = HistoryFilter {
            search: "me2n".to_string(),
            status: StatusFilter::All,
        };
        assert_eq!(ledger.filtered(&by_file).count(), 1);

        let by_name = HistoryFilter {
            search: "MB5".to_string(),
            status: StatusFilter::All,
        };
        assert_eq!(ledger.filtered(&by_name).count(), 1);

        let processing = HistoryFilter {
            search: String::new(),
            status: StatusFilter::Processing,
        };
        let found: Vec<_> = ledger.filtered(&processing).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].processor_key, "mb52");
        assert!(processing.is_active());
        assert!(!HistoryFilter::default().is_active());
    }

    #[test]
    fn test_download_name_uses_key_id_and_extension() {
        let mut ledger = JobLedger::new();
        let ticket = ledger.begin(new_job("mb52", &["stock.xlsx"]));
        let id = ticket.id().clone();
        let zip = Artifact {
            bytes: vec![0x50, 0x4b],
            content_type: "application/zip".to_string(),
            file_name: None,
        };
        ledger.complete(ticket, JobOutcome::Success(zip)).unwrap();
        assert_eq!(
            ledger.get(&id).unwrap().download_name().unwrap(),
            format!("mb52-{id}.zip")
        );
    }
}
