// StockSync - core/model.rs
//
// Core data model types. Pure data definitions with no I/O, no UI,
// no platform dependencies.
//
// These types are the shared vocabulary across all layers.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

// =============================================================================
// Job identity and status
// =============================================================================

/// Opaque, unique identifier of a submitted job.
///
/// Generated once when the ledger record is created and never changed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct JobId(String);

impl JobId {
    /// Build a fresh id from the ledger's sequence number.
    ///
    /// The sequence keeps ids readable in logs; the UUID suffix keeps them
    /// unique even if two ledgers are ever merged.
    pub fn generate(sequence: u64) -> Self {
        Self(format!("job-{sequence}-{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of a job record.
///
/// `Processing` is the only initial state; `Success` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Success,
    Error,
}

impl JobStatus {
    /// Stable lowercase name, used in logs and translation keys.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    /// Translation key for the status badge.
    pub fn translation_key(&self) -> &'static str {
        match self {
            Self::Processing => "status.processing",
            Self::Success => "status.success",
            Self::Error => "status.error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Processing)
    }
}

// =============================================================================
// Files
// =============================================================================

/// A local file chosen by the user for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// Display name (file name component only).
    pub name: String,

    /// Full path on disk; read when the request is sent, not when selected.
    pub path: PathBuf,
}

impl InputFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { name, path }
    }

    /// Lowercase extension without the dot, if any.
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.path)
    }
}

/// Lowercase extension of `path` without the dot.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Whether `path` has one of the `accept` extensions (lowercase, no dot).
/// An empty list accepts anything.
pub fn accepts_extension(path: &Path, accept: &[&str]) -> bool {
    if accept.is_empty() {
        return true;
    }
    extension_of(path).is_some_and(|ext| accept.contains(&ext.as_str()))
}

/// Binary result returned by a successful processing job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub bytes: Vec<u8>,

    /// `Content-Type` reported by the backend (empty if absent).
    pub content_type: String,

    /// File name suggested by the backend via `Content-Disposition`.
    pub file_name: Option<String>,
}

impl Artifact {
    /// File extension to use when saving this artifact.
    ///
    /// Prefers the backend-suggested name, then the content type. MB52 returns
    /// a ZIP when it produces more than one workbook, so the distinction matters.
    pub fn extension(&self) -> &str {
        if let Some(ext) = self
            .file_name
            .as_deref()
            .and_then(|n| n.rsplit_once('.'))
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
        {
            return ext;
        }
        let ct = self.content_type.to_ascii_lowercase();
        if ct.contains("zip") {
            "zip"
        } else if ct.contains("csv") {
            "csv"
        } else {
            "xlsx"
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

// =============================================================================
// Job record
// =============================================================================

/// One entry of the session job history.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: JobId,

    /// Display label of the processor, in the language active at submission.
    pub processor_name: String,

    /// Stable processor identifier (e.g. `mb52`).
    pub processor_key: String,

    /// Creation time.
    pub timestamp: DateTime<Local>,

    pub status: JobStatus,

    /// Source file names, in slot order.
    pub input_files: Vec<String>,

    /// Result artifact; present only once the job succeeded.
    pub output: Option<Artifact>,

    /// Failure message; present only once the job failed.
    pub error: Option<String>,
}

impl JobRecord {
    /// Suggested file name when downloading this record's artifact.
    pub fn download_name(&self) -> Option<String> {
        self.output
            .as_ref()
            .map(|a| format!("{}-{}.{}", self.processor_key, self.id, a.extension()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(content_type: &str, file_name: Option<&str>) -> Artifact {
        Artifact {
            bytes: vec![1, 2, 3],
            content_type: content_type.to_string(),
            file_name: file_name.map(str::to_string),
        }
    }

    #[test]
    fn test_job_ids_are_unique() {
        let a = JobId::generate(1);
        let b = JobId::generate(1);
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("job-1-"));
    }

    #[test]
    fn test_artifact_extension_prefers_backend_name() {
        assert_eq!(artifact("application/zip", Some("MB52-8888.xlsx")).extension(), "xlsx");
        assert_eq!(artifact("application/zip", None).extension(), "zip");
        assert_eq!(artifact("text/csv; charset=utf-8", None).extension(), "csv");
        assert_eq!(artifact("", None).extension(), "xlsx");
    }

    #[test]
    fn test_input_file_name_and_extension() {
        let f = InputFile::from_path("/tmp/exports/MB51_Jan.XLSX");
        assert_eq!(f.name, "MB51_Jan.XLSX");
        assert_eq!(f.extension().as_deref(), Some("xlsx"));
        assert!(accepts_extension(&f.path, &["xlsx", "csv"]));
        assert!(!accepts_extension(&f.path, &["csv"]));
        assert!(accepts_extension(&f.path, &[]));
    }

    #[test]
    fn test_status_terminality() {
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Success.is_terminal());
        assert!(JobStatus::Error.is_terminal());
    }
}
