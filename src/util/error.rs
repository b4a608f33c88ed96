// StockSync - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// Every error keeps its causal chain so it can be logged in full and
// still be rendered as a one-line status message.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all StockSync operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum StockSyncError {
    /// A backend request failed.
    Backend(BackendError),

    /// A job ledger transition was rejected.
    Ledger(LedgerError),

    /// Export operation failed.
    Export(ExportError),

    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// Update feed query failed.
    Update(UpdateError),

    /// A host-side operation (file save, process spawn) failed.
    Host(HostError),

    /// The async runtime could not be started.
    Runtime(io::Error),
}

impl fmt::Display for StockSyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend(e) => write!(f, "Backend error: {e}"),
            Self::Ledger(e) => write!(f, "Job ledger error: {e}"),
            Self::Export(e) => write!(f, "Export error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Update(e) => write!(f, "Update error: {e}"),
            Self::Host(e) => write!(f, "Host error: {e}"),
            Self::Runtime(e) => write!(f, "Async runtime error: {e}"),
        }
    }
}

impl std::error::Error for StockSyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Backend(e) => Some(e),
            Self::Ledger(e) => Some(e),
            Self::Export(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Update(e) => Some(e),
            Self::Host(e) => Some(e),
            Self::Runtime(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Backend errors
// ---------------------------------------------------------------------------

/// Errors raised while talking to the processing backend.
#[derive(Debug)]
pub enum BackendError {
    /// A selected input file could not be read for upload.
    ReadInput { path: PathBuf, source: io::Error },

    /// The HTTP client could not be constructed.
    Client { source: reqwest::Error },

    /// Network failure, timeout, or connection refused.
    Transport {
        endpoint: String,
        source: reqwest::Error,
    },

    /// The backend answered with a non-2xx status.
    Status {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// The backend answered 2xx but the body was not what the endpoint promises.
    MalformedBody { endpoint: String, reason: String },
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadInput { path, source } => {
                write!(f, "Cannot read input file '{}': {source}", path.display())
            }
            Self::Client { source } => write!(f, "Cannot create HTTP client: {source}"),
            Self::Transport { endpoint, source } => {
                write!(f, "Request to '{endpoint}' failed: {source}")
            }
            // The backend message is already user-facing; show it verbatim.
            Self::Status { message, .. } => write!(f, "{message}"),
            Self::MalformedBody { endpoint, reason } => {
                write!(f, "Unexpected response from '{endpoint}': {reason}")
            }
        }
    }
}

impl std::error::Error for BackendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadInput { source, .. } => Some(source),
            Self::Client { source } => Some(source),
            Self::Transport { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<BackendError> for StockSyncError {
    fn from(e: BackendError) -> Self {
        Self::Backend(e)
    }
}

// ---------------------------------------------------------------------------
// Ledger errors
// ---------------------------------------------------------------------------

/// Errors related to job ledger transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// No record with this id exists in the session ledger.
    UnknownJob { id: String },

    /// The record already reached a terminal state.
    AlreadySettled { id: String, status: &'static str },
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownJob { id } => write!(f, "No job with id '{id}'"),
            Self::AlreadySettled { id, status } => {
                write!(f, "Job '{id}' already finished with status '{status}'")
            }
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<LedgerError> for StockSyncError {
    fn from(e: LedgerError) -> Self {
        Self::Ledger(e)
    }
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

/// Errors related to export operations.
#[derive(Debug)]
pub enum ExportError {
    /// Nothing to export (every row was filtered out).
    Empty,

    /// CSV serialisation error.
    Csv { source: csv::Error },

    /// JSON serialisation error.
    Json { source: serde_json::Error },

    /// PNG encoding error.
    Image { source: image::ImageError },

    /// The CSV writer could not hand back its buffer.
    Buffer { reason: String },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Nothing to export: no rows match the current filter"),
            Self::Csv { source } => write!(f, "CSV export error: {source}"),
            Self::Json { source } => write!(f, "JSON export error: {source}"),
            Self::Image { source } => write!(f, "Image export error: {source}"),
            Self::Buffer { reason } => write!(f, "Export buffer error: {reason}"),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Csv { source } => Some(source),
            Self::Json { source } => Some(source),
            Self::Image { source } => Some(source),
            _ => None,
        }
    }
}

impl From<ExportError> for StockSyncError {
    fn from(e: ExportError) -> Self {
        Self::Export(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for StockSyncError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Update errors
// ---------------------------------------------------------------------------

/// Errors related to the release feed query.
#[derive(Debug)]
pub enum UpdateError {
    /// The feed could not be reached.
    Transport { url: String, source: reqwest::Error },

    /// The feed answered with a non-2xx status.
    Status { url: String, status: u16 },

    /// The feed body had no usable `tag_name`.
    MalformedFeed { url: String, reason: String },
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport { url, source } => {
                write!(f, "Cannot reach release feed '{url}': {source}")
            }
            Self::Status { url, status } => {
                write!(f, "Release feed '{url}' responded with status {status}")
            }
            Self::MalformedFeed { url, reason } => {
                write!(f, "Release feed '{url}' returned an unexpected body: {reason}")
            }
        }
    }
}

impl std::error::Error for UpdateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<UpdateError> for StockSyncError {
    fn from(e: UpdateError) -> Self {
        Self::Update(e)
    }
}

// ---------------------------------------------------------------------------
// Host errors
// ---------------------------------------------------------------------------

/// Errors raised by host-side operations.
#[derive(Debug)]
pub enum HostError {
    /// Writing a saved file failed.
    Io { path: PathBuf, source: io::Error },

    /// A child process (backend, updater) could not be started.
    Spawn { program: PathBuf, source: io::Error },
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Cannot write '{}': {source}", path.display())
            }
            Self::Spawn { program, source } => {
                write!(f, "Cannot start '{}': {source}", program.display())
            }
        }
    }
}

impl std::error::Error for HostError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Spawn { source, .. } => Some(source),
        }
    }
}

impl From<HostError> for StockSyncError {
    fn from(e: HostError) -> Self {
        Self::Host(e)
    }
}

/// Convenience type alias for StockSync results.
pub type Result<T> = std::result::Result<T, StockSyncError>;
