// StockSync - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "StockSync";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "StockSync";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Backend
// =============================================================================

/// Base URL of the local processing backend.
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5454";

/// Default backend executable, relative to the application directory.
#[cfg(target_os = "windows")]
pub const DEFAULT_BACKEND_EXECUTABLE: &str = "backend/app.exe";
#[cfg(not(target_os = "windows"))]
pub const DEFAULT_BACKEND_EXECUTABLE: &str = "backend/app";

/// Path of the graceful-shutdown endpoint.
pub const BACKEND_SHUTDOWN_PATH: &str = "/kys";

/// Seconds a single backend request may take before it is treated as a
/// transport failure. Report exports can be large, so the default is generous.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Minimum user-configurable request timeout.
pub const MIN_REQUEST_TIMEOUT_SECS: u64 = 5;

/// Maximum user-configurable request timeout.
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 3_600;

/// Timeout for the best-effort shutdown request sent when the app exits.
pub const SHUTDOWN_REQUEST_TIMEOUT_MS: u64 = 1_500;

// =============================================================================
// Updates
// =============================================================================

/// Release feed queried for the latest published version.
pub const DEFAULT_UPDATE_FEED_URL: &str =
    "https://api.github.com/repos/mehdii000/inventory-hub/releases/latest";

/// Default updater executable, relative to the application directory.
#[cfg(target_os = "windows")]
pub const DEFAULT_UPDATER_PATH: &str = "resources/updater/updater.exe";
#[cfg(not(target_os = "windows"))]
pub const DEFAULT_UPDATER_PATH: &str = "resources/updater/updater";

/// User-Agent sent to the release feed (GitHub rejects anonymous agents).
pub const UPDATE_USER_AGENT: &str = "StockSync-Updater";

/// Timeout for the release feed request.
pub const UPDATE_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Delay after startup before the automatic update check runs (ms).
pub const UPDATE_AUTO_CHECK_DELAY_MS: u64 = 2_000;

/// How long a transient update status (up to date / error) stays visible (ms).
pub const UPDATE_STATUS_RESET_MS: u64 = 3_000;

// =============================================================================
// Processing
// =============================================================================

/// Spreadsheet extensions accepted by every processor and analytics group.
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xls", "csv"];

/// MB51 movement types the backend knows how to reconcile.
/// 102 reverses 101 goods receipts; 122 reverses 121 returns.
pub const MB51_MOVEMENT_TYPES: &[u16] = &[102, 122];

/// Movement type preselected on the MB51 card.
pub const DEFAULT_MB51_MOVEMENT_TYPE: u16 = 102;

/// Maximum number of task messages processed by the UI update loop per frame.
pub const MAX_TASK_MESSAGES_PER_FRAME: usize = 100;

// =============================================================================
// Export
// =============================================================================

/// Default width of an exported chart image in pixels.
pub const CHART_EXPORT_WIDTH: u32 = 1200;

/// Default height of an exported chart image in pixels.
pub const CHART_EXPORT_HEIGHT: u32 = 600;

// =============================================================================
// UI defaults
// =============================================================================

/// Default UI body font size in points.
pub const DEFAULT_FONT_SIZE: f32 = 14.5;

/// Minimum user-configurable UI font size (points).
pub const MIN_FONT_SIZE: f32 = 10.0;

/// Maximum user-configurable UI font size (points).
pub const MAX_FONT_SIZE: f32 = 24.0;

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";
