// StockSync - platform/config.rs
//
// Platform-specific configuration directory resolution and config.toml
// loading with startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::core::fanout::FanoutPolicy;
use crate::core::i18n::Language;
use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for StockSync configuration and data.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/stocksync/ or %APPDATA%\StockSync\config\)
    pub config_dir: PathBuf,

    /// Data directory for log files.
    pub data_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to the current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            let data_dir = proj_dirs.data_dir().to_path_buf();

            tracing::debug!(
                config = %config_dir.display(),
                data = %data_dir.display(),
                "Platform paths resolved"
            );

            Self {
                config_dir,
                data_dir,
            }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            let fallback = PathBuf::from(".");
            Self {
                config_dir: fallback.clone(),
                data_dir: fallback,
            }
        }
    }
}

/// Resolve `path` against the directory holding the running executable.
///
/// Absolute paths are returned unchanged. The backend and updater ship next
/// to the application binary, so relative config values are anchored there
/// rather than at the working directory.
pub fn resolve_app_relative(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_exe() {
        Ok(exe) => exe.parent().map_or_else(|| path.to_path_buf(), |dir| dir.join(path)),
        Err(e) => {
            tracing::debug!(error = %e, "current_exe unavailable; using path as given");
            path.to_path_buf()
        }
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored, so a newer config file still loads in
/// an older binary.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub backend: BackendSection,
    pub update: UpdateSection,
    pub ui: UiSection,
    pub analytics: AnalyticsSection,
    pub logging: LoggingSection,
}

/// `[backend]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct BackendSection {
    /// Base URL of the processing backend.
    pub url: Option<String>,
    /// Backend executable (relative paths resolve next to the app binary).
    pub executable: Option<String>,
    /// Spawn the backend on startup.
    pub autostart: Option<bool>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
}

/// `[update]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct UpdateSection {
    pub feed_url: Option<String>,
    pub updater_path: Option<String>,
    pub check_on_startup: Option<bool>,
}

/// `[ui]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct UiSection {
    /// Theme: "dark" or "light".
    pub theme: Option<String>,
    /// Language code: "en" or "fr".
    pub language: Option<String>,
    /// Body font size in points.
    pub font_size: Option<f32>,
}

/// `[analytics]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct AnalyticsSection {
    /// "all-or-nothing" or "tolerate-failures".
    pub fanout_policy: Option<String>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
    /// Log file path (empty = stderr only).
    pub file: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // -- Backend --
    pub backend_url: String,
    pub backend_executable: PathBuf,
    pub backend_autostart: bool,
    pub request_timeout_secs: u64,

    // -- Update --
    pub update_feed_url: String,
    pub updater_path: PathBuf,
    pub check_updates_on_startup: bool,

    // -- UI --
    /// Dark mode (true) or light mode (false).
    pub dark_mode: bool,
    pub language: Language,
    /// Body font size in points.
    pub font_size: f32,

    // -- Analytics --
    pub fanout_policy: FanoutPolicy,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
    /// Log file path.
    pub log_file: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: constants::DEFAULT_BACKEND_URL.to_string(),
            backend_executable: PathBuf::from(constants::DEFAULT_BACKEND_EXECUTABLE),
            backend_autostart: true,
            request_timeout_secs: constants::DEFAULT_REQUEST_TIMEOUT_SECS,
            update_feed_url: constants::DEFAULT_UPDATE_FEED_URL.to_string(),
            updater_path: PathBuf::from(constants::DEFAULT_UPDATER_PATH),
            check_updates_on_startup: true,
            dark_mode: false,
            language: Language::default(),
            font_size: constants::DEFAULT_FONT_SIZE,
            fanout_policy: FanoutPolicy::default(),
            log_level: None,
            log_file: None,
        }
    }
}

fn is_http_url(value: &str) -> bool {
    let v = value.trim();
    (v.starts_with("http://") || v.starts_with("https://")) && v.len() > "https://".len()
}

/// Load and validate `config.toml` from the given config directory.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// If the file does not exist, returns defaults with no warnings (first run).
/// If the file is unparseable, returns defaults with a warning so the
/// application still starts but the user is informed.
pub fn load_config(config_dir: &Path) -> (AppConfig, Vec<String>) {
    let config_path = config_dir.join(constants::CONFIG_FILE_NAME);

    let mut warnings: Vec<String> = Vec::new();

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), warnings);
    }

    let content = match std::fs::read_to_string(&config_path) {
        Ok(c) => c,
        Err(source) => {
            let err = ConfigError::Io {
                path: config_path.clone(),
                source,
            };
            let msg = format!("{err}. Using defaults.");
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    let raw: RawConfig = match toml::from_str(&content) {
        Ok(r) => r,
        Err(source) => {
            let err = ConfigError::TomlParse {
                path: config_path.clone(),
                source,
            };
            let msg = format!("Failed to parse config file. {err}. Using defaults.");
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    tracing::info!(path = %config_path.display(), "Loaded config.toml");

    let (config, mut validation) = validate(raw);
    warnings.append(&mut validation);

    if !warnings.is_empty() {
        tracing::warn!(count = warnings.len(), "Config validation produced warnings");
    }

    (config, warnings)
}

/// Validate every field against named constants, accumulating all warnings.
pub fn validate(raw: RawConfig) -> (AppConfig, Vec<String>) {
    let mut config = AppConfig::default();
    let mut warnings = Vec::new();

    // -- Backend: url --
    if let Some(url) = raw.backend.url {
        if is_http_url(&url) {
            config.backend_url = url.trim().trim_end_matches('/').to_string();
        } else {
            warnings.push(format!(
                "[backend] url = \"{url}\" is not an http(s) URL. Using default ({}).",
                constants::DEFAULT_BACKEND_URL,
            ));
        }
    }

    // -- Backend: executable --
    if let Some(exe) = raw.backend.executable {
        if exe.trim().is_empty() {
            warnings.push(format!(
                "[backend] executable is empty. Using default ({}).",
                constants::DEFAULT_BACKEND_EXECUTABLE,
            ));
        } else {
            config.backend_executable = PathBuf::from(exe.trim());
        }
    }

    if let Some(autostart) = raw.backend.autostart {
        config.backend_autostart = autostart;
    }

    // -- Backend: request_timeout_secs --
    if let Some(secs) = raw.backend.request_timeout_secs {
        if (constants::MIN_REQUEST_TIMEOUT_SECS..=constants::MAX_REQUEST_TIMEOUT_SECS).contains(&secs) {
            config.request_timeout_secs = secs;
        } else {
            let err = ConfigError::ValueOutOfRange {
                field: "backend.request_timeout_secs".to_string(),
                value: secs.to_string(),
                expected: format!(
                    "{}-{}",
                    constants::MIN_REQUEST_TIMEOUT_SECS,
                    constants::MAX_REQUEST_TIMEOUT_SECS
                ),
            };
            warnings.push(format!(
                "{err}. Using default ({}).",
                constants::DEFAULT_REQUEST_TIMEOUT_SECS
            ));
        }
    }

    // -- Update --
    if let Some(feed) = raw.update.feed_url {
        if is_http_url(&feed) {
            config.update_feed_url = feed.trim().to_string();
        } else {
            warnings.push(format!(
                "[update] feed_url = \"{feed}\" is not an http(s) URL. Using default.",
            ));
        }
    }
    if let Some(path) = raw.update.updater_path {
        if !path.trim().is_empty() {
            config.updater_path = PathBuf::from(path.trim());
        }
    }
    if let Some(check) = raw.update.check_on_startup {
        config.check_updates_on_startup = check;
    }

    // -- UI: theme --
    if let Some(ref theme) = raw.ui.theme {
        match theme.to_lowercase().as_str() {
            "dark" => config.dark_mode = true,
            "light" => config.dark_mode = false,
            other => {
                warnings.push(format!(
                    "[ui] theme = \"{other}\" is not recognised. Expected \"dark\" or \"light\". Using default (light).",
                ));
            }
        }
    }

    // -- UI: language --
    if let Some(ref code) = raw.ui.language {
        match Language::parse(code) {
            Some(lang) => config.language = lang,
            None => warnings.push(format!(
                "[ui] language = \"{code}\" is not supported. Expected \"en\" or \"fr\". Using default (en).",
            )),
        }
    }

    // -- UI: font_size --
    if let Some(size) = raw.ui.font_size {
        if (constants::MIN_FONT_SIZE..=constants::MAX_FONT_SIZE).contains(&size) {
            config.font_size = size;
        } else {
            let err = ConfigError::ValueOutOfRange {
                field: "ui.font_size".to_string(),
                value: size.to_string(),
                expected: format!("{}-{}", constants::MIN_FONT_SIZE, constants::MAX_FONT_SIZE),
            };
            warnings.push(format!("{err}. Using default ({}).", constants::DEFAULT_FONT_SIZE));
        }
    }

    // -- Analytics: fanout_policy --
    if let Some(ref policy) = raw.analytics.fanout_policy {
        match FanoutPolicy::parse(policy) {
            Some(p) => config.fanout_policy = p,
            None => warnings.push(format!(
                "[analytics] fanout_policy = \"{policy}\" is not recognised. \
                 Expected \"all-or-nothing\" or \"tolerate-failures\". Using default (all-or-nothing).",
            )),
        }
    }

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.clone());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    // -- Logging: file --
    if let Some(ref file) = raw.logging.file {
        if !file.is_empty() {
            config.log_file = Some(file.clone());
        }
    }

    (config, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn load(toml: &str) -> (AppConfig, Vec<String>) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(constants::CONFIG_FILE_NAME), toml).unwrap();
        load_config(dir.path())
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let (config, warnings) = load_config(dir.path());
        assert!(warnings.is_empty());
        assert_eq!(config.backend_url, constants::DEFAULT_BACKEND_URL);
        assert_eq!(config.fanout_policy, FanoutPolicy::AllOrNothing);
        assert!(config.backend_autostart);
    }

    #[test]
    fn test_unparseable_file_warns_and_defaults() {
        let (config, warnings) = load("[backend\nurl = ");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Failed to parse"));
        assert_eq!(config.request_timeout_secs, constants::DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn test_valid_values_applied() {
        let (config, warnings) = load(
            r#"
[backend]
url = "http://localhost:9000/"
autostart = false
request_timeout_secs = 60

[ui]
theme = "dark"
language = "fr"
font_size = 16.0

[analytics]
fanout_policy = "tolerate-failures"

[logging]
level = "debug"
"#,
        );
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(config.backend_url, "http://localhost:9000");
        assert!(!config.backend_autostart);
        assert_eq!(config.request_timeout_secs, 60);
        assert!(config.dark_mode);
        assert_eq!(config.language, Language::Fr);
        assert_eq!(config.font_size, 16.0);
        assert_eq!(config.fanout_policy, FanoutPolicy::TolerateFailures);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_invalid_values_each_warn() {
        let (config, warnings) = load(
            r#"
[backend]
url = "ftp://nope"
request_timeout_secs = 1

[ui]
theme = "neon"
language = "de"

[analytics]
fanout_policy = "sometimes"
"#,
        );
        assert_eq!(warnings.len(), 5, "{warnings:?}");
        assert_eq!(config.backend_url, constants::DEFAULT_BACKEND_URL);
        assert_eq!(config.language, Language::En);
        assert_eq!(config.fanout_policy, FanoutPolicy::AllOrNothing);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let (_, warnings) = load("[future]\nshiny = true\n");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_absolute_paths_not_rebased() {
        let dir = TempDir::new().unwrap();
        assert_eq!(resolve_app_relative(dir.path()), dir.path());
    }
}
