// StockSync - platform/host.rs
//
// Host bridge: the desktop capabilities the UI needs but the core must not
// touch directly. Native save dialog, running version, release-feed
// query, and handing over to the external updater.

use crate::core::update;
use crate::platform::config::resolve_app_relative;
use crate::util::constants;
use crate::util::error::{HostError, UpdateError};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::time::Duration;

/// Desktop capabilities used by the UI layer.
#[async_trait]
pub trait HostBridge: Send + Sync {
    /// Ask the user where to save `data`, then write it.
    ///
    /// Returns `Ok(false)` when the user cancels the dialog.
    fn save_file(&self, data: &[u8], suggested_name: &str) -> Result<bool, HostError>;

    /// Version of the running application.
    fn app_version(&self) -> &str;

    /// Whether the release feed names a different version than this build.
    async fn check_for_update(&self) -> Result<bool, UpdateError>;

    /// Launch the external updater. The caller closes the window afterwards.
    fn begin_update(&self) -> Result<(), HostError>;

    /// Where the most recent successful `save_file` wrote, if known.
    fn last_saved_path(&self) -> Option<PathBuf> {
        None
    }
}

/// [`HostBridge`] backed by native dialogs, `reqwest` and `std::process`.
#[derive(Debug)]
pub struct DesktopHost {
    http: reqwest::Client,
    feed_url: String,
    updater_path: PathBuf,
    last_saved: Mutex<Option<PathBuf>>,
}

impl DesktopHost {
    pub fn new(feed_url: impl Into<String>, updater_path: impl Into<PathBuf>) -> Self {
        // Builder failure only happens when the TLS backend cannot initialise;
        // the default client then surfaces the same problem on first use.
        let http = reqwest::Client::builder()
            .user_agent(constants::UPDATE_USER_AGENT)
            .timeout(Duration::from_secs(constants::UPDATE_REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Update client builder failed; using defaults");
                reqwest::Client::new()
            });
        Self {
            http,
            feed_url: feed_url.into(),
            updater_path: updater_path.into(),
            last_saved: Mutex::new(None),
        }
    }
}

#[async_trait]
impl HostBridge for DesktopHost {
    fn save_file(&self, data: &[u8], suggested_name: &str) -> Result<bool, HostError> {
        let mut dialog = rfd::FileDialog::new().set_file_name(suggested_name);
        if let Some((_, ext)) = suggested_name.rsplit_once('.') {
            dialog = dialog.add_filter(ext.to_uppercase(), &[ext]);
        }
        match dialog.save_file() {
            Some(path) => {
                write_file(&path, data)?;
                if let Ok(mut last) = self.last_saved.lock() {
                    *last = Some(path);
                }
                Ok(true)
            }
            None => {
                tracing::debug!(name = suggested_name, "Save dialog cancelled");
                Ok(false)
            }
        }
    }

    fn app_version(&self) -> &str {
        constants::APP_VERSION
    }

    async fn check_for_update(&self) -> Result<bool, UpdateError> {
        let tag = fetch_latest_tag(&self.http, &self.feed_url).await?;
        let available = update::is_update_available(self.app_version(), &tag);
        tracing::info!(current = self.app_version(), latest = %tag, available, "Update check finished");
        Ok(available)
    }

    fn begin_update(&self) -> Result<(), HostError> {
        let program = resolve_app_relative(&self.updater_path);
        let mut cmd = Command::new(&program);
        cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
        if let Some(dir) = program.parent().filter(|d| !d.as_os_str().is_empty()) {
            cmd.current_dir(dir);
        }
        let child = cmd.spawn().map_err(|source| HostError::Spawn {
            program: program.clone(),
            source,
        })?;
        tracing::info!(program = %program.display(), pid = child.id(), "Updater launched");
        Ok(())
    }

    fn last_saved_path(&self) -> Option<PathBuf> {
        self.last_saved.lock().ok().and_then(|p| p.clone())
    }
}

/// Write `data` to `path`, creating nothing but the file itself.
pub fn write_file(path: &Path, data: &[u8]) -> Result<(), HostError> {
    std::fs::write(path, data).map_err(|source| HostError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), bytes = data.len(), "File saved");
    Ok(())
}

/// GET the release feed and return its `tag_name`.
pub async fn fetch_latest_tag(http: &reqwest::Client, url: &str) -> Result<String, UpdateError> {
    let response = http
        .get(url)
        .header(reqwest::header::USER_AGENT, constants::UPDATE_USER_AGENT)
        .send()
        .await
        .map_err(|source| UpdateError::Transport {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(UpdateError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let feed: Value = response.json().await.map_err(|e| UpdateError::MalformedFeed {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    update::tag_from_feed(&feed)
        .map(str::to_string)
        .ok_or_else(|| UpdateError::MalformedFeed {
            url: url.to_string(),
            reason: "missing tag_name".to_string(),
        })
}
