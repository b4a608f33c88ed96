// StockSync - core/update.rs
//
// Update detection and the sidebar update-checker state machine.
//
// Detection is a literal comparison: the release tag with one leading `v`
// removed must differ from the running version. A lower published version
// therefore also counts as "available".
//
// State machine:
//
//   Idle --check--> Checking --+--> Available --confirm--> Updating
//                              +--> UpToDate  --(3 s)--> Idle
//                              +--> Failed    --(3 s)--> Idle
//
// Timing is driven by the caller passing `Instant`s, so the machine itself
// never sleeps and is fully testable.

use serde_json::Value;
use std::time::{Duration, Instant};

use crate::util::constants;

/// Strip one leading `v`/`V` and surrounding whitespace from a release tag.
pub fn normalize_tag(tag: &str) -> &str {
    let tag = tag.trim();
    tag.strip_prefix(|c: char| c == 'v' || c == 'V').unwrap_or(tag)
}

/// Whether `latest_tag` names a different version than `current`.
pub fn is_update_available(current: &str, latest_tag: &str) -> bool {
    normalize_tag(latest_tag) != current.trim()
}

/// Read `tag_name` from a release feed document.
pub fn tag_from_feed(feed: &Value) -> Option<&str> {
    feed.get("tag_name")?.as_str().filter(|t| !t.trim().is_empty())
}

/// Visible state of the update checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    Idle,
    Checking,
    Available,
    UpToDate,
    Updating,
    Failed(String),
}

impl UpdateStatus {
    pub fn translation_key(&self) -> &'static str {
        match self {
            Self::Idle => "update.check",
            Self::Checking => "update.checking",
            Self::Available => "update.available",
            Self::UpToDate => "update.upToDate",
            Self::Updating => "update.installing",
            Self::Failed(_) => "update.error",
        }
    }

    fn is_transient(&self) -> bool {
        matches!(self, Self::UpToDate | Self::Failed(_))
    }
}

#[derive(Debug, Clone)]
pub struct UpdateChecker {
    status: UpdateStatus,
    entered_at: Instant,
    auto_check_at: Option<Instant>,
    reset_after: Duration,
    /// Whether the "install now?" confirmation is open.
    pub confirm_open: bool,
}

impl UpdateChecker {
    /// New checker. With `auto_check`, a check becomes due shortly after `now`.
    pub fn new(now: Instant, auto_check: bool) -> Self {
        Self {
            status: UpdateStatus::Idle,
            entered_at: now,
            auto_check_at: auto_check
                .then(|| now + Duration::from_millis(constants::UPDATE_AUTO_CHECK_DELAY_MS)),
            reset_after: Duration::from_millis(constants::UPDATE_STATUS_RESET_MS),
            confirm_open: false,
        }
    }

    pub fn status(&self) -> &UpdateStatus {
        &self.status
    }

    /// The check button is disabled while checking or updating.
    pub fn can_check(&self) -> bool {
        !matches!(self.status, UpdateStatus::Checking | UpdateStatus::Updating)
    }

    fn enter(&mut self, status: UpdateStatus, now: Instant) {
        tracing::debug!(from = ?self.status, to = ?status, "Update checker transition");
        self.status = status;
        self.entered_at = now;
    }

    /// Enter `Checking`. Returns false (and does nothing) when not allowed.
    pub fn start_check(&mut self, now: Instant) -> bool {
        if !self.can_check() {
            return false;
        }
        self.auto_check_at = None;
        self.enter(UpdateStatus::Checking, now);
        true
    }

    /// Record the result of a feed query started with [`start_check`].
    ///
    /// [`start_check`]: Self::start_check
    pub fn finish_check(&mut self, result: Result<bool, String>, now: Instant) {
        if self.status != UpdateStatus::Checking {
            return;
        }
        match result {
            Ok(true) => {
                self.confirm_open = true;
                self.enter(UpdateStatus::Available, now);
            }
            Ok(false) => self.enter(UpdateStatus::UpToDate, now),
            Err(message) => self.enter(UpdateStatus::Failed(message), now),
        }
    }

    /// User confirmed the update. Only valid from `Available`.
    pub fn begin_update(&mut self, now: Instant) -> bool {
        if self.status != UpdateStatus::Available {
            return false;
        }
        self.confirm_open = false;
        self.enter(UpdateStatus::Updating, now);
        true
    }

    /// The updater could not be launched.
    pub fn update_failed(&mut self, message: String, now: Instant) {
        self.enter(UpdateStatus::Failed(message), now);
    }

    /// Advance timers. Returns true when the automatic check is due; the
    /// caller should then call [`start_check`](Self::start_check).
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.status.is_transient() && now.duration_since(self.entered_at) >= self.reset_after {
            self.enter(UpdateStatus::Idle, now);
        }
        matches!(self.auto_check_at, Some(at) if now >= at) && self.can_check()
    }

    /// Time until the next timer fires, for scheduling a repaint.
    pub fn next_deadline(&self, now: Instant) -> Option<Duration> {
        let reset = self
            .status
            .is_transient()
            .then(|| (self.entered_at + self.reset_after).saturating_duration_since(now));
        let auto = self.auto_check_at.map(|at| at.saturating_duration_since(now));
        match (reset, auto) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_literal_inequality() {
        assert!(!is_update_available("1.2.0", "v1.2.0"));
        assert!(!is_update_available("1.2.0", "V1.2.0"));
        assert!(!is_update_available("1.2.0", "1.2.0"));
        assert!(is_update_available("1.2.0", "v1.3.0"));
        // Lower versions differ too.
        assert!(is_update_available("1.2.0", "v1.1.0"));
    }

    #[test]
    fn test_only_one_prefix_stripped() {
        assert_eq!(normalize_tag("vv1.0"), "v1.0");
        assert_eq!(normalize_tag(" v2.0 "), "2.0");
    }

    #[test]
    fn test_tag_from_feed() {
        assert_eq!(tag_from_feed(&json!({"tag_name": "v1.3.0"})), Some("v1.3.0"));
        assert_eq!(tag_from_feed(&json!({"tag_name": ""})), None);
        assert_eq!(tag_from_feed(&json!({"name": "x"})), None);
    }

    #[test]
    fn test_auto_check_fires_after_delay() {
        let t0 = Instant::now();
        let mut c = UpdateChecker::new(t0, true);
        assert!(!c.tick(t0));
        let due = t0 + Duration::from_millis(constants::UPDATE_AUTO_CHECK_DELAY_MS);
        assert!(c.tick(due));
        assert!(c.start_check(due));
        // Consumed.
        assert!(!c.tick(due + Duration::from_secs(60)));

        let mut quiet = UpdateChecker::new(t0, false);
        assert!(!quiet.tick(t0 + Duration::from_secs(60)));
    }

    #[test]
    fn test_up_to_date_resets_to_idle() {
        let t0 = Instant::now();
        let mut c = UpdateChecker::new(t0, false);
        assert!(c.start_check(t0));
        assert!(!c.start_check(t0), "second check while checking is refused");
        c.finish_check(Ok(false), t0);
        assert_eq!(c.status(), &UpdateStatus::UpToDate);

        c.tick(t0 + Duration::from_millis(1_000));
        assert_eq!(c.status(), &UpdateStatus::UpToDate);
        c.tick(t0 + Duration::from_millis(constants::UPDATE_STATUS_RESET_MS));
        assert_eq!(c.status(), &UpdateStatus::Idle);
    }

    #[test]
    fn test_available_then_update() {
        let t0 = Instant::now();
        let mut c = UpdateChecker::new(t0, false);
        assert!(!c.begin_update(t0));
        c.start_check(t0);
        c.finish_check(Ok(true), t0);
        assert_eq!(c.status(), &UpdateStatus::Available);
        assert!(c.confirm_open);

        // Available is not transient.
        c.tick(t0 + Duration::from_secs(60));
        assert_eq!(c.status(), &UpdateStatus::Available);

        assert!(c.begin_update(t0));
        assert_eq!(c.status(), &UpdateStatus::Updating);
        assert!(!c.confirm_open);
        assert!(!c.can_check());
    }

    #[test]
    fn test_failure_is_transient() {
        let t0 = Instant::now();
        let mut c = UpdateChecker::new(t0, false);
        c.start_check(t0);
        c.finish_check(Err("offline".into()), t0);
        assert_eq!(c.status(), &UpdateStatus::Failed("offline".into()));
        assert!(c.next_deadline(t0).is_some());
        c.tick(t0 + Duration::from_secs(5));
        assert_eq!(c.status(), &UpdateStatus::Idle);
        assert!(c.next_deadline(t0).is_none());
    }
}
