//! Permission monitor.
//!
//! Users can withdraw location permission from the OS settings while a walk is
//! running, and most platforms do not notify the app. The monitor re-validates
//! permission on a fixed cadence while a session is active:
//!
//! ```text
//! start ──(settle 60s)──► check ──(poll 120s)──► check ──► ...
//!                            │
//!                            └─ either flag false ─► Revoked (monitor stops)
//! ```
//!
//! Queries run on a spawned task; the monitor only tracks the schedule and
//! whether a check is in flight, then classifies the result.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::error::ProviderError;
use super::provider::LocationProvider;

/// Default delay between session start and the first check.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(60);

/// Default interval between subsequent checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(120);

/// Answer to a single permission query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Which permission a request concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionScope {
    Foreground,
    Background,
}

impl std::fmt::Display for PermissionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Foreground => write!(f, "foreground"),
            Self::Background => write!(f, "background"),
        }
    }
}

/// Both permission flags as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PermissionState {
    pub foreground: bool,
    pub background: bool,
}

impl PermissionState {
    pub fn granted() -> Self {
        Self {
            foreground: true,
            background: true,
        }
    }

    pub fn fully_granted(&self) -> bool {
        self.foreground && self.background
    }
}

/// Query both permission flags without prompting.
pub async fn query_permission_state<P: LocationProvider>(
    provider: &P,
) -> Result<PermissionState, ProviderError> {
    let foreground = provider.foreground_permission().await?;
    let background = provider.background_permission().await?;
    Ok(PermissionState {
        foreground: foreground.is_granted(),
        background: background.is_granted(),
    })
}

/// Permission monitor configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionMonitorConfig {
    pub settle_delay: Duration,
    pub poll_interval: Duration,
}

impl Default for PermissionMonitorConfig {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Classification of a completed check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionVerdict {
    /// Both flags granted; the next check is scheduled.
    Granted,

    /// A flag is missing; the monitor has stopped itself.
    Revoked(PermissionState),

    /// The query failed; treated as no information and the cadence continues.
    Unknown,

    /// The monitor was stopped while the check was in flight.
    Stale,
}

/// Permission polling schedule.
#[derive(Debug, Clone)]
pub struct PermissionMonitor {
    config: PermissionMonitorConfig,
    running: bool,
    next_check: Option<Instant>,
    in_flight: bool,
    last_state: Option<PermissionState>,
}

impl PermissionMonitor {
    pub fn new() -> Self {
        Self::with_config(PermissionMonitorConfig::default())
    }

    pub fn with_config(config: PermissionMonitorConfig) -> Self {
        Self {
            config,
            running: false,
            next_check: None,
            in_flight: false,
            last_state: None,
        }
    }

    /// Start monitoring; the first check fires after the settle delay.
    pub fn start(&mut self, now: Instant) {
        self.running = true;
        self.in_flight = false;
        self.next_check = Some(now + self.config.settle_delay);
        tracing::debug!(
            settle_secs = self.config.settle_delay.as_secs(),
            "Permission monitor started"
        );
    }

    /// Stop monitoring. Idempotent.
    pub fn stop(&mut self) {
        if self.running {
            tracing::debug!("Permission monitor stopped");
        }
        self.running = false;
        self.in_flight = false;
        self.next_check = None;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// When the next check is due, unless one is already in flight.
    pub fn next_check(&self) -> Option<Instant> {
        if self.running && !self.in_flight {
            self.next_check
        } else {
            None
        }
    }

    /// Claim the due check. Returns false if monitoring is off or a check is in flight.
    pub fn begin_check(&mut self) -> bool {
        if !self.running || self.in_flight {
            return false;
        }
        self.in_flight = true;
        self.next_check = None;
        true
    }

    /// Classify the result of the in-flight check.
    pub fn on_result(
        &mut self,
        result: Result<PermissionState, ProviderError>,
        now: Instant,
    ) -> PermissionVerdict {
        if !self.running || !self.in_flight {
            return PermissionVerdict::Stale;
        }
        self.in_flight = false;

        match result {
            Ok(state) => {
                self.last_state = Some(state);
                if state.fully_granted() {
                    self.next_check = Some(now + self.config.poll_interval);
                    PermissionVerdict::Granted
                } else {
                    self.stop();
                    PermissionVerdict::Revoked(state)
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Permission check failed, will retry");
                self.next_check = Some(now + self.config.poll_interval);
                PermissionVerdict::Unknown
            }
        }
    }

    /// Record a state observed outside the schedule (start, recovery).
    pub fn record(&mut self, state: PermissionState) {
        self.last_state = Some(state);
    }

    pub fn last_state(&self) -> Option<PermissionState> {
        self.last_state
    }
}

impl Default for PermissionMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn revoked_background() -> PermissionState {
        PermissionState {
            foreground: true,
            background: false,
        }
    }

    #[test]
    fn test_first_check_after_settle_delay() {
        let mut monitor = PermissionMonitor::new();
        let t0 = Instant::now();
        monitor.start(t0);

        assert_eq!(monitor.next_check(), Some(t0 + Duration::from_secs(60)));
    }

    #[test]
    fn test_granted_schedules_poll() {
        let mut monitor = PermissionMonitor::new();
        let t0 = Instant::now();
        monitor.start(t0);

        assert!(monitor.begin_check());
        assert!(monitor.next_check().is_none());
        assert!(!monitor.begin_check());

        let t1 = t0 + Duration::from_secs(60);
        let verdict = monitor.on_result(Ok(PermissionState::granted()), t1);
        assert_eq!(verdict, PermissionVerdict::Granted);
        assert_eq!(monitor.next_check(), Some(t1 + Duration::from_secs(120)));
    }

    #[test]
    fn test_revoked_stops_monitor() {
        let mut monitor = PermissionMonitor::new();
        monitor.start(Instant::now());
        monitor.begin_check();

        let verdict = monitor.on_result(Ok(revoked_background()), Instant::now());
        assert_eq!(verdict, PermissionVerdict::Revoked(revoked_background()));
        assert!(!monitor.is_running());
        assert!(monitor.next_check().is_none());
        assert_eq!(monitor.last_state(), Some(revoked_background()));
    }

    #[test]
    fn test_query_error_keeps_cadence() {
        let mut monitor = PermissionMonitor::new();
        let t0 = Instant::now();
        monitor.start(t0);
        monitor.begin_check();

        let verdict = monitor.on_result(Err(ProviderError::Timeout), t0);
        assert_eq!(verdict, PermissionVerdict::Unknown);
        assert!(monitor.is_running());
        assert_eq!(monitor.next_check(), Some(t0 + Duration::from_secs(120)));
    }

    #[test]
    fn test_result_after_stop_is_stale() {
        let mut monitor = PermissionMonitor::new();
        monitor.start(Instant::now());
        monitor.begin_check();
        monitor.stop();

        let verdict = monitor.on_result(Ok(revoked_background()), Instant::now());
        assert_eq!(verdict, PermissionVerdict::Stale);
    }

    #[test]
    fn test_scope_display() {
        assert_eq!(PermissionScope::Foreground.to_string(), "foreground");
        assert!(PermissionStatus::Granted.is_granted());
        assert!(!PermissionStatus::Undetermined.is_granted());
    }
}
