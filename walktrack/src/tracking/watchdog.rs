//! GPS signal watchdog and recovery controller.
//!
//! The watchdog notices when the main subscription stops delivering fixes
//! (tunnels, urban canyons, OS throttling) and drives a bounded recovery
//! protocol of one-shot probes.
//!
//! # State machine
//!
//! ```text
//!            accepted fix resets the 30s deadline
//!   Armed ◄──────────────────────────────────────┐
//!     │ deadline                                  │
//!     ▼                                           │ valid probe fix
//!   Recovering ── attempt 1 (now) ── attempt 2 (+10s) ── ... ── attempt 5
//!     │                                                         │ fails
//!     │ services disabled                                       ▼
//!     ▼                                                     Exhausted
//!   ServicesDisabled
//! ```
//!
//! Probes run on spawned tasks. The watchdog only tracks the schedule, the
//! attempt count and whether a probe is in flight; the engine applies the
//! resulting [`RecoveryStep`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::error::ProviderError;
use super::provider::{LocationProvider, PositionOptions};
use super::sample::RawLocation;

/// Default silence before the signal is considered lost.
pub const DEFAULT_SIGNAL_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of probes before giving up.
pub const DEFAULT_MAX_RECOVERY_ATTEMPTS: u32 = 5;

/// Default spacing between probes.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// Default bound on a single probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// Watchdog configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchdogConfig {
    pub signal_timeout: Duration,
    pub max_recovery_attempts: u32,
    pub retry_interval: Duration,
    pub probe_timeout: Duration,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            signal_timeout: DEFAULT_SIGNAL_TIMEOUT,
            max_recovery_attempts: DEFAULT_MAX_RECOVERY_ATTEMPTS,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

/// Recovery progress as exposed in engine status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryState {
    pub is_recovering: bool,
    pub attempts: u32,
}

/// Result of one recovery probe.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// The provider returned a fix.
    Position(RawLocation),

    /// Device location services are off.
    ServicesDisabled,

    /// The probe failed or timed out.
    Failed(String),
}

/// What the engine should do after a probe result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecoveryStep {
    /// Signal is back; the watchdog has re-armed itself.
    Restored,

    /// Try again at the given instant.
    RetryAt(Instant),

    /// All attempts failed; the watchdog is idle.
    Exhausted,

    /// Services are off; the watchdog is idle.
    ServicesDisabled,

    /// Result of a probe the watchdog no longer waits for.
    Stale,
}

/// Run one recovery probe against the provider.
///
/// Checks service availability first; only if services are on does it request
/// a one-shot fix, bounded by `timeout`.
pub async fn probe_position<P: LocationProvider>(
    provider: &P,
    options: PositionOptions,
    timeout: Duration,
) -> ProbeOutcome {
    match provider.is_service_enabled().await {
        Ok(false) => return ProbeOutcome::ServicesDisabled,
        Ok(true) => {}
        Err(e) => {
            tracing::debug!(error = %e, "Service state unknown, probing anyway");
        }
    }

    match tokio::time::timeout(timeout, provider.get_once(options)).await {
        Ok(Ok(raw)) => ProbeOutcome::Position(raw),
        Ok(Err(ProviderError::Unavailable)) => ProbeOutcome::ServicesDisabled,
        Ok(Err(e)) => ProbeOutcome::Failed(e.to_string()),
        Err(_) => ProbeOutcome::Failed(ProviderError::Timeout.to_string()),
    }
}

/// Signal-loss detector and retry scheduler.
#[derive(Debug, Clone)]
pub struct SignalWatchdog {
    config: WatchdogConfig,
    deadline: Option<Instant>,
    recovering: bool,
    attempts: u32,
    next_attempt: Option<Instant>,
    probe_in_flight: bool,
}

impl SignalWatchdog {
    pub fn new() -> Self {
        Self::with_config(WatchdogConfig::default())
    }

    pub fn with_config(config: WatchdogConfig) -> Self {
        Self {
            config,
            deadline: None,
            recovering: false,
            attempts: 0,
            next_attempt: None,
            probe_in_flight: false,
        }
    }

    pub fn config(&self) -> &WatchdogConfig {
        &self.config
    }

    /// Start the silence timer. Has no effect while recovering.
    pub fn arm(&mut self, now: Instant) {
        if !self.recovering {
            self.deadline = Some(now + self.config.signal_timeout);
        }
    }

    /// A fresh fix arrived: end any recovery and restart the silence timer.
    ///
    /// Returns true if a recovery was in progress.
    pub fn reset(&mut self, now: Instant) -> bool {
        let was_recovering = self.recovering;
        self.clear_recovery();
        self.deadline = Some(now + self.config.signal_timeout);
        was_recovering
    }

    /// Stop everything. Idempotent.
    pub fn disarm(&mut self) {
        self.clear_recovery();
        self.deadline = None;
    }

    /// When silence becomes signal loss. `None` while recovering or disarmed.
    pub fn deadline(&self) -> Option<Instant> {
        if self.recovering {
            None
        } else {
            self.deadline
        }
    }

    /// The silence timer fired. Returns true if recovery started.
    ///
    /// The first attempt is due immediately.
    pub fn on_timeout(&mut self, now: Instant) -> bool {
        if self.recovering || self.deadline.is_none() {
            return false;
        }
        self.deadline = None;
        self.recovering = true;
        self.attempts = 0;
        self.next_attempt = Some(now);
        true
    }

    pub fn is_recovering(&self) -> bool {
        self.recovering
    }

    pub fn probe_in_flight(&self) -> bool {
        self.probe_in_flight
    }

    /// When the next probe is due, unless one is in flight.
    pub fn next_attempt(&self) -> Option<Instant> {
        if self.recovering && !self.probe_in_flight {
            self.next_attempt
        } else {
            None
        }
    }

    /// Claim the due attempt. Returns its 1-based number.
    pub fn begin_attempt(&mut self) -> Option<u32> {
        if !self.recovering
            || self.probe_in_flight
            || self.attempts >= self.config.max_recovery_attempts
        {
            return None;
        }
        self.attempts += 1;
        self.probe_in_flight = true;
        self.next_attempt = None;
        Some(self.attempts)
    }

    /// Apply the result of the in-flight probe.
    pub fn on_probe_result(&mut self, outcome: &ProbeOutcome, now: Instant) -> RecoveryStep {
        if !self.recovering || !self.probe_in_flight {
            return RecoveryStep::Stale;
        }
        self.probe_in_flight = false;

        match outcome {
            ProbeOutcome::Position(raw) if raw.has_valid_coordinates() => {
                self.reset(now);
                RecoveryStep::Restored
            }
            ProbeOutcome::ServicesDisabled => {
                self.disarm();
                RecoveryStep::ServicesDisabled
            }
            ProbeOutcome::Position(_) | ProbeOutcome::Failed(_) => {
                if self.attempts >= self.config.max_recovery_attempts {
                    self.disarm();
                    RecoveryStep::Exhausted
                } else {
                    let at = now + self.config.retry_interval;
                    self.next_attempt = Some(at);
                    RecoveryStep::RetryAt(at)
                }
            }
        }
    }

    pub fn state(&self) -> RecoveryState {
        RecoveryState {
            is_recovering: self.recovering,
            attempts: self.attempts,
        }
    }

    fn clear_recovery(&mut self) {
        self.recovering = false;
        self.attempts = 0;
        self.next_attempt = None;
        self.probe_in_flight = false;
    }
}

impl Default for SignalWatchdog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed() -> ProbeOutcome {
        ProbeOutcome::Failed("no fix".to_string())
    }

    #[test]
    fn test_arm_sets_deadline() {
        let mut watchdog = SignalWatchdog::new();
        let t0 = Instant::now();
        watchdog.arm(t0);
        assert_eq!(watchdog.deadline(), Some(t0 + Duration::from_secs(30)));
    }

    #[test]
    fn test_reset_pushes_deadline() {
        let mut watchdog = SignalWatchdog::new();
        let t0 = Instant::now();
        watchdog.arm(t0);

        let t1 = t0 + Duration::from_secs(20);
        assert!(!watchdog.reset(t1));
        assert_eq!(watchdog.deadline(), Some(t1 + Duration::from_secs(30)));
    }

    #[test]
    fn test_timeout_starts_recovery_immediately() {
        let mut watchdog = SignalWatchdog::new();
        let t0 = Instant::now();
        watchdog.arm(t0);

        let fired = t0 + Duration::from_secs(30);
        assert!(watchdog.on_timeout(fired));
        assert!(watchdog.is_recovering());
        assert!(watchdog.deadline().is_none());
        assert_eq!(watchdog.next_attempt(), Some(fired));
        assert!(!watchdog.on_timeout(fired));
    }

    #[test]
    fn test_bounded_attempts() {
        let mut watchdog = SignalWatchdog::new();
        let t0 = Instant::now();
        watchdog.arm(t0);
        watchdog.on_timeout(t0);

        let mut now = t0;
        for attempt in 1..=4 {
            assert_eq!(watchdog.begin_attempt(), Some(attempt));
            assert!(watchdog.next_attempt().is_none());
            let step = watchdog.on_probe_result(&failed(), now);
            assert_eq!(step, RecoveryStep::RetryAt(now + Duration::from_secs(10)));
            now += Duration::from_secs(10);
        }

        assert_eq!(watchdog.begin_attempt(), Some(5));
        assert_eq!(watchdog.on_probe_result(&failed(), now), RecoveryStep::Exhausted);
        assert!(!watchdog.is_recovering());
        assert!(watchdog.begin_attempt().is_none());
        assert!(watchdog.deadline().is_none());
    }

    #[test]
    fn test_valid_probe_restores() {
        let mut watchdog = SignalWatchdog::new();
        let t0 = Instant::now();
        watchdog.arm(t0);
        watchdog.on_timeout(t0);
        watchdog.begin_attempt();

        let outcome = ProbeOutcome::Position(RawLocation::new(51.5, -0.12, 20.0));
        assert_eq!(watchdog.on_probe_result(&outcome, t0), RecoveryStep::Restored);
        assert_eq!(watchdog.state(), RecoveryState::default());
        assert_eq!(watchdog.deadline(), Some(t0 + Duration::from_secs(30)));
    }

    #[test]
    fn test_invalid_probe_counts_as_failure() {
        let mut watchdog = SignalWatchdog::new();
        let t0 = Instant::now();
        watchdog.arm(t0);
        watchdog.on_timeout(t0);
        watchdog.begin_attempt();

        let outcome = ProbeOutcome::Position(RawLocation::new(0.0, 0.0, 20.0));
        assert!(matches!(
            watchdog.on_probe_result(&outcome, t0),
            RecoveryStep::RetryAt(_)
        ));
    }

    #[test]
    fn test_services_disabled_stops_watchdog() {
        let mut watchdog = SignalWatchdog::new();
        let t0 = Instant::now();
        watchdog.arm(t0);
        watchdog.on_timeout(t0);
        watchdog.begin_attempt();

        let step = watchdog.on_probe_result(&ProbeOutcome::ServicesDisabled, t0);
        assert_eq!(step, RecoveryStep::ServicesDisabled);
        assert!(!watchdog.is_recovering());
        assert!(watchdog.deadline().is_none());
    }

    #[test]
    fn test_result_after_disarm_is_stale() {
        let mut watchdog = SignalWatchdog::new();
        let t0 = Instant::now();
        watchdog.arm(t0);
        watchdog.on_timeout(t0);
        watchdog.begin_attempt();
        watchdog.disarm();

        assert_eq!(watchdog.on_probe_result(&failed(), t0), RecoveryStep::Stale);
    }

    #[test]
    fn test_fresh_fix_during_recovery() {
        let mut watchdog = SignalWatchdog::new();
        let t0 = Instant::now();
        watchdog.arm(t0);
        watchdog.on_timeout(t0);
        watchdog.begin_attempt();

        assert!(watchdog.reset(t0));
        assert!(!watchdog.probe_in_flight());
        assert_eq!(watchdog.on_probe_result(&failed(), t0), RecoveryStep::Stale);
    }
}
