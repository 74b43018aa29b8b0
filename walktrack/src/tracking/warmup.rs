//! Warm-up controller.
//!
//! GPS receivers report poor fixes for the first seconds after they start
//! (or after the OS throttled them in the background). Warm-up runs a short,
//! high-frequency burst on a second subscription so the receiver converges
//! quickly, without touching the main subscription.
//!
//! The controller is a pure state machine; the engine owns the subscription
//! and the deadline timer and feeds results back in:
//!
//! ```text
//!          start()                 3 good fixes | deadline | 10 attempts
//!   Idle ──────────► Running ─────────────────────────────────────────► Complete
//!                      ▲  │ start() restarts
//!                      └──┘
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::provider::{LocationAccuracy, WatchOptions};
use super::sample::GOOD_ACCURACY_M;

/// Default sampling interval during warm-up.
pub const DEFAULT_WARMUP_INTERVAL: Duration = Duration::from_millis(500);

/// Default number of good fixes that end warm-up early.
pub const DEFAULT_REQUIRED_GOOD_POINTS: u32 = 3;

/// Default maximum warm-up duration.
pub const DEFAULT_MAX_WARMUP_DURATION: Duration = Duration::from_secs(10);

/// Default maximum number of fixes considered.
pub const DEFAULT_MAX_WARMUP_ATTEMPTS: u32 = 10;

/// Warm-up configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct WarmupConfig {
    /// Time interval requested for the warm-up subscription.
    pub interval: Duration,

    /// Fixes at or below this accuracy count as good (meters).
    pub good_accuracy_m: f64,

    pub required_good_points: u32,
    pub max_duration: Duration,
    pub max_attempts: u32,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_WARMUP_INTERVAL,
            good_accuracy_m: GOOD_ACCURACY_M,
            required_good_points: DEFAULT_REQUIRED_GOOD_POINTS,
            max_duration: DEFAULT_MAX_WARMUP_DURATION,
            max_attempts: DEFAULT_MAX_WARMUP_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarmupPhase {
    Idle,
    Running,
    Complete,
}

/// Why warm-up ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarmupOutcome {
    GoodAccuracy,
    TimedOut,
    AttemptsExhausted,
}

/// Summary of a finished warm-up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarmupReport {
    pub outcome: WarmupOutcome,
    pub attempts: u32,
    pub good_points: u32,
    pub elapsed_secs: f64,
}

/// Point-in-time view of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarmupStatus {
    pub phase: WarmupPhase,
    pub attempts: u32,
    pub good_points: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_outcome: Option<WarmupOutcome>,
}

/// Warm-up state machine.
#[derive(Debug, Clone)]
pub struct WarmupController {
    config: WarmupConfig,
    phase: WarmupPhase,
    attempts: u32,
    good_points: u32,
    started_at: Option<Instant>,
    last_outcome: Option<WarmupOutcome>,
}

impl WarmupController {
    pub fn new() -> Self {
        Self::with_config(WarmupConfig::default())
    }

    pub fn with_config(config: WarmupConfig) -> Self {
        Self {
            config,
            phase: WarmupPhase::Idle,
            attempts: 0,
            good_points: 0,
            started_at: None,
            last_outcome: None,
        }
    }

    /// Begin (or restart) warm-up. Returns true if a running warm-up was restarted.
    pub fn start(&mut self, now: Instant) -> bool {
        let restarted = self.is_running();
        self.phase = WarmupPhase::Running;
        self.attempts = 0;
        self.good_points = 0;
        self.started_at = Some(now);
        restarted
    }

    /// Abandon a running warm-up without an outcome. Returns true if one was running.
    pub fn cancel(&mut self) -> bool {
        let was_running = self.is_running();
        if was_running {
            self.phase = WarmupPhase::Idle;
            self.started_at = None;
        }
        was_running
    }

    pub fn is_running(&self) -> bool {
        self.phase == WarmupPhase::Running
    }

    /// When the running warm-up times out.
    pub fn deadline(&self) -> Option<Instant> {
        match (self.phase, self.started_at) {
            (WarmupPhase::Running, Some(started)) => Some(started + self.config.max_duration),
            _ => None,
        }
    }

    /// Feed one warm-up fix. Returns a report when this fix completes warm-up.
    pub fn on_sample(&mut self, accuracy: f64, now: Instant) -> Option<WarmupReport> {
        if !self.is_running() {
            return None;
        }

        self.attempts += 1;
        if accuracy.is_finite() && accuracy <= self.config.good_accuracy_m {
            self.good_points += 1;
        }

        tracing::debug!(
            attempts = self.attempts,
            good_points = self.good_points,
            accuracy_m = accuracy,
            "Warm-up sample"
        );

        if self.good_points >= self.config.required_good_points {
            return Some(self.complete(WarmupOutcome::GoodAccuracy, now));
        }
        if self.elapsed(now) >= self.config.max_duration {
            return Some(self.complete(WarmupOutcome::TimedOut, now));
        }
        if self.attempts >= self.config.max_attempts {
            return Some(self.complete(WarmupOutcome::AttemptsExhausted, now));
        }
        None
    }

    /// The deadline timer fired.
    pub fn on_deadline(&mut self, now: Instant) -> Option<WarmupReport> {
        if !self.is_running() {
            return None;
        }
        Some(self.complete(WarmupOutcome::TimedOut, now))
    }

    pub fn status(&self) -> WarmupStatus {
        WarmupStatus {
            phase: self.phase,
            attempts: self.attempts,
            good_points: self.good_points,
            last_outcome: self.last_outcome,
        }
    }

    /// Subscription options for the high-frequency burst.
    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            accuracy: LocationAccuracy::BestForNavigation,
            time_interval: self.config.interval,
            distance_interval_m: 0.0,
        }
    }

    fn elapsed(&self, now: Instant) -> Duration {
        self.started_at
            .map(|started| now.saturating_duration_since(started))
            .unwrap_or_default()
    }

    fn complete(&mut self, outcome: WarmupOutcome, now: Instant) -> WarmupReport {
        let elapsed = self.elapsed(now);
        self.phase = WarmupPhase::Complete;
        self.started_at = None;
        self.last_outcome = Some(outcome);

        WarmupReport {
            outcome,
            attempts: self.attempts,
            good_points: self.good_points,
            elapsed_secs: elapsed.as_secs_f64(),
        }
    }
}

impl Default for WarmupController {
    fn default() -> Self {
        Self::new()
    }
}
