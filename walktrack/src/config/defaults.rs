//! Default values and constants for all configuration settings.
//!
//! Tracking defaults are owned by the tracking modules; this file maps them
//! onto the INI units (milliseconds, whole seconds) and provides
//! `ConfigFile::default()`.

use std::path::PathBuf;

use super::settings::*;
use crate::storage::DEFAULT_MAX_BUFFERED_SAMPLES;
use crate::tracking::filter::{DEFAULT_SMOOTHING_DISTANCE_M, DEFAULT_WINDOW_SIZE};
use crate::tracking::permission::{DEFAULT_POLL_INTERVAL, DEFAULT_SETTLE_DELAY};
use crate::tracking::sample::{EXCELLENT_ACCURACY_M, GOOD_ACCURACY_M, REJECT_THRESHOLD_M};
use crate::tracking::warmup::{
    DEFAULT_MAX_WARMUP_ATTEMPTS, DEFAULT_MAX_WARMUP_DURATION, DEFAULT_REQUIRED_GOOD_POINTS,
    DEFAULT_WARMUP_INTERVAL,
};
use crate::tracking::watchdog::{
    DEFAULT_MAX_RECOVERY_ATTEMPTS, DEFAULT_PROBE_TIMEOUT, DEFAULT_RETRY_INTERVAL,
    DEFAULT_SIGNAL_TIMEOUT,
};
use crate::tracking::Platform;

// =============================================================================
// Tracking defaults
// =============================================================================

/// Default main subscription time interval (ms).
pub const DEFAULT_TIME_INTERVAL_MS: u64 = 1000;

/// Default main subscription distance interval (meters).
pub const DEFAULT_DISTANCE_INTERVAL_M: f64 = 5.0;

/// Smallest accepted subscription time interval (ms).
pub const MIN_TIME_INTERVAL_MS: u64 = 100;

// =============================================================================
// Paths
// =============================================================================

/// Default log file location (~/.walktrack/walktrack.log).
pub fn default_log_file() -> PathBuf {
    super::file::config_directory().join("walktrack.log")
}

/// Default buffer file location (~/.walktrack/unsaved-samples.json).
pub fn default_buffer_file() -> PathBuf {
    super::file::config_directory().join("unsaved-samples.json")
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            filter: FilterSettings {
                reject_threshold_m: REJECT_THRESHOLD_M,
                excellent_accuracy_m: EXCELLENT_ACCURACY_M,
                good_accuracy_m: GOOD_ACCURACY_M,
                smoothing_distance_m: DEFAULT_SMOOTHING_DISTANCE_M,
                window_size: DEFAULT_WINDOW_SIZE,
            },
            tracking: TrackingSettings {
                time_interval_ms: DEFAULT_TIME_INTERVAL_MS,
                distance_interval_m: DEFAULT_DISTANCE_INTERVAL_M,
                platform: Platform::default(),
            },
            warmup: WarmupSettings {
                interval_ms: DEFAULT_WARMUP_INTERVAL.as_millis() as u64,
                good_points: DEFAULT_REQUIRED_GOOD_POINTS,
                max_duration_secs: DEFAULT_MAX_WARMUP_DURATION.as_secs(),
                max_attempts: DEFAULT_MAX_WARMUP_ATTEMPTS,
            },
            permissions: PermissionSettings {
                settle_delay_secs: DEFAULT_SETTLE_DELAY.as_secs(),
                poll_interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            },
            watchdog: WatchdogSettings {
                signal_timeout_secs: DEFAULT_SIGNAL_TIMEOUT.as_secs(),
                max_recovery_attempts: DEFAULT_MAX_RECOVERY_ATTEMPTS,
                retry_interval_secs: DEFAULT_RETRY_INTERVAL.as_secs(),
                probe_timeout_secs: DEFAULT_PROBE_TIMEOUT.as_secs(),
            },
            storage: StorageSettings {
                buffer_file: None,
                max_entries: DEFAULT_MAX_BUFFERED_SAMPLES,
            },
            logging: LoggingSettings {
                file: default_log_file(),
            },
        }
    }
}
