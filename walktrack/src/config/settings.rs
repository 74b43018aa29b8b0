//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

use crate::tracking::Platform;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Accuracy filter and smoothing
    pub filter: FilterSettings,
    /// Main subscription cadence and alert wording
    pub tracking: TrackingSettings,
    /// Warm-up burst after start, resume and foreground return
    pub warmup: WarmupSettings,
    /// Periodic permission re-validation
    pub permissions: PermissionSettings,
    /// Signal-loss detection and bounded recovery
    pub watchdog: WatchdogSettings,
    /// Side buffer for unsaved samples
    pub storage: StorageSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Accuracy filter configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSettings {
    /// Fixes with accuracy above this (meters) are rejected
    pub reject_threshold_m: f64,
    /// Fixes at or below this accuracy (meters) are never smoothed
    pub excellent_accuracy_m: f64,
    /// Upper bound of the "good" band; also the warm-up target
    pub good_accuracy_m: f64,
    /// Smoothing only applies within this distance (meters) of the recent mean
    pub smoothing_distance_m: f64,
    /// Number of recent samples kept for smoothing
    pub window_size: usize,
}

/// Main subscription configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingSettings {
    /// Minimum time between fixes in milliseconds
    pub time_interval_ms: u64,
    /// Minimum distance between fixes in meters
    pub distance_interval_m: f64,
    /// Platform used for alert wording
    pub platform: Platform,
}

/// Warm-up configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct WarmupSettings {
    pub interval_ms: u64,
    /// Good fixes needed to end warm-up early
    pub good_points: u32,
    pub max_duration_secs: u64,
    pub max_attempts: u32,
}

/// Permission monitor configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionSettings {
    /// Delay before the first check after tracking becomes active
    pub settle_delay_secs: u64,
    pub poll_interval_secs: u64,
}

/// Signal watchdog configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchdogSettings {
    /// Silence after which the signal is considered lost
    pub signal_timeout_secs: u64,
    pub max_recovery_attempts: u32,
    pub retry_interval_secs: u64,
    /// Timeout of each one-shot recovery probe
    pub probe_timeout_secs: u64,
}

/// Side buffer configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageSettings {
    /// JSON file for unsaved samples. `None` keeps them in memory only.
    pub buffer_file: Option<PathBuf>,
    /// Oldest samples are dropped beyond this count
    pub max_entries: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}
