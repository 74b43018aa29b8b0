//! Runtime engine configuration.

use std::time::Duration;

use crate::config::ConfigFile;
use crate::tracking::alerts::Platform;
use crate::tracking::filter::FilterConfig;
use crate::tracking::permission::PermissionMonitorConfig;
use crate::tracking::provider::{LocationAccuracy, WatchOptions};
use crate::tracking::warmup::WarmupConfig;
use crate::tracking::watchdog::WatchdogConfig;

/// Default capacity of the command channel.
pub const DEFAULT_COMMAND_CAPACITY: usize = 32;

/// Default capacity of the event broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Configuration for [`TrackingEngine`](super::TrackingEngine).
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub filter: FilterConfig,

    /// Options for the main subscription.
    pub tracking: WatchOptions,

    pub warmup: WarmupConfig,
    pub permissions: PermissionMonitorConfig,
    pub watchdog: WatchdogConfig,

    /// Platform used for alert wording.
    pub platform: Platform,

    pub command_capacity: usize,

    /// Slow subscribers lag (and skip events) once this many are queued.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            filter: FilterConfig::default(),
            tracking: WatchOptions::default(),
            warmup: WarmupConfig::default(),
            permissions: PermissionMonitorConfig::default(),
            watchdog: WatchdogConfig::default(),
            platform: Platform::default(),
            command_capacity: DEFAULT_COMMAND_CAPACITY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl From<&ConfigFile> for EngineConfig {
    fn from(file: &ConfigFile) -> Self {
        Self {
            filter: FilterConfig {
                reject_threshold_m: file.filter.reject_threshold_m,
                excellent_accuracy_m: file.filter.excellent_accuracy_m,
                smoothing_distance_m: file.filter.smoothing_distance_m,
                window_size: file.filter.window_size,
            },
            tracking: WatchOptions {
                accuracy: LocationAccuracy::BestForNavigation,
                time_interval: Duration::from_millis(file.tracking.time_interval_ms),
                distance_interval_m: file.tracking.distance_interval_m,
            },
            warmup: WarmupConfig {
                interval: Duration::from_millis(file.warmup.interval_ms),
                good_accuracy_m: file.filter.good_accuracy_m,
                required_good_points: file.warmup.good_points,
                max_duration: Duration::from_secs(file.warmup.max_duration_secs),
                max_attempts: file.warmup.max_attempts,
            },
            permissions: PermissionMonitorConfig {
                settle_delay: Duration::from_secs(file.permissions.settle_delay_secs),
                poll_interval: Duration::from_secs(file.permissions.poll_interval_secs),
            },
            watchdog: WatchdogConfig {
                signal_timeout: Duration::from_secs(file.watchdog.signal_timeout_secs),
                max_recovery_attempts: file.watchdog.max_recovery_attempts,
                retry_interval: Duration::from_secs(file.watchdog.retry_interval_secs),
                probe_timeout: Duration::from_secs(file.watchdog.probe_timeout_secs),
            },
            platform: file.tracking.platform,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_file_matches_default_config() {
        let from_file = EngineConfig::from(&ConfigFile::default());
        assert_eq!(from_file, EngineConfig::default());
    }

    #[test]
    fn test_file_values_flow_through() {
        let mut file = ConfigFile::default();
        file.watchdog.signal_timeout_secs = 45;
        file.filter.good_accuracy_m = 12.0;
        file.tracking.platform = Platform::Android;

        let config = EngineConfig::from(&file);
        assert_eq!(config.watchdog.signal_timeout, Duration::from_secs(45));
        assert_eq!(config.warmup.good_accuracy_m, 12.0);
        assert_eq!(config.platform, Platform::Android);
    }
}
