//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let buffer_file = config
        .storage
        .buffer_file
        .as_ref()
        .map(|p| path_to_string(p))
        .unwrap_or_default();

    format!(
        r#"[filter]
; Fixes with reported accuracy above this many meters are discarded (default: 100)
reject_threshold_m = {}
; Fixes at or below this accuracy are recorded unsmoothed (default: 5)
excellent_accuracy_m = {}
; Upper bound of "good" accuracy; warm-up counts fixes at or below it (default: 15)
good_accuracy_m = {}
; Smoothing is skipped when a fix is further than this from the recent mean (default: 20)
smoothing_distance_m = {}
; Recent accepted fixes kept for smoothing (default: 5)
window_size = {}

[tracking]
; Minimum time between fixes on the main subscription, in milliseconds (default: 1000)
time_interval_ms = {}
; Minimum distance between fixes on the main subscription, in meters (default: 5)
distance_interval_m = {}
; Platform used for alert wording: ios, android or other (default: other)
platform = {}

[warmup]
; Fix interval during warm-up, in milliseconds (default: 500)
interval_ms = {}
; Good fixes that end warm-up early (default: 3)
good_points = {}
; Warm-up gives up after this many seconds (default: 10)
max_duration_secs = {}
; ...or after this many fixes (default: 10)
max_attempts = {}

[permissions]
; Delay before the first permission check once tracking is active (default: 60)
settle_delay_secs = {}
; Seconds between permission checks (default: 120)
poll_interval_secs = {}

[watchdog]
; Seconds without an accepted fix before the signal is considered lost (default: 30)
signal_timeout_secs = {}
; One-shot recovery attempts before giving up (default: 5)
max_recovery_attempts = {}
; Seconds between recovery attempts (default: 10)
retry_interval_secs = {}
; Timeout of each recovery attempt, in seconds (default: 15)
probe_timeout_secs = {}

[storage]
; JSON file that holds fixes not yet saved by the app.
; If empty, fixes are buffered in memory only.
buffer_file = {}
; Oldest fixes are dropped beyond this count (default: 1000)
max_entries = {}

[logging]
; Log file location (default: ~/.walktrack/walktrack.log)
file = {}
"#,
        config.filter.reject_threshold_m,
        config.filter.excellent_accuracy_m,
        config.filter.good_accuracy_m,
        config.filter.smoothing_distance_m,
        config.filter.window_size,
        config.tracking.time_interval_ms,
        config.tracking.distance_interval_m,
        config.tracking.platform,
        config.warmup.interval_ms,
        config.warmup.good_points,
        config.warmup.max_duration_secs,
        config.warmup.max_attempts,
        config.permissions.settle_delay_secs,
        config.permissions.poll_interval_secs,
        config.watchdog.signal_timeout_secs,
        config.watchdog.max_recovery_attempts,
        config.watchdog.retry_interval_secs,
        config.watchdog.probe_timeout_secs,
        buffer_file,
        config.storage.max_entries,
        path_to_string(&config.logging.file),
    )
}

/// Convert a path to a string, replacing the home directory with ~.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(rest) = path.strip_prefix(&home) {
            return format!("~/{}", rest.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::Platform;
    use std::path::PathBuf;

    #[test]
    fn test_written_config_reloads() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");

        let mut config = ConfigFile::default();
        config.tracking.platform = Platform::Android;
        config.watchdog.max_recovery_attempts = 7;
        config.filter.smoothing_distance_m = 12.5;
        config.storage.buffer_file = Some(PathBuf::from("/tmp/walktrack-buffer.json"));

        config.save_to(&config_path).unwrap();
        let reloaded = ConfigFile::load_from(&config_path).unwrap();

        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_output_is_commented() {
        let output = to_config_string(&ConfigFile::default());
        assert!(output.contains("[watchdog]"));
        assert!(output.contains("; Seconds between recovery attempts"));
        assert!(output.contains("buffer_file = \n"));
    }
}
