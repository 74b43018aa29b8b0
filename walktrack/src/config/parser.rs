//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::Ini;

use super::defaults::MIN_TIME_INTERVAL_MS;
use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [filter] section
    if let Some(section) = ini.section(Some("filter")) {
        if let Some(v) = section.get("reject_threshold_m") {
            config.filter.reject_threshold_m = parse_positive_f64("filter", "reject_threshold_m", v)?;
        }
        if let Some(v) = section.get("excellent_accuracy_m") {
            config.filter.excellent_accuracy_m =
                parse_positive_f64("filter", "excellent_accuracy_m", v)?;
        }
        if let Some(v) = section.get("good_accuracy_m") {
            config.filter.good_accuracy_m = parse_positive_f64("filter", "good_accuracy_m", v)?;
        }
        if let Some(v) = section.get("smoothing_distance_m") {
            config.filter.smoothing_distance_m =
                parse_positive_f64("filter", "smoothing_distance_m", v)?;
        }
        if let Some(v) = section.get("window_size") {
            config.filter.window_size = parse_nonzero("filter", "window_size", v)?;
        }

        if config.filter.excellent_accuracy_m > config.filter.good_accuracy_m
            || config.filter.good_accuracy_m > config.filter.reject_threshold_m
        {
            return Err(ConfigFileError::InvalidValue {
                section: "filter".to_string(),
                key: "good_accuracy_m".to_string(),
                value: config.filter.good_accuracy_m.to_string(),
                reason: "thresholds must satisfy excellent <= good <= reject".to_string(),
            });
        }
    }

    // [tracking] section
    if let Some(section) = ini.section(Some("tracking")) {
        if let Some(v) = section.get("time_interval_ms") {
            let parsed: u64 = parse_value(
                "tracking",
                "time_interval_ms",
                v,
                "must be a positive integer (milliseconds)",
            )?;
            if parsed < MIN_TIME_INTERVAL_MS {
                tracing::warn!(
                    requested = parsed,
                    min = MIN_TIME_INTERVAL_MS,
                    "time_interval_ms below minimum, clamping to {}",
                    MIN_TIME_INTERVAL_MS
                );
            }
            config.tracking.time_interval_ms = parsed.max(MIN_TIME_INTERVAL_MS);
        }
        if let Some(v) = section.get("distance_interval_m") {
            let parsed: f64 = parse_value(
                "tracking",
                "distance_interval_m",
                v,
                "must be a non-negative number (meters)",
            )?;
            if !parsed.is_finite() || parsed < 0.0 {
                return Err(invalid(
                    "tracking",
                    "distance_interval_m",
                    v,
                    "must be a non-negative number (meters)",
                ));
            }
            config.tracking.distance_interval_m = parsed;
        }
        if let Some(v) = section.get("platform") {
            config.tracking.platform = v
                .parse()
                .map_err(|reason: String| invalid("tracking", "platform", v, &reason))?;
        }
    }

    // [warmup] section
    if let Some(section) = ini.section(Some("warmup")) {
        if let Some(v) = section.get("interval_ms") {
            config.warmup.interval_ms = parse_nonzero("warmup", "interval_ms", v)?;
        }
        if let Some(v) = section.get("good_points") {
            config.warmup.good_points = parse_nonzero("warmup", "good_points", v)?;
        }
        if let Some(v) = section.get("max_duration_secs") {
            config.warmup.max_duration_secs = parse_nonzero("warmup", "max_duration_secs", v)?;
        }
        if let Some(v) = section.get("max_attempts") {
            config.warmup.max_attempts = parse_nonzero("warmup", "max_attempts", v)?;
        }
    }

    // [permissions] section
    if let Some(section) = ini.section(Some("permissions")) {
        if let Some(v) = section.get("settle_delay_secs") {
            config.permissions.settle_delay_secs = parse_value(
                "permissions",
                "settle_delay_secs",
                v,
                "must be a non-negative integer (seconds)",
            )?;
        }
        if let Some(v) = section.get("poll_interval_secs") {
            config.permissions.poll_interval_secs =
                parse_nonzero("permissions", "poll_interval_secs", v)?;
        }
    }

    // [watchdog] section
    if let Some(section) = ini.section(Some("watchdog")) {
        if let Some(v) = section.get("signal_timeout_secs") {
            config.watchdog.signal_timeout_secs =
                parse_nonzero("watchdog", "signal_timeout_secs", v)?;
        }
        if let Some(v) = section.get("max_recovery_attempts") {
            config.watchdog.max_recovery_attempts =
                parse_nonzero("watchdog", "max_recovery_attempts", v)?;
        }
        if let Some(v) = section.get("retry_interval_secs") {
            config.watchdog.retry_interval_secs =
                parse_nonzero("watchdog", "retry_interval_secs", v)?;
        }
        if let Some(v) = section.get("probe_timeout_secs") {
            config.watchdog.probe_timeout_secs = parse_nonzero("watchdog", "probe_timeout_secs", v)?;
        }
    }

    // [storage] section
    if let Some(section) = ini.section(Some("storage")) {
        if let Some(v) = section.get("buffer_file") {
            let v = v.trim();
            config.storage.buffer_file = if v.is_empty() {
                None
            } else {
                Some(expand_tilde(v))
            };
        }
        if let Some(v) = section.get("max_entries") {
            config.storage.max_entries = parse_nonzero("storage", "max_entries", v)?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_value<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

fn parse_nonzero<T>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError>
where
    T: FromStr + PartialEq + Default,
{
    let parsed: T = parse_value(section, key, value, "must be a positive integer")?;
    if parsed == T::default() {
        return Err(invalid(section, key, value, "must be a positive integer"));
    }
    Ok(parsed)
}

fn parse_positive_f64(section: &str, key: &str, value: &str) -> Result<f64, ConfigFileError> {
    let reason = "must be a positive number (meters)";
    let parsed: f64 = parse_value(section, key, value, reason)?;
    if !parsed.is_finite() || parsed <= 0.0 {
        return Err(invalid(section, key, value, reason));
    }
    Ok(parsed)
}

/// Expand a leading `~` to the user's home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::Platform;
    use tempfile::TempDir;

    fn parse(contents: &str) -> Result<ConfigFile, ConfigFileError> {
        let ini = Ini::load_from_str(contents).unwrap();
        parse_ini(&ini)
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(parse("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_overlays_sections() {
        let config = parse(
            r#"
[filter]
reject_threshold_m = 80
window_size = 8

[tracking]
platform = ios
time_interval_ms = 2000

[watchdog]
signal_timeout_secs = 45
max_recovery_attempts = 3
"#,
        )
        .unwrap();

        assert_eq!(config.filter.reject_threshold_m, 80.0);
        assert_eq!(config.filter.window_size, 8);
        assert_eq!(config.tracking.platform, Platform::Ios);
        assert_eq!(config.tracking.time_interval_ms, 2000);
        assert_eq!(config.watchdog.signal_timeout_secs, 45);
        assert_eq!(config.watchdog.max_recovery_attempts, 3);
        // Untouched sections keep defaults
        assert_eq!(config.warmup, ConfigFile::default().warmup);
    }

    #[test]
    fn test_invalid_number() {
        let err = parse("[watchdog]\nsignal_timeout_secs = soon\n").unwrap_err();
        match err {
            ConfigFileError::InvalidValue { section, key, .. } => {
                assert_eq!(section, "watchdog");
                assert_eq!(key, "signal_timeout_secs");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_zero_rejected_where_positive_required() {
        assert!(parse("[filter]\nwindow_size = 0\n").is_err());
        assert!(parse("[watchdog]\nmax_recovery_attempts = 0\n").is_err());
        assert!(parse("[filter]\nreject_threshold_m = -5\n").is_err());
    }

    #[test]
    fn test_settle_delay_may_be_zero() {
        let config = parse("[permissions]\nsettle_delay_secs = 0\n").unwrap();
        assert_eq!(config.permissions.settle_delay_secs, 0);
    }

    #[test]
    fn test_threshold_ordering_enforced() {
        let err = parse("[filter]\ngood_accuracy_m = 150\n").unwrap_err();
        assert!(err.to_string().contains("excellent <= good <= reject"));
    }

    #[test]
    fn test_time_interval_clamped() {
        let config = parse("[tracking]\ntime_interval_ms = 10\n").unwrap();
        assert_eq!(config.tracking.time_interval_ms, MIN_TIME_INTERVAL_MS);
    }

    #[test]
    fn test_unknown_platform() {
        let err = parse("[tracking]\nplatform = symbian\n").unwrap_err();
        assert!(err.to_string().contains("unknown platform"));
    }

    #[test]
    fn test_storage_buffer_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");
        std::fs::write(
            &config_path,
            "[storage]\nbuffer_file = /var/lib/walktrack/buffer.json\nmax_entries = 250\n",
        )
        .unwrap();

        let config = ConfigFile::load_from(&config_path).unwrap();
        assert_eq!(
            config.storage.buffer_file,
            Some(PathBuf::from("/var/lib/walktrack/buffer.json"))
        );
        assert_eq!(config.storage.max_entries, 250);
    }

    #[test]
    fn test_empty_buffer_file_means_memory() {
        let config = parse("[storage]\nbuffer_file =\n").unwrap();
        assert!(config.storage.buffer_file.is_none());
    }

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/logs"), home.join("logs"));
        }
    }
}
