//! Recorded walk traces.
//!
//! A trace is a CSV file with one event per line:
//!
//! ```text
//! # offset_ms,latitude,longitude,accuracy[,altitude,speed,heading]
//! 0,51.50070,-0.12460,8.0
//! 1000,51.50079,-0.12455,6.5,12.0,1.4,35.0
//! 5000,background
//! 65000,active
//! ```
//!
//! Fix rows carry position and accuracy with optional vector fields (empty
//! fields are allowed). Two-column rows are app lifecycle transitions.
//! Blank lines, `#` comments and a leading `offset_ms` header are ignored.
//! Offsets must not decrease.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::{SimulatedLifecycle, SimulatedProvider};
use crate::tracking::{AppState, RawLocation};

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("failed to read trace {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

/// What happens at a trace offset.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceAction {
    Fix {
        latitude: f64,
        longitude: f64,
        accuracy: f64,
        altitude: Option<f64>,
        speed: Option<f64>,
        heading: Option<f64>,
    },
    Lifecycle(AppState),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraceEntry {
    pub offset: Duration,
    pub action: TraceAction,
}

impl TraceEntry {
    /// Build the raw fix for a `Fix` entry, timestamped relative to `base`.
    pub fn to_raw(&self, base: DateTime<Utc>) -> Option<RawLocation> {
        let TraceAction::Fix {
            latitude,
            longitude,
            accuracy,
            altitude,
            speed,
            heading,
        } = self.action
        else {
            return None;
        };

        let timestamp = chrono::Duration::from_std(self.offset)
            .map(|delta| base + delta)
            .unwrap_or(base);
        let mut raw = RawLocation::new(latitude, longitude, accuracy).with_timestamp(timestamp);
        raw.altitude = altitude;
        raw.speed = speed;
        raw.heading = heading;
        Some(raw)
    }
}

/// Read and parse a trace file.
pub fn load_trace(path: &Path) -> Result<Vec<TraceEntry>, TraceError> {
    let contents = std::fs::read_to_string(path).map_err(|source| TraceError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_trace(&contents)
}

/// Parse trace text.
pub fn parse_trace(input: &str) -> Result<Vec<TraceEntry>, TraceError> {
    let mut entries: Vec<TraceEntry> = Vec::new();

    for (index, line) in input.lines().enumerate() {
        let line_no = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if entries.is_empty() && trimmed.to_ascii_lowercase().starts_with("offset") {
            continue;
        }

        let entry = parse_line(trimmed).map_err(|reason| TraceError::Parse {
            line: line_no,
            reason,
        })?;

        if let Some(previous) = entries.last() {
            if entry.offset < previous.offset {
                return Err(TraceError::Parse {
                    line: line_no,
                    reason: format!(
                        "offset {}ms is before previous offset {}ms",
                        entry.offset.as_millis(),
                        previous.offset.as_millis()
                    ),
                });
            }
        }
        entries.push(entry);
    }

    Ok(entries)
}

fn parse_line(line: &str) -> Result<TraceEntry, String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();

    let offset_ms: u64 = fields[0]
        .parse()
        .map_err(|_| format!("invalid offset '{}'", fields[0]))?;
    let offset = Duration::from_millis(offset_ms);

    match fields.len() {
        2 => {
            let state = fields[1].parse::<AppState>()?;
            Ok(TraceEntry {
                offset,
                action: TraceAction::Lifecycle(state),
            })
        }
        4..=7 => {
            let required = |i: usize, name: &str| -> Result<f64, String> {
                fields[i]
                    .parse::<f64>()
                    .map_err(|_| format!("invalid {} '{}'", name, fields[i]))
            };
            let optional = |i: usize, name: &str| -> Result<Option<f64>, String> {
                match fields.get(i) {
                    None => Ok(None),
                    Some(v) if v.is_empty() => Ok(None),
                    Some(v) => v
                        .parse::<f64>()
                        .map(Some)
                        .map_err(|_| format!("invalid {} '{}'", name, v)),
                }
            };

            Ok(TraceEntry {
                offset,
                action: TraceAction::Fix {
                    latitude: required(1, "latitude")?,
                    longitude: required(2, "longitude")?,
                    accuracy: required(3, "accuracy")?,
                    altitude: optional(4, "altitude")?,
                    speed: optional(5, "speed")?,
                    heading: optional(6, "heading")?,
                },
            })
        }
        n => Err(format!("expected 2 or 4-7 fields, found {}", n)),
    }
}

/// Play a trace into the simulated platform in real (or scaled) time.
///
/// `speed` scales the offsets: `2.0` plays twice as fast. Returns the
/// offset of the last entry.
pub async fn play_trace(
    entries: &[TraceEntry],
    provider: &Arc<SimulatedProvider>,
    lifecycle: &Arc<SimulatedLifecycle>,
    speed: f64,
) -> Duration {
    let speed = if speed.is_finite() && speed > 0.0 {
        speed
    } else {
        1.0
    };
    let start = tokio::time::Instant::now();
    let base = Utc::now();

    for entry in entries {
        let scaled = entry.offset.div_f64(speed);
        tokio::time::sleep_until(start + scaled).await;

        match &entry.action {
            TraceAction::Lifecycle(state) => {
                tracing::debug!(offset_ms = entry.offset.as_millis() as u64, state = %state, "Trace lifecycle");
                lifecycle.set(*state);
            }
            TraceAction::Fix { .. } => {
                if let Some(raw) = entry.to_raw(base) {
                    provider.emit(raw);
                }
            }
        }
    }

    entries.last().map(|e| e.offset).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fix_and_lifecycle_rows() {
        let input = "\
offset_ms,latitude,longitude,accuracy,altitude,speed,heading
# morning loop
0,51.50070,-0.12460,8.0
1000,51.50079,-0.12455,6.5,12.0,,35.0

5000,background
";
        let entries = parse_trace(input).unwrap();
        assert_eq!(entries.len(), 3);

        match &entries[1].action {
            TraceAction::Fix {
                accuracy,
                altitude,
                speed,
                heading,
                ..
            } => {
                assert_eq!(*accuracy, 6.5);
                assert_eq!(*altitude, Some(12.0));
                assert_eq!(*speed, None);
                assert_eq!(*heading, Some(35.0));
            }
            other => panic!("expected fix, got {:?}", other),
        }
        assert_eq!(
            entries[2].action,
            TraceAction::Lifecycle(AppState::Background)
        );
        assert_eq!(entries[2].offset, Duration::from_secs(5));
    }

    #[test]
    fn test_parse_errors_name_line() {
        let err = parse_trace("0,51.5,-0.12,5\n10,51.5,abc,5\n").unwrap_err();
        assert!(err.to_string().starts_with("line 2:"), "{}", err);

        let err = parse_trace("0,51.5,-0.12\n").unwrap_err();
        assert!(err.to_string().contains("expected 2 or 4-7 fields"));

        let err = parse_trace("0,sleeping\n").unwrap_err();
        assert!(err.to_string().contains("unknown app state"));
    }

    #[test]
    fn test_offsets_must_not_decrease() {
        let err = parse_trace("1000,51.5,-0.12,5\n500,51.5,-0.12,5\n").unwrap_err();
        assert!(matches!(err, TraceError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_to_raw_offsets_timestamp() {
        let entries = parse_trace("1500,51.5,-0.12,5,,1.4\n").unwrap();
        let base = Utc::now();
        let raw = entries[0].to_raw(base).unwrap();

        assert_eq!(raw.timestamp, base + chrono::Duration::milliseconds(1500));
        assert_eq!(raw.speed, Some(1.4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_trace_delivers_in_order() {
        use crate::tracking::{AppLifecycleSource, LocationProvider, WatchOptions};

        let provider = Arc::new(SimulatedProvider::new());
        let lifecycle = Arc::new(SimulatedLifecycle::new());
        let mut subscription = provider.watch(WatchOptions::default()).await.unwrap();
        let mut states = lifecycle.subscribe();

        let entries = parse_trace("0,51.5,-0.12,5\n2000,background\n4000,51.6,-0.12,5\n").unwrap();
        let last = play_trace(&entries, &provider, &lifecycle, 2.0).await;

        assert_eq!(last, Duration::from_secs(4));
        assert_eq!(subscription.recv().await.unwrap().latitude, 51.5);
        assert_eq!(subscription.recv().await.unwrap().latitude, 51.6);
        assert_eq!(states.recv().await.unwrap(), AppState::Background);
    }
}
