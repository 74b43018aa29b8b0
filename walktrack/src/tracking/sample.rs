//! Core sample types for location tracking.
//!
//! This module defines the fundamental types that flow through the engine:
//!
//! - [`RawLocation`] - A fix exactly as the platform delivered it
//! - [`LocationSample`] - An accepted fix as recorded in a session
//! - [`AccuracyBand`] - Coarse classification of a fix's accuracy radius

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Accuracy at or below which a fix is never smoothed (meters).
pub const EXCELLENT_ACCURACY_M: f64 = 5.0;

/// Accuracy at or below which a fix counts toward warm-up (meters).
pub const GOOD_ACCURACY_M: f64 = 15.0;

/// Accuracy above which a fix is rejected outright (meters).
pub const REJECT_THRESHOLD_M: f64 = 100.0;

/// Returns true if the coordinate pair is usable.
///
/// Rejects non-finite values, latitudes outside ±90, longitudes outside ±180,
/// and the exact origin `(0, 0)`. Platforms report the origin when they fall
/// back without a real fix, so it is treated as invalid even though it is a
/// real place in the Gulf of Guinea.
pub fn is_valid_coordinate(latitude: f64, longitude: f64) -> bool {
    if !latitude.is_finite() || !longitude.is_finite() {
        return false;
    }
    if latitude.abs() > 90.0 || longitude.abs() > 180.0 {
        return false;
    }
    !(latitude == 0.0 && longitude == 0.0)
}

/// Coarse accuracy classification.
///
/// Lower radius means a better fix:
/// `Excellent` (≤5m) > `Good` (≤15m) > `Fair` (≤100m) > `Unusable`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyBand {
    Excellent,
    Good,
    Fair,
    Unusable,
}

impl AccuracyBand {
    /// Classify an accuracy radius in meters using the default thresholds.
    pub fn classify(accuracy: f64) -> Self {
        if !accuracy.is_finite() || accuracy > REJECT_THRESHOLD_M {
            Self::Unusable
        } else if accuracy <= EXCELLENT_ACCURACY_M {
            Self::Excellent
        } else if accuracy <= GOOD_ACCURACY_M {
            Self::Good
        } else {
            Self::Fair
        }
    }
}

impl std::fmt::Display for AccuracyBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Excellent => write!(f, "excellent"),
            Self::Good => write!(f, "good"),
            Self::Fair => write!(f, "fair"),
            Self::Unusable => write!(f, "unusable"),
        }
    }
}

/// A location fix as delivered by the platform provider.
///
/// Nothing about a raw fix is trusted: coordinates may be NaN or the origin,
/// and accuracy may be arbitrarily poor. The accuracy filter decides whether
/// it becomes a [`LocationSample`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawLocation {
    /// Latitude in degrees.
    pub latitude: f64,

    /// Longitude in degrees.
    pub longitude: f64,

    /// Horizontal accuracy radius in meters (lower is better).
    pub accuracy: f64,

    /// Altitude in meters, if reported.
    pub altitude: Option<f64>,

    /// Ground speed in meters per second, if reported.
    pub speed: Option<f64>,

    /// Heading in degrees (0-360), if reported.
    pub heading: Option<f64>,

    /// When the platform measured this fix.
    pub timestamp: DateTime<Utc>,
}

impl RawLocation {
    /// Create a fix measured now with no vector data.
    pub fn new(latitude: f64, longitude: f64, accuracy: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            altitude: None,
            speed: None,
            heading: None,
            timestamp: Utc::now(),
        }
    }

    /// Override the measurement timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = Some(heading);
        self
    }

    /// Check the coordinate pair with [`is_valid_coordinate`].
    pub fn has_valid_coordinates(&self) -> bool {
        is_valid_coordinate(self.latitude, self.longitude)
    }

    /// Accuracy classification of this fix.
    pub fn accuracy_band(&self) -> AccuracyBand {
        AccuracyBand::classify(self.accuracy)
    }
}

/// An accepted location sample, as stored in a session's coordinate list.
///
/// # Annotations
///
/// - `smoothed` is set when the filter blended the fix toward the recent mean.
/// - `background_update` and `background_duration_secs` are set when the fix
///   arrived while the app was in the background; the duration is how long
///   the app had been backgrounded at that moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub smoothed: bool,
    #[serde(default)]
    pub background_update: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_duration_secs: Option<f64>,
}

impl LocationSample {
    /// Copy a raw fix into an unannotated sample.
    pub fn from_raw(raw: &RawLocation) -> Self {
        Self {
            latitude: raw.latitude,
            longitude: raw.longitude,
            accuracy: raw.accuracy,
            altitude: raw.altitude,
            speed: raw.speed,
            heading: raw.heading,
            timestamp: raw.timestamp,
            smoothed: false,
            background_update: false,
            background_duration_secs: None,
        }
    }

    /// Position as a (latitude, longitude) tuple.
    pub fn position(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    /// Check the coordinate pair with [`is_valid_coordinate`].
    pub fn has_valid_coordinates(&self) -> bool {
        is_valid_coordinate(self.latitude, self.longitude)
    }
}

impl From<&RawLocation> for LocationSample {
    fn from(raw: &RawLocation) -> Self {
        Self::from_raw(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_coordinates() {
        assert!(is_valid_coordinate(51.5007, -0.1246));
        assert!(is_valid_coordinate(-90.0, 180.0));
        assert!(is_valid_coordinate(0.0, 12.5));
    }

    #[test]
    fn test_invalid_coordinates() {
        assert!(!is_valid_coordinate(f64::NAN, 10.0));
        assert!(!is_valid_coordinate(10.0, f64::NAN));
        assert!(!is_valid_coordinate(90.0001, 10.0));
        assert!(!is_valid_coordinate(10.0, -180.5));
        assert!(!is_valid_coordinate(f64::INFINITY, 0.0));
    }

    #[test]
    fn test_origin_is_invalid() {
        assert!(!is_valid_coordinate(0.0, 0.0));
        assert!(!is_valid_coordinate(-0.0, 0.0));
    }

    #[test]
    fn test_accuracy_band() {
        assert_eq!(AccuracyBand::classify(3.0), AccuracyBand::Excellent);
        assert_eq!(AccuracyBand::classify(5.0), AccuracyBand::Excellent);
        assert_eq!(AccuracyBand::classify(12.0), AccuracyBand::Good);
        assert_eq!(AccuracyBand::classify(100.0), AccuracyBand::Fair);
        assert_eq!(AccuracyBand::classify(100.1), AccuracyBand::Unusable);
        assert_eq!(AccuracyBand::classify(f64::NAN), AccuracyBand::Unusable);
    }

    #[test]
    fn test_sample_from_raw_copies_vectors() {
        let raw = RawLocation::new(51.5, -0.12, 8.0)
            .with_altitude(35.0)
            .with_speed(1.4)
            .with_heading(270.0);
        let sample = LocationSample::from_raw(&raw);

        assert_eq!(sample.position(), (51.5, -0.12));
        assert_eq!(sample.altitude, Some(35.0));
        assert_eq!(sample.speed, Some(1.4));
        assert_eq!(sample.heading, Some(270.0));
        assert_eq!(sample.timestamp, raw.timestamp);
        assert!(!sample.smoothed);
        assert!(!sample.background_update);
    }

    #[test]
    fn test_sample_serializes_camel_case() {
        let mut sample = LocationSample::from_raw(&RawLocation::new(51.5, -0.12, 8.0));
        sample.background_update = true;
        sample.background_duration_secs = Some(12.5);

        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json["backgroundUpdate"], true);
        assert_eq!(json["backgroundDurationSecs"], 12.5);
        assert!(json.get("altitude").is_none());
    }
}
