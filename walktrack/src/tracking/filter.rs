//! Accuracy filter and smoother.
//!
//! Every raw fix from the provider passes through [`AccuracyFilter::process`]
//! before it can become part of a walk. The filter is a pure function of the
//! fix and the [`RecentWindow`] of previously accepted samples:
//!
//! 1. Reject fixes with invalid coordinates (NaN, out of range, origin)
//! 2. Reject fixes whose accuracy radius exceeds the rejection threshold
//! 3. If the fix jumps far from the recent mean and is not excellent, blend
//!    it toward the mean with a weight proportional to its accuracy
//!
//! # Blending
//!
//! ```text
//! weight = clamp(excellent_accuracy / accuracy, 0.1, 0.9)
//! out    = weight * raw + (1 - weight) * mean
//! ```
//!
//! Only latitude and longitude are blended. Accuracy, altitude, speed and
//! heading pass through untouched.
//!
//! # Usage
//!
//! ```ignore
//! let filter = AccuracyFilter::new();
//! let mut window = RecentWindow::new();
//!
//! match filter.process(&raw, &window) {
//!     FilterOutcome::Accepted { sample, window: next } => {
//!         window = next;
//!         record(sample);
//!     }
//!     FilterOutcome::Rejected(reason) => tracing::debug!(%reason, "dropped fix"),
//! }
//! ```

use std::sync::Arc;

use super::error::RejectReason;
use super::geo::haversine_distance_m;
use super::sample::{
    is_valid_coordinate, LocationSample, RawLocation, EXCELLENT_ACCURACY_M, REJECT_THRESHOLD_M,
};

/// Default distance from the recent mean that triggers smoothing (meters).
pub const DEFAULT_SMOOTHING_DISTANCE_M: f64 = 20.0;

/// Default number of samples kept in the recent window.
pub const DEFAULT_WINDOW_SIZE: usize = 5;

/// Minimum number of valid window entries before smoothing applies.
pub const MIN_SMOOTHING_ENTRIES: usize = 2;

/// Lower bound on the weight given to the raw fix when blending.
pub const MIN_BLEND_WEIGHT: f64 = 0.1;

/// Upper bound on the weight given to the raw fix when blending.
pub const MAX_BLEND_WEIGHT: f64 = 0.9;

/// Configuration for the accuracy filter.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfig {
    /// Fixes with accuracy above this are rejected (meters).
    pub reject_threshold_m: f64,

    /// Fixes at or below this accuracy are never smoothed (meters).
    pub excellent_accuracy_m: f64,

    /// Distance from the recent mean above which smoothing applies (meters).
    pub smoothing_distance_m: f64,

    /// Capacity of the recent window.
    pub window_size: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            reject_threshold_m: REJECT_THRESHOLD_M,
            excellent_accuracy_m: EXCELLENT_ACCURACY_M,
            smoothing_distance_m: DEFAULT_SMOOTHING_DISTANCE_M,
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

// =============================================================================
// Recent window
// =============================================================================

/// Bounded history of recently accepted samples, used only as smoothing input.
///
/// The window is never mutated in place. [`pushed`](Self::pushed) returns a new
/// window and the caller replaces its copy wholesale, so snapshots handed out
/// earlier stay consistent.
#[derive(Debug, Clone)]
pub struct RecentWindow {
    samples: Arc<[LocationSample]>,
}

impl RecentWindow {
    /// Create an empty window.
    pub fn new() -> Self {
        Self {
            samples: Arc::from(Vec::new()),
        }
    }

    /// Return a new window with `sample` appended, dropping the oldest entries
    /// beyond `capacity`.
    pub fn pushed(&self, sample: LocationSample, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let keep_from = (self.samples.len() + 1).saturating_sub(capacity);
        let mut next: Vec<LocationSample> = self.samples[keep_from..].to_vec();
        next.push(sample);
        Self {
            samples: Arc::from(next),
        }
    }

    /// Mean position of the valid entries and how many there were.
    ///
    /// Returns `None` when no entry is valid.
    pub fn valid_mean(&self) -> Option<((f64, f64), usize)> {
        let (sum_lat, sum_lon, count) = self
            .samples
            .iter()
            .filter(|s| s.has_valid_coordinates())
            .fold((0.0, 0.0, 0usize), |(lat, lon, n), s| {
                (lat + s.latitude, lon + s.longitude, n + 1)
            });

        if count == 0 {
            return None;
        }
        let n = count as f64;
        Some(((sum_lat / n, sum_lon / n), count))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples oldest first.
    pub fn samples(&self) -> &[LocationSample] {
        &self.samples
    }
}

impl Default for RecentWindow {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Filter
// =============================================================================

/// Result of filtering one raw fix.
#[derive(Debug, Clone)]
pub enum FilterOutcome {
    /// The fix is usable. `window` is the replacement recent window.
    Accepted {
        sample: LocationSample,
        window: RecentWindow,
    },

    /// The fix was dropped.
    Rejected(RejectReason),
}

/// Accuracy gate and jump smoother.
#[derive(Debug, Clone, Default)]
pub struct AccuracyFilter {
    config: FilterConfig,
}

impl AccuracyFilter {
    /// Create a filter with default thresholds.
    pub fn new() -> Self {
        Self::with_config(FilterConfig::default())
    }

    /// Create a filter with custom thresholds.
    pub fn with_config(config: FilterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Decide whether `raw` is usable, smoothing it against `window` if needed.
    pub fn process(&self, raw: &RawLocation, window: &RecentWindow) -> FilterOutcome {
        if !raw.has_valid_coordinates() {
            return FilterOutcome::Rejected(RejectReason::InvalidCoordinates);
        }
        if !raw.accuracy.is_finite() || raw.accuracy > self.config.reject_threshold_m {
            return FilterOutcome::Rejected(RejectReason::LowAccuracy {
                accuracy: raw.accuracy,
            });
        }

        let mut sample = LocationSample::from_raw(raw);

        if let Some((mean, count)) = window.valid_mean() {
            let distance = haversine_distance_m(mean, sample.position());
            if count >= MIN_SMOOTHING_ENTRIES
                && distance > self.config.smoothing_distance_m
                && raw.accuracy > self.config.excellent_accuracy_m
            {
                let weight = self.blend_weight(raw.accuracy);
                sample.latitude = weight * raw.latitude + (1.0 - weight) * mean.0;
                sample.longitude = weight * raw.longitude + (1.0 - weight) * mean.1;
                sample.smoothed = true;

                tracing::debug!(
                    distance_m = format!("{:.1}", distance),
                    accuracy_m = raw.accuracy,
                    weight = format!("{:.2}", weight),
                    "Smoothed location jump"
                );
            }
        }

        let window = if is_valid_coordinate(sample.latitude, sample.longitude) {
            window.pushed(sample.clone(), self.config.window_size)
        } else {
            window.clone()
        };

        FilterOutcome::Accepted { sample, window }
    }

    fn blend_weight(&self, accuracy: f64) -> f64 {
        (self.config.excellent_accuracy_m / accuracy).clamp(MIN_BLEND_WEIGHT, MAX_BLEND_WEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn raw(lat: f64, lon: f64, accuracy: f64) -> RawLocation {
        RawLocation::new(lat, lon, accuracy)
    }

    fn window_of(points: &[(f64, f64)]) -> RecentWindow {
        points.iter().fold(RecentWindow::new(), |w, &(lat, lon)| {
            w.pushed(LocationSample::from_raw(&raw(lat, lon, 5.0)), DEFAULT_WINDOW_SIZE)
        })
    }

    fn accepted(outcome: FilterOutcome) -> (LocationSample, RecentWindow) {
        match outcome {
            FilterOutcome::Accepted { sample, window } => (sample, window),
            FilterOutcome::Rejected(reason) => panic!("unexpected rejection: {}", reason),
        }
    }

    #[test]
    fn test_rejects_low_accuracy() {
        let filter = AccuracyFilter::new();
        let outcome = filter.process(&raw(51.5, -0.12, 150.0), &RecentWindow::new());
        assert!(matches!(
            outcome,
            FilterOutcome::Rejected(RejectReason::LowAccuracy { accuracy }) if accuracy == 150.0
        ));
    }

    #[test]
    fn test_accepts_threshold_accuracy() {
        let filter = AccuracyFilter::new();
        let (sample, _) = accepted(filter.process(&raw(51.5, -0.12, 100.0), &RecentWindow::new()));
        assert_eq!(sample.accuracy, 100.0);
    }

    #[test]
    fn test_rejects_non_finite_accuracy() {
        let filter = AccuracyFilter::new();
        let outcome = filter.process(&raw(51.5, -0.12, f64::NAN), &RecentWindow::new());
        assert!(matches!(
            outcome,
            FilterOutcome::Rejected(RejectReason::LowAccuracy { .. })
        ));
    }

    #[test]
    fn test_rejects_invalid_coordinates() {
        let filter = AccuracyFilter::new();
        let window = RecentWindow::new();

        for (lat, lon) in [(f64::NAN, 10.0), (95.0, 10.0), (10.0, 200.0), (0.0, 0.0)] {
            let outcome = filter.process(&raw(lat, lon, 5.0), &window);
            assert!(
                matches!(
                    outcome,
                    FilterOutcome::Rejected(RejectReason::InvalidCoordinates)
                ),
                "({}, {}) should be rejected",
                lat,
                lon
            );
        }
    }

    #[test]
    fn test_smoothing_blends_toward_mean() {
        let filter = AccuracyFilter::new();
        let window = window_of(&[(51.5000, -0.1200), (51.5000, -0.1200)]);

        // ~111m north of the mean with 80m accuracy: weight = clamp(5/80) = 0.1
        let (sample, _) = accepted(filter.process(&raw(51.5010, -0.1200, 80.0), &window));

        assert!(sample.smoothed);
        let expected_lat = 0.1 * 51.5010 + 0.9 * 51.5000;
        assert!((sample.latitude - expected_lat).abs() < 1e-12);
        assert!((sample.longitude - -0.1200).abs() < 1e-12);
        assert_eq!(sample.accuracy, 80.0);
    }

    #[test]
    fn test_blend_weight_clamped_high() {
        let filter = AccuracyFilter::new();
        let window = window_of(&[(51.5000, -0.1200), (51.5000, -0.1200)]);

        // 5/5.5 = 0.909 clamps to 0.9
        let (sample, _) = accepted(filter.process(&raw(51.5010, -0.1200, 5.5), &window));
        let expected_lat = 0.9 * 51.5010 + 0.1 * 51.5000;
        assert!((sample.latitude - expected_lat).abs() < 1e-12);
    }

    #[test]
    fn test_no_smoothing_when_excellent() {
        let filter = AccuracyFilter::new();
        let window = window_of(&[(51.5000, -0.1200), (51.5000, -0.1200)]);

        let (sample, _) = accepted(filter.process(&raw(51.5010, -0.1200, 5.0), &window));
        assert!(!sample.smoothed);
        assert_eq!(sample.latitude, 51.5010);
    }

    #[test]
    fn test_no_smoothing_with_single_entry() {
        let filter = AccuracyFilter::new();
        let window = window_of(&[(51.5000, -0.1200)]);

        let (sample, _) = accepted(filter.process(&raw(51.5010, -0.1200, 80.0), &window));
        assert!(!sample.smoothed);
    }

    #[test]
    fn test_no_smoothing_within_distance() {
        let filter = AccuracyFilter::new();
        let window = window_of(&[(51.5000, -0.1200), (51.5000, -0.1200)]);

        // ~11m away
        let (sample, _) = accepted(filter.process(&raw(51.5001, -0.1200, 50.0), &window));
        assert!(!sample.smoothed);
        assert_eq!(sample.latitude, 51.5001);
    }

    #[test]
    fn test_window_capped_and_drops_oldest() {
        let filter = AccuracyFilter::new();
        let mut window = RecentWindow::new();

        for i in 0..7 {
            let lat = 51.5 + i as f64 * 0.00001;
            let (_, next) = accepted(filter.process(&raw(lat, -0.12, 3.0), &window));
            window = next;
        }

        assert_eq!(window.len(), DEFAULT_WINDOW_SIZE);
        assert!((window.samples()[0].latitude - 51.50002).abs() < 1e-9);
    }

    #[test]
    fn test_window_replaced_not_mutated() {
        let filter = AccuracyFilter::new();
        let original = window_of(&[(51.5, -0.12)]);

        let (_, next) = accepted(filter.process(&raw(51.5001, -0.12, 3.0), &original));

        assert_eq!(original.len(), 1);
        assert_eq!(next.len(), 2);
    }

    #[test]
    fn test_valid_mean_ignores_invalid_entries() {
        let window = RecentWindow::new()
            .pushed(LocationSample::from_raw(&raw(10.0, 20.0, 5.0)), 5)
            .pushed(LocationSample::from_raw(&raw(f64::NAN, 20.0, 5.0)), 5)
            .pushed(LocationSample::from_raw(&raw(12.0, 22.0, 5.0)), 5);

        let ((lat, lon), count) = window.valid_mean().unwrap();
        assert_eq!(count, 2);
        assert!((lat - 11.0).abs() < 1e-12);
        assert!((lon - 21.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_window_has_no_mean() {
        assert!(RecentWindow::new().valid_mean().is_none());
    }

    proptest! {
        /// Property: anything worse than the threshold is rejected.
        #[test]
        fn prop_rejects_above_threshold(
            lat in -89.0f64..89.0f64,
            lon in -179.0f64..179.0f64,
            accuracy in 100.001f64..10_000.0f64,
        ) {
            let filter = AccuracyFilter::new();
            let outcome = filter.process(&raw(lat, lon, accuracy), &RecentWindow::new());
            let rejected = matches!(outcome, FilterOutcome::Rejected(_));
            prop_assert!(rejected);
        }

        /// Property: accepted samples are always valid and keep their accuracy.
        #[test]
        fn prop_accepted_samples_are_valid(
            lat in 1.0f64..60.0f64,
            lon in 1.0f64..60.0f64,
            accuracy in 0.5f64..100.0f64,
            offsets in proptest::collection::vec((-0.01f64..0.01f64, -0.01f64..0.01f64), 0..6),
        ) {
            let filter = AccuracyFilter::new();
            let mut window = RecentWindow::new();
            for (dlat, dlon) in offsets {
                if let FilterOutcome::Accepted { window: next, .. } =
                    filter.process(&raw(lat + dlat, lon + dlon, 4.0), &window)
                {
                    window = next;
                }
            }

            let outcome = filter.process(&raw(lat, lon, accuracy), &window);
            match outcome {
                FilterOutcome::Accepted { sample, window: next } => {
                    prop_assert!(sample.has_valid_coordinates());
                    prop_assert_eq!(sample.accuracy, accuracy);
                    prop_assert!(next.len() <= DEFAULT_WINDOW_SIZE);
                }
                FilterOutcome::Rejected(reason) => {
                    prop_assert!(false, "unexpected rejection: {}", reason);
                }
            }
        }

        /// Property: a blended sample lies between the raw fix and the mean.
        #[test]
        fn prop_blend_between_raw_and_mean(
            jump in 0.001f64..0.05f64,
            accuracy in 5.01f64..100.0f64,
        ) {
            let filter = AccuracyFilter::new();
            let window = window_of(&[(40.0, 10.0), (40.0, 10.0)]);

            let outcome = filter.process(&raw(40.0 + jump, 10.0, accuracy), &window);
            if let FilterOutcome::Accepted { sample, .. } = outcome {
                prop_assert!(sample.smoothed);
                prop_assert!(sample.latitude >= 40.0);
                prop_assert!(sample.latitude <= 40.0 + jump);
            }
        }
    }
}
