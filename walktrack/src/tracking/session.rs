//! Tracking session aggregate.
//!
//! A [`TrackingSession`] is one walk: the ordered list of accepted samples
//! plus the annotations collected along the way (pauses, background
//! transitions, recoveries). Only the engine actor mutates a session; every
//! mutator here is crate-private and callers only ever see snapshots.
//!
//! Sessions serialize to camelCase JSON so hosts can persist or display them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::coordinates::CoordinateLog;
use super::error::TrackingIssue;
use super::geo::path_length_m;
use super::sample::LocationSample;

/// Why a session is paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseReason {
    /// Foreground or background permission was withdrawn mid-walk.
    PermissionRevoked,

    /// The device's location services were switched off.
    LocationServicesDisabled,

    /// The signal watchdog exhausted its recovery attempts.
    GpsRecoveryFailed,

    /// The caller asked to pause.
    UserRequested,
}

impl PauseReason {
    /// True when the pause was caused by the environment rather than the caller.
    pub fn is_external(&self) -> bool {
        !matches!(self, Self::UserRequested)
    }

    /// The session issue this pause records, if any.
    pub fn issue(&self) -> Option<TrackingIssue> {
        match self {
            Self::PermissionRevoked => Some(TrackingIssue::PermissionRevoked),
            Self::LocationServicesDisabled => Some(TrackingIssue::LocationServicesDisabled),
            Self::GpsRecoveryFailed => Some(TrackingIssue::GpsRecoveryFailed),
            Self::UserRequested => None,
        }
    }
}

impl std::fmt::Display for PauseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionRevoked => write!(f, "permission_revoked"),
            Self::LocationServicesDisabled => write!(f, "location_services_disabled"),
            Self::GpsRecoveryFailed => write!(f, "gps_recovery_failed"),
            Self::UserRequested => write!(f, "user_requested"),
        }
    }
}

/// Direction of an app lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    BackgroundTransition,
    ForegroundTransition,
}

/// A background or foreground transition recorded during a walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundSegment {
    pub timestamp: DateTime<Utc>,

    #[serde(rename = "type")]
    pub kind: TransitionKind,

    /// Time spent in the background, set on foreground transitions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
}

/// How a paused session came back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryKind {
    PermissionRestored,
    ServicesRestored,
    SignalRestored,
    ManualResume,
}

impl RecoveryKind {
    /// The recovery kind that ends a pause for `reason`.
    pub fn for_pause(reason: Option<PauseReason>) -> Self {
        match reason {
            Some(PauseReason::PermissionRevoked) => Self::PermissionRestored,
            Some(PauseReason::LocationServicesDisabled) => Self::ServicesRestored,
            Some(PauseReason::GpsRecoveryFailed) => Self::SignalRestored,
            Some(PauseReason::UserRequested) | None => Self::ManualResume,
        }
    }
}

/// A resume recorded against a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryEvent {
    #[serde(rename = "type")]
    pub kind: RecoveryKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovered_from: Option<PauseReason>,

    pub timestamp: DateTime<Utc>,

    /// How long the session was paused.
    pub pause_duration_secs: f64,
}

/// One walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingSession {
    pub id: String,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Elapsed seconds, stamped at stop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    pub coordinates: CoordinateLog,
    pub is_active: bool,
    pub is_paused: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_reason: Option<PauseReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub background_segments: Vec<BackgroundSegment>,
    #[serde(default)]
    pub recovery_events: Vec<RecoveryEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TrackingIssue>,
}

impl TrackingSession {
    pub(crate) fn new(id: impl Into<String>, start_time: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            start_time,
            end_time: None,
            duration_secs: None,
            coordinates: CoordinateLog::new(),
            is_active: true,
            is_paused: false,
            pause_reason: None,
            pause_time: None,
            background_segments: Vec::new(),
            recovery_events: Vec::new(),
            error: None,
        }
    }

    pub(crate) fn record_sample(&mut self, sample: LocationSample) {
        self.coordinates.push(sample);
    }

    /// Mark the session paused. The pause reason's issue becomes the session error.
    pub(crate) fn mark_paused(&mut self, reason: PauseReason, at: DateTime<Utc>) {
        self.is_paused = true;
        self.pause_reason = Some(reason);
        self.pause_time = Some(at);
        if let Some(issue) = reason.issue() {
            self.error = Some(issue);
        }
    }

    /// Clear the pause and append a recovery event.
    pub(crate) fn mark_resumed(&mut self, at: DateTime<Utc>) -> RecoveryEvent {
        let pause_duration_secs = self
            .pause_time
            .map(|since| seconds_between(since, at))
            .unwrap_or(0.0);
        let event = RecoveryEvent {
            kind: RecoveryKind::for_pause(self.pause_reason),
            recovered_from: self.pause_reason,
            timestamp: at,
            pause_duration_secs,
        };

        self.is_paused = false;
        self.pause_reason = None;
        self.pause_time = None;
        self.error = None;
        self.recovery_events.push(event.clone());
        event
    }

    pub(crate) fn record_transition(
        &mut self,
        kind: TransitionKind,
        at: DateTime<Utc>,
        duration_secs: Option<f64>,
    ) {
        self.background_segments.push(BackgroundSegment {
            timestamp: at,
            kind,
            duration_secs,
        });
    }

    pub(crate) fn set_error(&mut self, issue: Option<TrackingIssue>) {
        self.error = issue;
    }

    /// Deactivate and stamp end time and duration.
    pub(crate) fn finalize(&mut self, end_time: DateTime<Utc>) {
        self.is_active = false;
        self.end_time = Some(end_time);
        self.duration_secs = Some(seconds_between(self.start_time, end_time));
    }

    pub fn coordinate_count(&self) -> usize {
        self.coordinates.len()
    }

    pub fn last_sample(&self) -> Option<&LocationSample> {
        self.coordinates.last()
    }

    /// Walked distance along the recorded coordinates, in meters.
    pub fn distance_m(&self) -> f64 {
        path_length_m(self.coordinates.iter().map(LocationSample::position))
    }
}

/// Non-negative seconds from `from` to `to`.
pub(crate) fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let millis = (to - from).num_milliseconds();
    (millis.max(0) as f64) / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::sample::RawLocation;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_new_session_is_active() {
        let session = TrackingSession::new("walk-1", t0());
        assert!(session.is_active);
        assert!(!session.is_paused);
        assert_eq!(session.coordinate_count(), 0);
        assert!(session.end_time.is_none());
    }

    #[test]
    fn test_pause_and_resume_records_event() {
        let mut session = TrackingSession::new("walk-1", t0());
        session.mark_paused(PauseReason::PermissionRevoked, t0() + Duration::seconds(60));

        assert!(session.is_paused);
        assert_eq!(session.error, Some(TrackingIssue::PermissionRevoked));

        let event = session.mark_resumed(t0() + Duration::seconds(105));
        assert_eq!(event.kind, RecoveryKind::PermissionRestored);
        assert_eq!(event.recovered_from, Some(PauseReason::PermissionRevoked));
        assert_eq!(event.pause_duration_secs, 45.0);
        assert!(!session.is_paused);
        assert!(session.pause_reason.is_none());
        assert!(session.error.is_none());
        assert_eq!(session.recovery_events.len(), 1);
    }

    #[test]
    fn test_user_pause_sets_no_error() {
        let mut session = TrackingSession::new("walk-1", t0());
        session.mark_paused(PauseReason::UserRequested, t0());
        assert!(session.error.is_none());
        assert!(!PauseReason::UserRequested.is_external());
    }

    #[test]
    fn test_finalize_stamps_duration() {
        let mut session = TrackingSession::new("walk-1", t0());
        session.finalize(t0() + Duration::milliseconds(90_500));

        assert!(!session.is_active);
        assert_eq!(session.duration_secs, Some(90.5));
        assert_eq!(session.end_time, Some(t0() + Duration::milliseconds(90_500)));
    }

    #[test]
    fn test_distance_follows_coordinates() {
        let mut session = TrackingSession::new("walk-1", t0());
        session.record_sample(LocationSample::from_raw(&RawLocation::new(0.0, 10.0, 5.0)));
        session.record_sample(LocationSample::from_raw(&RawLocation::new(0.001, 10.0, 5.0)));

        assert!((session.distance_m() - 111.19).abs() < 0.1);
        assert_eq!(session.last_sample().unwrap().latitude, 0.001);
    }

    #[test]
    fn test_segment_serializes_type_field() {
        let mut session = TrackingSession::new("walk-1", t0());
        session.record_transition(TransitionKind::ForegroundTransition, t0(), Some(12.0));

        let json = serde_json::to_value(&session).unwrap();
        let segment = &json["backgroundSegments"][0];
        assert_eq!(segment["type"], "foreground_transition");
        assert_eq!(segment["durationSecs"], 12.0);
        assert_eq!(json["isActive"], true);
    }

    #[test]
    fn test_seconds_between_never_negative() {
        assert_eq!(seconds_between(t0() + Duration::seconds(5), t0()), 0.0);
    }
}
