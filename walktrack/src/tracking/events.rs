//! Outbound event stream.

use std::sync::Arc;

use super::error::TrackingIssue;
use super::sample::LocationSample;
use super::session::TrackingSession;
use super::warmup::WarmupReport;

/// Events broadcast by the engine to its subscribers.
///
/// Session snapshots are shared; cloning an event is cheap. A subscriber
/// that holds on to a snapshot makes the engine copy the session on the next
/// change, which costs the annotations plus one chunk of coordinates (see
/// [`CoordinateLog`](super::CoordinateLog)), not the whole walk.
#[derive(Debug, Clone)]
pub enum TrackingEvent {
    /// A fix was accepted and appended to the session.
    LocationUpdate {
        sample: LocationSample,
        session: Arc<TrackingSession>,
    },

    /// The session changed state outside the sample flow (pause, resume,
    /// signal loss). `error` carries the issue, if any.
    SessionUpdate {
        session: Arc<TrackingSession>,
        error: Option<TrackingIssue>,
    },

    /// A warm-up burst finished.
    WarmupCompleted(WarmupReport),

    /// The session was stopped. Carries the finalized session.
    JourneyComplete(Arc<TrackingSession>),
}

impl TrackingEvent {
    /// Session snapshot carried by this event, if any.
    pub fn session(&self) -> Option<&Arc<TrackingSession>> {
        match self {
            Self::LocationUpdate { session, .. }
            | Self::SessionUpdate { session, .. }
            | Self::JourneyComplete(session) => Some(session),
            Self::WarmupCompleted(_) => None,
        }
    }
}
