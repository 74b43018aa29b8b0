//! Error types for the tracking engine.
//!
//! Only a handful of failures ever reach the caller as `Err`: starting a
//! session without permission, starting while one is active, and calls made
//! after the engine shut down. Everything that happens *during* a walk
//! (revoked permission, lost signal, disabled services) is absorbed into the
//! session as a [`TrackingIssue`] and announced through the event stream.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::permission::PermissionScope;

/// Errors returned by [`TrackingEngine`](super::TrackingEngine) operations.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// A session is already running.
    #[error("a tracking session is already active")]
    AlreadyActive,

    /// The user denied a permission required to start tracking.
    #[error("{scope} location permission denied")]
    PermissionDenied { scope: PermissionScope },

    /// The platform provider failed.
    #[error("location provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The engine task has terminated.
    #[error("tracking engine is shut down")]
    EngineClosed,
}

/// Errors reported by a [`LocationProvider`](super::LocationProvider).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Location services are unavailable on this device.
    #[error("location services unavailable")]
    Unavailable,

    /// A one-shot request did not produce a fix in time.
    #[error("location request timed out")]
    Timeout,

    /// The platform refused the request for lack of permission.
    #[error("location permission denied")]
    PermissionDenied,

    /// Any other platform failure.
    #[error("platform error: {0}")]
    Platform(String),
}

/// An externally caused problem recorded on the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingIssue {
    PermissionRevoked,
    LocationServicesDisabled,
    GpsSignalLost,
    GpsRecoveryFailed,
}

impl std::fmt::Display for TrackingIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionRevoked => write!(f, "permission_revoked"),
            Self::LocationServicesDisabled => write!(f, "location_services_disabled"),
            Self::GpsSignalLost => write!(f, "gps_signal_lost"),
            Self::GpsRecoveryFailed => write!(f, "gps_recovery_failed"),
        }
    }
}

/// Why the accuracy filter dropped a raw fix.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum RejectReason {
    /// NaN, out of range, or exactly (0, 0).
    #[error("invalid coordinates")]
    InvalidCoordinates,

    /// Accuracy radius above the rejection threshold (or not finite).
    #[error("accuracy {accuracy}m exceeds threshold")]
    LowAccuracy { accuracy: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_message_names_scope() {
        let err = TrackingError::PermissionDenied {
            scope: PermissionScope::Background,
        };
        assert_eq!(err.to_string(), "background location permission denied");
    }

    #[test]
    fn test_provider_error_converts() {
        let err: TrackingError = ProviderError::Timeout.into();
        assert!(matches!(err, TrackingError::Provider(ProviderError::Timeout)));
    }

    #[test]
    fn test_issue_serializes_snake_case() {
        let json = serde_json::to_string(&TrackingIssue::GpsRecoveryFailed).unwrap();
        assert_eq!(json, "\"gps_recovery_failed\"");
        assert_eq!(
            TrackingIssue::LocationServicesDisabled.to_string(),
            "location_services_disabled"
        );
    }
}
