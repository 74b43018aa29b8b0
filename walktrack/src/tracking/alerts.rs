//! User-facing alert catalogue.
//!
//! Every external-cause pause is announced with exactly one alert, and a
//! successful recovery is announced once. The wording of remediation steps
//! differs per platform, so the catalogue is built for one [`Platform`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::session::PauseReason;

/// Host platform, used for remediation wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Ios,
    Android,
    #[default]
    Other,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ios => write!(f, "ios"),
            Self::Android => write!(f, "android"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ios" => Ok(Self::Ios),
            "android" => Ok(Self::Android),
            "other" => Ok(Self::Other),
            other => Err(format!(
                "unknown platform '{}' (expected ios, android or other)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    PermissionRevoked,
    SignalLost,
    SignalRestored,
    ServicesDisabled,
    RecoveryFailed,
    TrackingResumed,
}

/// What tapping an alert button should do.
///
/// The host passes the kind back to
/// [`TrackingEngine::perform_action`](super::TrackingEngine::perform_action).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertActionKind {
    Dismiss,
    OpenSettings,
    RetryGpsRecovery,
    RetryPermissionRecovery,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertAction {
    pub label: String,
    pub kind: AlertActionKind,
}

impl AlertAction {
    fn new(label: &str, kind: AlertActionKind) -> Self {
        Self {
            label: label.to_string(),
            kind,
        }
    }
}

/// A titled message with one or two actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
    pub actions: Vec<AlertAction>,
}

/// Builds alerts with platform-specific wording.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertCatalog {
    platform: Platform,
}

impl AlertCatalog {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Alert announcing a pause. `None` for caller-requested pauses.
    pub fn for_pause(&self, reason: PauseReason) -> Option<Alert> {
        match reason {
            PauseReason::PermissionRevoked => Some(self.permission_revoked()),
            PauseReason::LocationServicesDisabled => Some(self.services_disabled()),
            PauseReason::GpsRecoveryFailed => Some(self.recovery_failed()),
            PauseReason::UserRequested => None,
        }
    }

    pub fn permission_revoked(&self) -> Alert {
        let steps = match self.platform {
            Platform::Ios => "Open Settings, tap Location and choose \"Always\" with Precise Location on.",
            Platform::Android => "Open Settings, tap Permissions > Location and choose \"Allow all the time\".",
            Platform::Other => "Open your device settings and allow location access at all times for this app.",
        };
        Alert {
            kind: AlertKind::PermissionRevoked,
            title: "Location Permission Needed".to_string(),
            message: format!(
                "Location access was turned off, so your walk has been paused. Your route so far is saved. {}",
                steps
            ),
            actions: vec![
                AlertAction::new("Open Settings", AlertActionKind::OpenSettings),
                AlertAction::new("Try Again", AlertActionKind::RetryPermissionRecovery),
            ],
        }
    }

    pub fn signal_lost(&self) -> Alert {
        Alert {
            kind: AlertKind::SignalLost,
            title: "GPS Signal Lost".to_string(),
            message: "We lost your GPS signal and are trying to reconnect. Moving to an open area can help.".to_string(),
            actions: vec![AlertAction::new("OK", AlertActionKind::Dismiss)],
        }
    }

    pub fn signal_restored(&self) -> Alert {
        Alert {
            kind: AlertKind::SignalRestored,
            title: "GPS Signal Restored".to_string(),
            message: "Your location is being tracked again.".to_string(),
            actions: vec![AlertAction::new("OK", AlertActionKind::Dismiss)],
        }
    }

    pub fn services_disabled(&self) -> Alert {
        let steps = match self.platform {
            Platform::Ios => "Open Settings > Privacy & Security > Location Services and turn it on.",
            Platform::Android => "Swipe down from the top of the screen and turn on Location.",
            Platform::Other => "Turn on location services in your device settings.",
        };
        Alert {
            kind: AlertKind::ServicesDisabled,
            title: "Location Services Off".to_string(),
            message: format!(
                "Location services are turned off, so your walk has been paused. {}",
                steps
            ),
            actions: vec![
                AlertAction::new("Open Settings", AlertActionKind::OpenSettings),
                AlertAction::new("Cancel", AlertActionKind::Dismiss),
            ],
        }
    }

    pub fn recovery_failed(&self) -> Alert {
        Alert {
            kind: AlertKind::RecoveryFailed,
            title: "GPS Unavailable".to_string(),
            message: "We couldn't get your location after several tries, so your walk has been paused. Your route so far is saved.".to_string(),
            actions: vec![
                AlertAction::new("Retry", AlertActionKind::RetryGpsRecovery),
                AlertAction::new("Cancel", AlertActionKind::Dismiss),
            ],
        }
    }

    pub fn tracking_resumed(&self) -> Alert {
        Alert {
            kind: AlertKind::TrackingResumed,
            title: "Tracking Resumed".to_string(),
            message: "Your walk is being tracked again.".to_string(),
            actions: vec![AlertAction::new("OK", AlertActionKind::Dismiss)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pause_alerts_by_reason() {
        let catalog = AlertCatalog::new(Platform::Ios);

        assert_eq!(
            catalog.for_pause(PauseReason::PermissionRevoked).unwrap().kind,
            AlertKind::PermissionRevoked
        );
        assert_eq!(
            catalog
                .for_pause(PauseReason::LocationServicesDisabled)
                .unwrap()
                .kind,
            AlertKind::ServicesDisabled
        );
        assert_eq!(
            catalog.for_pause(PauseReason::GpsRecoveryFailed).unwrap().kind,
            AlertKind::RecoveryFailed
        );
        assert!(catalog.for_pause(PauseReason::UserRequested).is_none());
    }

    #[test]
    fn test_remediation_is_platform_specific() {
        let ios = AlertCatalog::new(Platform::Ios).permission_revoked();
        let android = AlertCatalog::new(Platform::Android).permission_revoked();

        assert!(ios.message.contains("\"Always\""));
        assert!(android.message.contains("Allow all the time"));
        assert_ne!(ios.message, android.message);
    }

    #[test]
    fn test_every_alert_has_one_or_two_actions() {
        let catalog = AlertCatalog::default();
        for alert in [
            catalog.permission_revoked(),
            catalog.signal_lost(),
            catalog.signal_restored(),
            catalog.services_disabled(),
            catalog.recovery_failed(),
            catalog.tracking_resumed(),
        ] {
            assert!(
                (1..=2).contains(&alert.actions.len()),
                "{:?} has {} actions",
                alert.kind,
                alert.actions.len()
            );
        }
    }

    #[test]
    fn test_recovery_failed_offers_retry() {
        let alert = AlertCatalog::default().recovery_failed();
        assert!(alert
            .actions
            .iter()
            .any(|a| a.kind == AlertActionKind::RetryGpsRecovery));
    }

    #[test]
    fn test_parse_platform() {
        assert_eq!("iOS".parse::<Platform>(), Ok(Platform::Ios));
        assert_eq!("android".parse::<Platform>(), Ok(Platform::Android));
        assert!("windows-phone".parse::<Platform>().is_err());
    }
}
