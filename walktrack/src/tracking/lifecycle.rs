//! App lifecycle bridge.
//!
//! Translates raw foreground/background signals into the transitions the
//! engine cares about. The bridge tracks the app state for the engine's whole
//! lifetime, but only reports transitions while a session is running.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Platform app state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppState {
    Active,
    Inactive,
    Background,
}

impl std::fmt::Display for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
            Self::Background => write!(f, "background"),
        }
    }
}

impl FromStr for AppState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "background" => Ok(Self::Background),
            other => Err(format!("unknown app state '{}'", other)),
        }
    }
}

/// A transition that affects the running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleChange {
    EnteredBackground,

    /// Back in the foreground. `background_duration` is `None` when the app
    /// only passed through `Inactive`.
    ReturnedToForeground { background_duration: Option<Duration> },
}

/// Lifecycle state tracker.
#[derive(Debug, Clone)]
pub struct LifecycleBridge {
    current: AppState,
    background_since: Option<Instant>,
}

impl LifecycleBridge {
    pub fn new(initial: AppState) -> Self {
        Self {
            current: initial,
            background_since: None,
        }
    }

    pub fn current(&self) -> AppState {
        self.current
    }

    pub fn is_background(&self) -> bool {
        self.current == AppState::Background
    }

    /// Apply a platform signal.
    pub fn on_transition(
        &mut self,
        next: AppState,
        now: Instant,
        session_active: bool,
    ) -> Option<LifecycleChange> {
        let previous = std::mem::replace(&mut self.current, next);

        if !session_active {
            self.background_since = None;
            return None;
        }

        match (previous, next) {
            (AppState::Background, AppState::Background) => None,
            (_, AppState::Background) => {
                self.background_since = Some(now);
                Some(LifecycleChange::EnteredBackground)
            }
            (AppState::Inactive | AppState::Background, AppState::Active) => {
                let background_duration = self
                    .background_since
                    .take()
                    .map(|since| now.saturating_duration_since(since));
                Some(LifecycleChange::ReturnedToForeground {
                    background_duration,
                })
            }
            _ => None,
        }
    }

    /// How long the app has been in the background, if it is.
    pub fn background_elapsed(&self, now: Instant) -> Option<Duration> {
        if !self.is_background() {
            return None;
        }
        self.background_since
            .map(|since| now.saturating_duration_since(since))
    }

    /// Forget any pending background start (session ended).
    pub fn reset_background(&mut self) {
        self.background_since = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_then_foreground() {
        let mut bridge = LifecycleBridge::new(AppState::Active);
        let t0 = Instant::now();

        assert_eq!(
            bridge.on_transition(AppState::Background, t0, true),
            Some(LifecycleChange::EnteredBackground)
        );
        assert_eq!(
            bridge.background_elapsed(t0 + Duration::from_secs(3)),
            Some(Duration::from_secs(3))
        );

        let change = bridge.on_transition(AppState::Active, t0 + Duration::from_secs(42), true);
        assert_eq!(
            change,
            Some(LifecycleChange::ReturnedToForeground {
                background_duration: Some(Duration::from_secs(42))
            })
        );
        assert!(bridge.background_elapsed(t0 + Duration::from_secs(43)).is_none());
    }

    #[test]
    fn test_inactive_to_active_without_background() {
        let mut bridge = LifecycleBridge::new(AppState::Active);
        let t0 = Instant::now();

        assert!(bridge.on_transition(AppState::Inactive, t0, true).is_none());
        assert_eq!(
            bridge.on_transition(AppState::Active, t0, true),
            Some(LifecycleChange::ReturnedToForeground {
                background_duration: None
            })
        );
    }

    #[test]
    fn test_no_changes_without_session() {
        let mut bridge = LifecycleBridge::new(AppState::Active);
        let t0 = Instant::now();

        assert!(bridge.on_transition(AppState::Background, t0, false).is_none());
        assert_eq!(bridge.current(), AppState::Background);
        assert!(bridge.on_transition(AppState::Active, t0, false).is_none());
    }

    #[test]
    fn test_repeated_background_signal_ignored() {
        let mut bridge = LifecycleBridge::new(AppState::Background);
        assert!(bridge
            .on_transition(AppState::Background, Instant::now(), true)
            .is_none());
    }

    #[test]
    fn test_parse_app_state() {
        assert_eq!("Background".parse::<AppState>(), Ok(AppState::Background));
        assert_eq!(" active ".parse::<AppState>(), Ok(AppState::Active));
        assert!("asleep".parse::<AppState>().is_err());
    }
}
