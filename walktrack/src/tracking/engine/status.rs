//! Engine status snapshot.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::tracking::lifecycle::AppState;
use crate::tracking::permission::PermissionState;
use crate::tracking::session::TrackingSession;
use crate::tracking::warmup::WarmupStatus;
use crate::tracking::watchdog::RecoveryState;

/// Lifecycle state of the engine.
///
/// ```text
/// Idle ──start──► RequestingPermission ──granted──► Active ⇄ Paused
///  ▲                    │ denied                      │        │
///  └────────────────────┴──────────── stop ◄──────────┴────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    Idle,
    RequestingPermission,
    Active,
    Paused,
}

impl std::fmt::Display for TrackingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::RequestingPermission => write!(f, "requesting_permission"),
            Self::Active => write!(f, "active"),
            Self::Paused => write!(f, "paused"),
        }
    }
}

/// Point-in-time view of the engine.
#[derive(Debug, Clone)]
pub struct EngineStatus {
    pub state: TrackingState,
    pub session: Option<Arc<TrackingSession>>,
    pub warmup: WarmupStatus,
    pub recovery: RecoveryState,

    /// Permission state from the most recent check, if any.
    pub permissions: Option<PermissionState>,

    pub app_state: AppState,

    /// Open provider subscriptions (main + warm-up).
    pub open_subscriptions: usize,

    /// Armed engine timers (watchdog, recovery retry, warm-up deadline, permission poll).
    pub pending_timers: usize,
}

impl EngineStatus {
    /// True when nothing is running: no subscriptions and no timers.
    pub fn is_quiescent(&self) -> bool {
        self.open_subscriptions == 0 && self.pending_timers == 0
    }
}
