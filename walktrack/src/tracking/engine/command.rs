//! Messages into the engine actor.

use tokio::sync::oneshot;

use super::status::EngineStatus;
use crate::tracking::alerts::AlertActionKind;
use crate::tracking::error::{ProviderError, TrackingError};
use crate::tracking::permission::PermissionState;
use crate::tracking::session::TrackingSession;
use crate::tracking::watchdog::ProbeOutcome;

/// Caller requests, each with a reply channel.
pub(crate) enum Command {
    Start {
        session_id: String,
        reply: oneshot::Sender<Result<(), TrackingError>>,
    },
    Stop {
        reply: oneshot::Sender<Option<TrackingSession>>,
    },
    Pause {
        reply: oneshot::Sender<bool>,
    },
    Resume {
        reply: oneshot::Sender<bool>,
    },
    AttemptRecovery {
        reply: oneshot::Sender<bool>,
    },
    PerformAction {
        action: AlertActionKind,
        reply: oneshot::Sender<bool>,
    },
    Status {
        reply: oneshot::Sender<EngineStatus>,
    },
}

/// Results from tasks the actor spawned.
///
/// `epoch` identifies the activity period that spawned the task; results
/// from an earlier epoch are discarded.
#[derive(Debug)]
pub(crate) enum Internal {
    PermissionChecked {
        epoch: u64,
        result: Result<PermissionState, ProviderError>,
    },
    ProbeFinished {
        epoch: u64,
        outcome: ProbeOutcome,
    },
}
