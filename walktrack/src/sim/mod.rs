//! In-process simulation of the platform collaborators.
//!
//! Used by the integration tests and by `walktrack replay`. Every type here
//! is deterministic: nothing happens unless the harness drives it.
//!
//! - [`SimulatedProvider`] - subscriptions, one-shot queue, permissions, service switch
//! - [`SimulatedLifecycle`] - foreground/background signal
//! - [`RecordingAlertSurface`] / [`RecordingSettingsNavigator`] - capture UI side effects
//! - [`trace`] - CSV walk traces and a player that feeds them in

mod platform;
mod provider;
pub mod trace;

pub use platform::{RecordingAlertSurface, RecordingSettingsNavigator, SimulatedLifecycle};
pub use provider::{SimulatedProvider, SUBSCRIPTION_BUFFER};
pub use trace::{load_trace, parse_trace, play_trace, TraceAction, TraceEntry, TraceError};
