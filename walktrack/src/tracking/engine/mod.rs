//! Session & state manager.
//!
//! [`TrackingEngine`] is the handle the host application holds. Behind it, a
//! single actor task owns the session and every controller; the handle only
//! sends commands and subscribes to events.
//!
//! # Architecture
//!
//! ```text
//!   TrackingEngine ──commands──►┌──────────────────────────────┐
//!        ▲                      │          EngineActor          │
//!        │ events (broadcast)   │  filter · warm-up · monitor   │
//!        └──────────────────────│  watchdog · lifecycle bridge  │
//!                               └──┬─────────┬────────┬────────┘
//!                                  │         │        │
//!                      LocationProvider  AlertSurface  SampleStoreWriter
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use walktrack::tracking::{Collaborators, EngineConfig, TrackingEngine, TrackingEvent};
//!
//! let engine = TrackingEngine::spawn(
//!     Collaborators::new(provider, lifecycle),
//!     EngineConfig::default(),
//! );
//!
//! let mut events = engine.subscribe();
//! engine.start("walk-42").await?;
//!
//! while let Ok(event) = events.recv().await {
//!     if let TrackingEvent::LocationUpdate { sample, session } = event {
//!         println!("{} points, last at {}", session.coordinate_count(), sample.timestamp);
//!     }
//! }
//!
//! let journey = engine.stop().await?;
//! engine.shutdown().await;
//! ```

mod actor;
mod command;
mod config;
mod status;

pub use config::{EngineConfig, DEFAULT_COMMAND_CAPACITY, DEFAULT_EVENT_CAPACITY};
pub use status::{EngineStatus, TrackingState};

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use self::actor::{ActorParts, EngineActor};
use self::command::Command;
use super::alerts::AlertActionKind;
use super::error::TrackingError;
use super::events::TrackingEvent;
use super::provider::{
    AlertSurface, AppLifecycleSource, LocationProvider, SettingsNavigator, TracingAlertSurface,
    TracingSettingsNavigator,
};
use super::sample::LocationSample;
use super::session::TrackingSession;
use crate::storage::{MemorySampleStore, SampleStore, SampleStoreWriter, StorageError};

/// External collaborators injected into the engine.
pub struct Collaborators<P> {
    pub provider: Arc<P>,
    pub lifecycle: Arc<dyn AppLifecycleSource>,
    pub alerts: Arc<dyn AlertSurface>,
    pub settings: Arc<dyn SettingsNavigator>,
    pub store: Arc<dyn SampleStore>,
}

impl<P: LocationProvider> Collaborators<P> {
    /// Collaborators with logging alerts and settings and an in-memory side buffer.
    pub fn new(provider: Arc<P>, lifecycle: Arc<dyn AppLifecycleSource>) -> Self {
        Self {
            provider,
            lifecycle,
            alerts: Arc::new(TracingAlertSurface),
            settings: Arc::new(TracingSettingsNavigator),
            store: Arc::new(MemorySampleStore::new()),
        }
    }

    pub fn with_alerts(mut self, alerts: Arc<dyn AlertSurface>) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn with_settings(mut self, settings: Arc<dyn SettingsNavigator>) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn SampleStore>) -> Self {
        self.store = store;
        self
    }
}

/// Handle to a running tracking engine.
///
/// All methods take `&self`; share the handle with `Arc` if several parts of
/// the host need it. After [`shutdown`](Self::shutdown), every command returns
/// [`TrackingError::EngineClosed`].
pub struct TrackingEngine {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<TrackingEvent>,
    store: SampleStoreWriter,
    shutdown: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TrackingEngine {
    /// Spawn the engine task on the current tokio runtime.
    pub fn spawn<P: LocationProvider>(collaborators: Collaborators<P>, config: EngineConfig) -> Self {
        let (commands_tx, commands_rx) = mpsc::channel(config.command_capacity.max(1));
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (store, _writer) = SampleStoreWriter::spawn(collaborators.store);
        let shutdown = CancellationToken::new();

        let parts = ActorParts {
            provider: collaborators.provider,
            alert_surface: collaborators.alerts,
            settings: collaborators.settings,
            store: store.clone(),
            events: events.clone(),
            commands: commands_rx,
            lifecycle_rx: collaborators.lifecycle.subscribe(),
            initial_app_state: collaborators.lifecycle.current(),
            shutdown: shutdown.clone(),
        };
        let task = tokio::spawn(EngineActor::new(parts, config).run());

        Self {
            commands: commands_tx,
            events,
            store,
            shutdown,
            task: Mutex::new(Some(task)),
        }
    }

    /// Start a new session.
    ///
    /// Requests foreground then background permission. Fails with
    /// [`TrackingError::AlreadyActive`] if a session exists and with
    /// [`TrackingError::PermissionDenied`] if either permission is refused, in
    /// which case no session is created.
    pub async fn start(&self, session_id: impl Into<String>) -> Result<(), TrackingError> {
        let session_id = session_id.into();
        self.request(|reply| Command::Start { session_id, reply })
            .await?
    }

    /// Stop the session and return it finalized. `None` if there was none.
    pub async fn stop(&self) -> Result<Option<TrackingSession>, TrackingError> {
        self.request(|reply| Command::Stop { reply }).await
    }

    /// Pause an active session. Returns false if none is active.
    pub async fn pause(&self) -> Result<bool, TrackingError> {
        self.request(|reply| Command::Pause { reply }).await
    }

    /// Resume a paused session without re-checking the environment.
    ///
    /// Returns false when the session is not paused.
    pub async fn resume(&self) -> Result<bool, TrackingError> {
        self.request(|reply| Command::Resume { reply }).await
    }

    /// Re-check whatever caused the pause and resume if it has cleared.
    pub async fn attempt_recovery(&self) -> Result<bool, TrackingError> {
        self.request(|reply| Command::AttemptRecovery { reply })
            .await
    }

    /// Apply an alert action the user tapped.
    pub async fn perform_action(&self, action: AlertActionKind) -> Result<bool, TrackingError> {
        self.request(|reply| Command::PerformAction { action, reply })
            .await
    }

    pub async fn status(&self) -> Result<EngineStatus, TrackingError> {
        self.request(|reply| Command::Status { reply }).await
    }

    /// Subscribe to engine events.
    pub fn subscribe(&self) -> broadcast::Receiver<TrackingEvent> {
        self.events.subscribe()
    }

    /// Samples in the side buffer, oldest first.
    ///
    /// After a crash, these are the samples of the interrupted walk.
    pub async fn unsaved_samples(&self) -> Result<Vec<LocationSample>, StorageError> {
        self.store.read_all().await
    }

    /// Stop any session and terminate the engine task. Idempotent.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();

        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Tracking engine task failed");
            }
            if let Err(e) = self.store.flush().await {
                tracing::warn!(error = %e, "Sample buffer not flushed");
            }
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, TrackingError> {
        if self.shutdown.is_cancelled() {
            return Err(TrackingError::EngineClosed);
        }

        let (reply, rx) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| TrackingError::EngineClosed)?;
        rx.await.map_err(|_| TrackingError::EngineClosed)
    }
}

impl Drop for TrackingEngine {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
