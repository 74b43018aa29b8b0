//! The engine actor.
//!
//! One task owns every piece of mutable tracking state. It multiplexes caller
//! commands, provider subscriptions, lifecycle signals, results from spawned
//! tasks and its own deadline timers with a single `tokio::select!`, so no two
//! handlers ever run concurrently.
//!
//! The sub-controllers (filter, warm-up, monitor, watchdog, lifecycle bridge)
//! only return decisions; this module applies them to the session, the
//! subscriptions and the outside world.

use std::future::pending;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::command::{Command, Internal};
use super::config::EngineConfig;
use super::status::{EngineStatus, TrackingState};
use crate::storage::SampleStoreWriter;
use crate::time::WallClock;
use crate::tracking::alerts::{Alert, AlertActionKind, AlertCatalog};
use crate::tracking::error::{TrackingError, TrackingIssue};
use crate::tracking::events::TrackingEvent;
use crate::tracking::filter::{AccuracyFilter, FilterOutcome, RecentWindow};
use crate::tracking::lifecycle::{AppState, LifecycleBridge, LifecycleChange};
use crate::tracking::permission::{
    query_permission_state, PermissionMonitor, PermissionScope, PermissionState, PermissionVerdict,
};
use crate::tracking::provider::{
    AlertSurface, LocationAccuracy, LocationProvider, LocationSubscription, PositionOptions,
    SettingsNavigator,
};
use crate::tracking::sample::{LocationSample, RawLocation};
use crate::tracking::session::{PauseReason, TrackingSession, TransitionKind};
use crate::tracking::warmup::{WarmupController, WarmupReport};
use crate::tracking::watchdog::{probe_position, RecoveryStep, SignalWatchdog};

/// Result of re-checking the environment before leaving a pause.
enum Revalidation {
    Clear,
    Blocked(PauseReason),
    Unknown,
}

pub(crate) struct EngineActor<P: LocationProvider> {
    config: EngineConfig,
    provider: Arc<P>,
    alert_surface: Arc<dyn AlertSurface>,
    settings: Arc<dyn SettingsNavigator>,
    catalog: AlertCatalog,
    store: SampleStoreWriter,
    events: broadcast::Sender<TrackingEvent>,
    clock: WallClock,

    commands: mpsc::Receiver<Command>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,
    lifecycle_rx: Option<broadcast::Receiver<AppState>>,
    shutdown: CancellationToken,

    state: TrackingState,
    session: Option<Arc<TrackingSession>>,
    window: RecentWindow,
    filter: AccuracyFilter,
    warmup: WarmupController,
    monitor: PermissionMonitor,
    watchdog: SignalWatchdog,
    lifecycle: LifecycleBridge,
    main_sub: Option<LocationSubscription>,
    warmup_sub: Option<LocationSubscription>,

    /// Incremented whenever activity is torn down, invalidating in-flight tasks.
    epoch: u64,

    /// Cancels tasks spawned during the current activity period.
    activity_token: Option<CancellationToken>,

    /// The main subscription was reopened after the provider closed it and
    /// has not delivered an accepted fix since.
    main_reopened: bool,
}

pub(crate) struct ActorParts<P: LocationProvider> {
    pub provider: Arc<P>,
    pub alert_surface: Arc<dyn AlertSurface>,
    pub settings: Arc<dyn SettingsNavigator>,
    pub store: SampleStoreWriter,
    pub events: broadcast::Sender<TrackingEvent>,
    pub commands: mpsc::Receiver<Command>,
    pub lifecycle_rx: broadcast::Receiver<AppState>,
    pub initial_app_state: AppState,
    pub shutdown: CancellationToken,
}

impl<P: LocationProvider> EngineActor<P> {
    pub(crate) fn new(parts: ActorParts<P>, config: EngineConfig) -> Self {
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();

        Self {
            catalog: AlertCatalog::new(config.platform),
            filter: AccuracyFilter::with_config(config.filter.clone()),
            warmup: WarmupController::with_config(config.warmup.clone()),
            monitor: PermissionMonitor::with_config(config.permissions.clone()),
            watchdog: SignalWatchdog::with_config(config.watchdog.clone()),
            lifecycle: LifecycleBridge::new(parts.initial_app_state),
            config,
            provider: parts.provider,
            alert_surface: parts.alert_surface,
            settings: parts.settings,
            store: parts.store,
            events: parts.events,
            clock: WallClock::new(),
            commands: parts.commands,
            internal_tx,
            internal_rx,
            lifecycle_rx: Some(parts.lifecycle_rx),
            shutdown: parts.shutdown,
            state: TrackingState::Idle,
            session: None,
            window: RecentWindow::new(),
            main_sub: None,
            warmup_sub: None,
            epoch: 0,
            activity_token: None,
            main_reopened: false,
        }
    }

    /// Run until shutdown or until every engine handle is dropped.
    pub(crate) async fn run(mut self) {
        info!(platform = %self.config.platform, "Tracking engine started");

        loop {
            let signal_deadline = self.watchdog.deadline();
            let recovery_due = self.watchdog.next_attempt();
            let warmup_deadline = self.warmup.deadline();
            let permission_due = self.monitor.next_check();

            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => {
                    self.stop_session();
                    break;
                }

                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        debug!("All engine handles dropped");
                        self.stop_session();
                        break;
                    }
                },

                Some(message) = self.internal_rx.recv() => {
                    self.handle_internal(message).await;
                }

                next = recv_location(&mut self.main_sub) => {
                    self.on_main_location(next).await;
                }

                next = recv_location(&mut self.warmup_sub) => {
                    self.on_warmup_location(next);
                }

                signal = recv_lifecycle(&mut self.lifecycle_rx) => {
                    self.on_lifecycle(signal).await;
                }

                _ = sleep_until_opt(signal_deadline) => {
                    self.on_signal_timeout();
                }

                _ = sleep_until_opt(recovery_due) => {
                    self.on_recovery_attempt_due();
                }

                _ = sleep_until_opt(warmup_deadline) => {
                    self.on_warmup_deadline();
                }

                _ = sleep_until_opt(permission_due) => {
                    self.on_permission_check_due();
                }
            }
        }

        info!("Tracking engine stopped");
    }

    // =========================================================================
    // Commands
    // =========================================================================

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Start { session_id, reply } => {
                let result = self.start_session(session_id).await;
                let _ = reply.send(result);
            }
            Command::Stop { reply } => {
                let _ = reply.send(self.stop_session());
            }
            Command::Pause { reply } => {
                let _ = reply.send(self.pause_for(PauseReason::UserRequested));
            }
            Command::Resume { reply } => {
                let _ = reply.send(self.resume().await);
            }
            Command::AttemptRecovery { reply } => {
                let _ = reply.send(self.attempt_recovery().await);
            }
            Command::PerformAction { action, reply } => {
                let _ = reply.send(self.perform_action(action).await);
            }
            Command::Status { reply } => {
                let _ = reply.send(self.status());
            }
        }
    }

    async fn start_session(&mut self, session_id: String) -> Result<(), TrackingError> {
        if self.state != TrackingState::Idle {
            warn!(session_id = %session_id, state = %self.state, "Start rejected, session already active");
            return Err(TrackingError::AlreadyActive);
        }

        self.state = TrackingState::RequestingPermission;
        info!(session_id = %session_id, "Starting tracking session");

        let permissions = match self.request_permissions().await {
            Ok(permissions) => permissions,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Tracking start aborted");
                self.state = TrackingState::Idle;
                return Err(e);
            }
        };

        let subscription = match self.provider.watch(self.config.tracking).await {
            Ok(subscription) => subscription,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Failed to open location subscription");
                self.state = TrackingState::Idle;
                return Err(e.into());
            }
        };

        self.session = Some(Arc::new(TrackingSession::new(
            session_id,
            self.clock.now(),
        )));
        self.window = RecentWindow::new();
        self.monitor.record(permissions);
        self.state = TrackingState::Active;

        let now = Instant::now();
        self.begin_activity(subscription, now).await;
        Ok(())
    }

    async fn request_permissions(&self) -> Result<PermissionState, TrackingError> {
        let foreground = self.provider.request_foreground_permission().await?;
        if !foreground.is_granted() {
            return Err(TrackingError::PermissionDenied {
                scope: PermissionScope::Foreground,
            });
        }

        let background = self.provider.request_background_permission().await?;
        if !background.is_granted() {
            return Err(TrackingError::PermissionDenied {
                scope: PermissionScope::Background,
            });
        }

        Ok(PermissionState::granted())
    }

    /// Tear everything down and hand back the finalized session.
    fn stop_session(&mut self) -> Option<TrackingSession> {
        let Some(mut shared) = self.session.take() else {
            debug!("Stop requested with no session");
            return None;
        };

        self.end_activity();
        self.lifecycle.reset_background();
        self.window = RecentWindow::new();
        self.state = TrackingState::Idle;

        Arc::make_mut(&mut shared).finalize(self.clock.now());
        self.store.clear();

        info!(
            session_id = %shared.id,
            samples = shared.coordinate_count(),
            duration_secs = shared.duration_secs.unwrap_or_default(),
            distance_m = format!("{:.0}", shared.distance_m()),
            "Tracking session stopped"
        );

        let _ = self
            .events
            .send(TrackingEvent::JourneyComplete(Arc::clone(&shared)));

        Some(Arc::try_unwrap(shared).unwrap_or_else(|shared| (*shared).clone()))
    }

    /// Suspend an active session. Returns false if not active.
    fn pause_for(&mut self, reason: PauseReason) -> bool {
        if self.state != TrackingState::Active {
            return false;
        }

        self.end_activity();
        let at = self.clock.now();
        if let Some(session) = self.session_mut() {
            session.mark_paused(reason, at);
        }
        self.state = TrackingState::Paused;

        if reason.is_external() {
            warn!(reason = %reason, "Tracking paused");
        } else {
            info!(reason = %reason, "Tracking paused");
        }

        if let Some(alert) = self.catalog.for_pause(reason) {
            self.present(alert);
        }
        self.emit_session_update();
        true
    }

    async fn resume(&mut self) -> bool {
        if self.state != TrackingState::Paused || self.pause_reason().is_none() {
            return false;
        }
        self.reactivate().await
    }

    async fn attempt_recovery(&mut self) -> bool {
        let Some(reason) = self.paused_reason() else {
            return false;
        };

        let revalidation = match reason {
            PauseReason::PermissionRevoked => self.revalidate(false, true).await,
            PauseReason::LocationServicesDisabled | PauseReason::GpsRecoveryFailed => {
                self.revalidate(true, false).await
            }
            PauseReason::UserRequested => Revalidation::Clear,
        };

        match revalidation {
            Revalidation::Clear => self.recover_from(reason).await,
            Revalidation::Blocked(blocker) => {
                info!(reason = %reason, blocker = %blocker, "Recovery attempt blocked");
                false
            }
            Revalidation::Unknown => false,
        }
    }

    async fn perform_action(&mut self, action: AlertActionKind) -> bool {
        match action {
            AlertActionKind::Dismiss => true,
            AlertActionKind::OpenSettings => {
                self.settings.open_settings();
                true
            }
            AlertActionKind::RetryPermissionRecovery => self.attempt_recovery().await,
            AlertActionKind::RetryGpsRecovery => self.retry_gps_recovery().await,
        }
    }

    /// Retry action from the recovery-failed alert. Checks services and
    /// permission; a different blocker becomes the new pause reason.
    async fn retry_gps_recovery(&mut self) -> bool {
        let Some(reason) = self.paused_reason() else {
            return false;
        };

        match self.revalidate(true, true).await {
            Revalidation::Clear => self.recover_from(reason).await,
            Revalidation::Blocked(blocker) => {
                if blocker != reason {
                    let pause_time = self
                        .session
                        .as_ref()
                        .and_then(|s| s.pause_time)
                        .unwrap_or_else(|| self.clock.now());
                    if let Some(session) = self.session_mut() {
                        session.mark_paused(blocker, pause_time);
                    }
                    warn!(from = %reason, to = %blocker, "Pause reason changed on retry");
                    if let Some(alert) = self.catalog.for_pause(blocker) {
                        self.present(alert);
                    }
                    self.emit_session_update();
                }
                false
            }
            Revalidation::Unknown => false,
        }
    }

    async fn recover_from(&mut self, reason: PauseReason) -> bool {
        let resumed = self.reactivate().await;
        if resumed && reason.is_external() {
            self.present(self.catalog.tracking_resumed());
        }
        resumed
    }

    async fn revalidate(&mut self, check_services: bool, check_permission: bool) -> Revalidation {
        if check_services {
            match self.provider.is_service_enabled().await {
                Ok(true) => {}
                Ok(false) => return Revalidation::Blocked(PauseReason::LocationServicesDisabled),
                Err(e) => {
                    warn!(error = %e, "Could not query location services");
                    return Revalidation::Unknown;
                }
            }
        }

        if check_permission {
            match query_permission_state(self.provider.as_ref()).await {
                Ok(state) => {
                    self.monitor.record(state);
                    if !state.fully_granted() {
                        return Revalidation::Blocked(PauseReason::PermissionRevoked);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Could not query location permission");
                    return Revalidation::Unknown;
                }
            }
        }

        Revalidation::Clear
    }

    /// Leave a pause: reopen the subscription and restart the controllers.
    async fn reactivate(&mut self) -> bool {
        let subscription = match self.provider.watch(self.config.tracking).await {
            Ok(subscription) => subscription,
            Err(e) => {
                warn!(error = %e, "Failed to reopen location subscription");
                return false;
            }
        };

        let at = self.clock.now();
        let event = self.session_mut().map(|session| session.mark_resumed(at));
        self.state = TrackingState::Active;

        if let Some(event) = event {
            info!(
                kind = ?event.kind,
                pause_secs = event.pause_duration_secs,
                "Tracking resumed"
            );
        }

        self.begin_activity(subscription, Instant::now()).await;
        self.emit_session_update();
        true
    }

    fn status(&self) -> EngineStatus {
        let open_subscriptions =
            usize::from(self.main_sub.is_some()) + usize::from(self.warmup_sub.is_some());
        let pending_timers = [
            self.watchdog.deadline(),
            self.watchdog.next_attempt(),
            self.warmup.deadline(),
            self.monitor.next_check(),
        ]
        .iter()
        .filter(|t| t.is_some())
        .count();

        EngineStatus {
            state: self.state,
            session: self.session.clone(),
            warmup: self.warmup.status(),
            recovery: self.watchdog.state(),
            permissions: self.monitor.last_state(),
            app_state: self.lifecycle.current(),
            open_subscriptions,
            pending_timers,
        }
    }

    // =========================================================================
    // Activity
    // =========================================================================

    /// Start everything that runs while `Active`.
    async fn begin_activity(&mut self, subscription: LocationSubscription, now: Instant) {
        self.activity_token = Some(self.shutdown.child_token());
        self.main_sub = Some(subscription);
        self.start_warmup(now).await;
        self.monitor.start(now);
        self.watchdog.arm(now);
    }

    /// Stop everything that runs while `Active`. Idempotent.
    fn end_activity(&mut self) {
        if let Some(subscription) = self.main_sub.take() {
            self.provider.unwatch(subscription.id);
        }
        self.main_reopened = false;
        self.close_warmup_subscription();
        self.warmup.cancel();
        self.monitor.stop();
        self.watchdog.disarm();

        self.epoch += 1;
        if let Some(token) = self.activity_token.take() {
            token.cancel();
        }
    }

    async fn start_warmup(&mut self, now: Instant) {
        self.close_warmup_subscription();
        let restarted = self.warmup.start(now);

        match self.provider.watch(self.warmup.watch_options()).await {
            Ok(subscription) => {
                debug!(id = %subscription.id, restarted, "Warm-up started");
                self.warmup_sub = Some(subscription);
            }
            Err(e) => {
                // The deadline timer still completes the warm-up.
                warn!(error = %e, "Failed to open warm-up subscription");
            }
        }
    }

    fn close_warmup_subscription(&mut self) {
        if let Some(subscription) = self.warmup_sub.take() {
            self.provider.unwatch(subscription.id);
        }
    }

    fn finish_warmup(&mut self, report: WarmupReport) {
        self.close_warmup_subscription();
        info!(
            outcome = ?report.outcome,
            attempts = report.attempts,
            good_points = report.good_points,
            elapsed_secs = format!("{:.1}", report.elapsed_secs),
            "Warm-up complete"
        );
        let _ = self.events.send(TrackingEvent::WarmupCompleted(report));
    }

    // =========================================================================
    // Location streams
    // =========================================================================

    async fn on_main_location(&mut self, next: Option<RawLocation>) {
        let Some(raw) = next else {
            warn!("Main location subscription closed by provider");
            if let Some(subscription) = self.main_sub.take() {
                self.provider.unwatch(subscription.id);
            }
            if self.state == TrackingState::Active {
                self.ensure_main_subscription().await;
            }
            return;
        };

        if self.state != TrackingState::Active {
            return;
        }

        match self.filter.process(&raw, &self.window) {
            FilterOutcome::Rejected(reason) => {
                debug!(
                    %reason,
                    lat = raw.latitude,
                    lon = raw.longitude,
                    accuracy_m = raw.accuracy,
                    "Location sample rejected"
                );
            }
            FilterOutcome::Accepted { sample, window } => {
                self.window = window;
                self.accept_sample(sample).await;
            }
        }
    }

    async fn accept_sample(&mut self, mut sample: LocationSample) {
        let now = Instant::now();
        self.main_reopened = false;

        if self.lifecycle.is_background() {
            sample.background_update = true;
            sample.background_duration_secs = self
                .lifecycle
                .background_elapsed(now)
                .map(|elapsed| elapsed.as_secs_f64());
        }

        let restored = self.watchdog.reset(now);
        if restored {
            info!("GPS signal restored by fresh sample");
            self.clear_signal_issue();
            self.start_warmup(now).await;
            self.present(self.catalog.signal_restored());
        }

        let Some(shared) = self.session.as_mut() else {
            return;
        };
        Arc::make_mut(shared).record_sample(sample.clone());
        let session = Arc::clone(shared);

        self.store.append(sample.clone());
        let _ = self
            .events
            .send(TrackingEvent::LocationUpdate { sample, session });

        if restored {
            self.emit_session_update();
        }
    }

    /// Make sure an `Active` session has its main subscription, reopening it
    /// if the provider closed it.
    ///
    /// A stream that closes again before delivering a fix, or that cannot be
    /// reopened, pauses the session as a failed recovery. Returns whether the
    /// session is still active with a main subscription.
    async fn ensure_main_subscription(&mut self) -> bool {
        if self.main_sub.is_some() {
            return true;
        }

        if self.main_reopened {
            warn!("Main location subscription closed again before any fix");
            self.pause_for(PauseReason::GpsRecoveryFailed);
            return false;
        }

        match self.provider.watch(self.config.tracking).await {
            Ok(subscription) => {
                info!(id = %subscription.id, "Main location subscription reopened");
                self.main_sub = Some(subscription);
                self.main_reopened = true;
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to reopen location subscription");
                self.pause_for(PauseReason::GpsRecoveryFailed);
                false
            }
        }
    }

    fn on_warmup_location(&mut self, next: Option<RawLocation>) {
        let Some(raw) = next else {
            debug!("Warm-up subscription closed by provider");
            self.warmup_sub = None;
            return;
        };

        let accuracy = if raw.has_valid_coordinates() {
            raw.accuracy
        } else {
            f64::INFINITY
        };
        if let Some(report) = self.warmup.on_sample(accuracy, Instant::now()) {
            self.finish_warmup(report);
        }
    }

    fn on_warmup_deadline(&mut self) {
        if let Some(report) = self.warmup.on_deadline(Instant::now()) {
            self.finish_warmup(report);
        }
    }

    // =========================================================================
    // App lifecycle
    // =========================================================================

    async fn on_lifecycle(&mut self, signal: Result<AppState, broadcast::error::RecvError>) {
        let next = match signal {
            Ok(next) => next,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Missed app lifecycle signals");
                return;
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("App lifecycle source closed");
                self.lifecycle_rx = None;
                return;
            }
        };

        let now = Instant::now();
        let session_open = self.session.is_some();
        let Some(change) = self.lifecycle.on_transition(next, now, session_open) else {
            return;
        };

        let at = self.clock.at(now);
        match change {
            LifecycleChange::EnteredBackground => {
                info!("App entered background");
                if let Some(session) = self.session_mut() {
                    session.record_transition(TransitionKind::BackgroundTransition, at, None);
                }
            }
            LifecycleChange::ReturnedToForeground {
                background_duration,
            } => {
                let duration_secs = background_duration.map(|d| d.as_secs_f64());
                info!(background_secs = ?duration_secs, "App returned to foreground");
                if let Some(session) = self.session_mut() {
                    session.record_transition(
                        TransitionKind::ForegroundTransition,
                        at,
                        duration_secs,
                    );
                }
                if self.state == TrackingState::Active {
                    self.start_warmup(now).await;
                }
            }
        }
    }

    // =========================================================================
    // Watchdog and recovery
    // =========================================================================

    fn on_signal_timeout(&mut self) {
        if self.state != TrackingState::Active || !self.watchdog.on_timeout(Instant::now()) {
            return;
        }

        warn!(
            timeout_secs = self.watchdog.config().signal_timeout.as_secs(),
            "GPS signal lost, starting recovery"
        );
        if let Some(session) = self.session_mut() {
            session.set_error(Some(TrackingIssue::GpsSignalLost));
        }
        self.present(self.catalog.signal_lost());
        self.emit_session_update();
    }

    fn on_recovery_attempt_due(&mut self) {
        let Some(token) = self.activity_token.clone() else {
            return;
        };
        let Some(attempt) = self.watchdog.begin_attempt() else {
            return;
        };

        let config = self.watchdog.config();
        info!(
            attempt,
            max_attempts = config.max_recovery_attempts,
            "GPS recovery attempt"
        );

        let timeout = config.probe_timeout;
        let options = PositionOptions {
            accuracy: LocationAccuracy::High,
            timeout,
        };
        let provider = Arc::clone(&self.provider);
        let tx = self.internal_tx.clone();
        let epoch = self.epoch;

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                outcome = probe_position(provider.as_ref(), options, timeout) => {
                    let _ = tx.send(Internal::ProbeFinished { epoch, outcome });
                }
            }
        });
    }

    fn on_permission_check_due(&mut self) {
        let Some(token) = self.activity_token.clone() else {
            return;
        };
        if self.state != TrackingState::Active || !self.monitor.begin_check() {
            return;
        }

        debug!("Checking location permission");
        let provider = Arc::clone(&self.provider);
        let tx = self.internal_tx.clone();
        let epoch = self.epoch;

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                result = query_permission_state(provider.as_ref()) => {
                    let _ = tx.send(Internal::PermissionChecked { epoch, result });
                }
            }
        });
    }

    async fn handle_internal(&mut self, message: Internal) {
        match message {
            Internal::ProbeFinished { epoch, outcome } => {
                if epoch != self.epoch || self.state != TrackingState::Active {
                    debug!(epoch, current = self.epoch, "Ignoring stale probe result");
                    return;
                }

                let now = Instant::now();
                match self.watchdog.on_probe_result(&outcome, now) {
                    RecoveryStep::Restored => {
                        if !self.ensure_main_subscription().await {
                            return;
                        }
                        info!("GPS signal restored by recovery probe");
                        self.clear_signal_issue();
                        self.start_warmup(now).await;
                        self.present(self.catalog.signal_restored());
                        self.emit_session_update();
                    }
                    RecoveryStep::RetryAt(_) => {
                        debug!(outcome = ?outcome, "Recovery probe failed, will retry");
                    }
                    RecoveryStep::Exhausted => {
                        warn!("GPS recovery attempts exhausted");
                        self.pause_for(PauseReason::GpsRecoveryFailed);
                    }
                    RecoveryStep::ServicesDisabled => {
                        warn!("Location services disabled during recovery");
                        self.pause_for(PauseReason::LocationServicesDisabled);
                    }
                    RecoveryStep::Stale => {
                        debug!("Ignoring probe result outside recovery");
                    }
                }
            }
            Internal::PermissionChecked { epoch, result } => {
                if epoch != self.epoch {
                    debug!(epoch, current = self.epoch, "Ignoring stale permission result");
                    return;
                }

                match self.monitor.on_result(result, Instant::now()) {
                    PermissionVerdict::Granted => debug!("Location permission still granted"),
                    PermissionVerdict::Revoked(state) => {
                        warn!(
                            foreground = state.foreground,
                            background = state.background,
                            "Location permission revoked"
                        );
                        self.pause_for(PauseReason::PermissionRevoked);
                    }
                    PermissionVerdict::Unknown | PermissionVerdict::Stale => {}
                }
            }
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn session_mut(&mut self) -> Option<&mut TrackingSession> {
        self.session.as_mut().map(Arc::make_mut)
    }

    fn pause_reason(&self) -> Option<PauseReason> {
        self.session.as_ref().and_then(|s| s.pause_reason)
    }

    /// The pause reason, if paused.
    fn paused_reason(&self) -> Option<PauseReason> {
        if self.state == TrackingState::Paused {
            self.pause_reason()
        } else {
            None
        }
    }

    fn clear_signal_issue(&mut self) {
        let lost = self
            .session
            .as_ref()
            .is_some_and(|s| s.error == Some(TrackingIssue::GpsSignalLost));
        if lost {
            if let Some(session) = self.session_mut() {
                session.set_error(None);
            }
        }
    }

    fn present(&self, alert: Alert) {
        info!(kind = ?alert.kind, title = %alert.title, "Presenting alert");
        self.alert_surface.present(alert);
    }

    fn emit_session_update(&self) {
        if let Some(session) = &self.session {
            let _ = self.events.send(TrackingEvent::SessionUpdate {
                session: Arc::clone(session),
                error: session.error,
            });
        }
    }
}

/// Next fix from an optional subscription; pends forever when there is none.
async fn recv_location(subscription: &mut Option<LocationSubscription>) -> Option<RawLocation> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => pending().await,
    }
}

async fn recv_lifecycle(
    rx: &mut Option<broadcast::Receiver<AppState>>,
) -> Result<AppState, broadcast::error::RecvError> {
    match rx {
        Some(rx) => rx.recv().await,
        None => pending().await,
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => pending().await,
    }
}
