//! Simulated lifecycle, alert and settings collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tokio::sync::broadcast;

use crate::tracking::{
    Alert, AlertKind, AlertSurface, AppLifecycleSource, AppState, SettingsNavigator,
};

/// Lifecycle source the harness drives with [`set`](Self::set).
pub struct SimulatedLifecycle {
    tx: broadcast::Sender<AppState>,
    current: Mutex<AppState>,
}

impl SimulatedLifecycle {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self {
            tx,
            current: Mutex::new(AppState::Active),
        }
    }

    /// Change the app state and notify subscribers.
    pub fn set(&self, state: AppState) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = state;
        let _ = self.tx.send(state);
    }
}

impl Default for SimulatedLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl AppLifecycleSource for SimulatedLifecycle {
    fn subscribe(&self) -> broadcast::Receiver<AppState> {
        self.tx.subscribe()
    }

    fn current(&self) -> AppState {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Alert surface that records every alert.
#[derive(Default)]
pub struct RecordingAlertSurface {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingAlertSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn kinds(&self) -> Vec<AlertKind> {
        self.alerts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|a| a.kind)
            .collect()
    }

    pub fn count_of(&self, kind: AlertKind) -> usize {
        self.kinds().into_iter().filter(|k| *k == kind).count()
    }
}

impl AlertSurface for RecordingAlertSurface {
    fn present(&self, alert: Alert) {
        self.alerts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(alert);
    }
}

/// Settings navigator that counts requests.
#[derive(Default)]
pub struct RecordingSettingsNavigator {
    opened: AtomicUsize,
}

impl RecordingSettingsNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl SettingsNavigator for RecordingSettingsNavigator {
    fn open_settings(&self) {
        self.opened.fetch_add(1, Ordering::SeqCst);
    }
}
