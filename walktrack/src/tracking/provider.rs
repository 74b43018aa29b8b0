//! Platform collaborator traits.
//!
//! The engine never talks to a GPS chip, an OS permission dialog or a UI
//! directly. It talks to these traits, which the host application implements
//! on top of its platform APIs (or which [`crate::sim`] implements in-process).
//!
//! - [`LocationProvider`] - push-based fixes, one-shot fixes, permissions, service state
//! - [`AppLifecycleSource`] - foreground/background signal
//! - [`AlertSurface`] - fire-and-forget user alerts
//! - [`SettingsNavigator`] - deep link into the app's OS settings page
//!
//! `LocationProvider` uses `impl Future` returns, so the engine is generic over
//! it. The remaining collaborators are synchronous and used as trait objects.

use std::future::Future;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use super::alerts::Alert;
use super::error::ProviderError;
use super::lifecycle::AppState;
use super::permission::PermissionStatus;
use super::sample::RawLocation;

/// Requested accuracy class for a subscription or one-shot request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationAccuracy {
    /// Best the hardware can do, for navigation-grade tracking.
    BestForNavigation,
    High,
    Balanced,
}

/// Options for a continuous subscription.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchOptions {
    pub accuracy: LocationAccuracy,

    /// Minimum time between delivered fixes.
    pub time_interval: Duration,

    /// Minimum movement between delivered fixes (meters).
    pub distance_interval_m: f64,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            accuracy: LocationAccuracy::BestForNavigation,
            time_interval: Duration::from_millis(1000),
            distance_interval_m: 5.0,
        }
    }
}

/// Options for a one-shot position request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionOptions {
    pub accuracy: LocationAccuracy,
    pub timeout: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            accuracy: LocationAccuracy::High,
            timeout: Duration::from_secs(15),
        }
    }
}

/// Identifier of an open subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// An open stream of fixes.
///
/// The provider keeps the sending half until [`LocationProvider::unwatch`] is
/// called with this subscription's id. A closed channel means the provider
/// dropped the subscription on its own.
#[derive(Debug)]
pub struct LocationSubscription {
    pub id: SubscriptionId,
    receiver: mpsc::Receiver<RawLocation>,
}

impl LocationSubscription {
    pub fn new(id: SubscriptionId, receiver: mpsc::Receiver<RawLocation>) -> Self {
        Self { id, receiver }
    }

    /// Wait for the next fix. `None` once the provider closes the stream.
    pub async fn recv(&mut self) -> Option<RawLocation> {
        self.receiver.recv().await
    }
}

/// Platform location API.
///
/// # Contract
///
/// - `unwatch` is idempotent; unknown ids are ignored.
/// - `get_once` may take arbitrarily long; the engine bounds it with its own timeout.
/// - Permission queries never prompt; the `request_*` methods may.
pub trait LocationProvider: Send + Sync + 'static {
    /// Open a continuous subscription.
    fn watch(
        &self,
        options: WatchOptions,
    ) -> impl Future<Output = Result<LocationSubscription, ProviderError>> + Send;

    /// Close a subscription.
    fn unwatch(&self, id: SubscriptionId);

    /// Request a single fix.
    fn get_once(
        &self,
        options: PositionOptions,
    ) -> impl Future<Output = Result<RawLocation, ProviderError>> + Send;

    fn foreground_permission(
        &self,
    ) -> impl Future<Output = Result<PermissionStatus, ProviderError>> + Send;

    fn request_foreground_permission(
        &self,
    ) -> impl Future<Output = Result<PermissionStatus, ProviderError>> + Send;

    fn background_permission(
        &self,
    ) -> impl Future<Output = Result<PermissionStatus, ProviderError>> + Send;

    fn request_background_permission(
        &self,
    ) -> impl Future<Output = Result<PermissionStatus, ProviderError>> + Send;

    /// Whether device-wide location services are switched on.
    fn is_service_enabled(&self) -> impl Future<Output = Result<bool, ProviderError>> + Send;
}

/// Source of app foreground/background transitions.
pub trait AppLifecycleSource: Send + Sync {
    /// Subscribe to state changes. The engine subscribes once for its lifetime.
    fn subscribe(&self) -> broadcast::Receiver<AppState>;

    /// State at the time of the call.
    fn current(&self) -> AppState;
}

/// Presents alerts to the user. Must not block.
pub trait AlertSurface: Send + Sync {
    fn present(&self, alert: Alert);
}

/// Opens the platform's settings page for this app.
pub trait SettingsNavigator: Send + Sync {
    fn open_settings(&self);
}

// =============================================================================
// Tracing adapters
// =============================================================================

/// Alert surface that writes alerts to the log.
///
/// Useful for headless hosts where no UI is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAlertSurface;

impl AlertSurface for TracingAlertSurface {
    fn present(&self, alert: Alert) {
        let actions: Vec<&str> = alert.actions.iter().map(|a| a.label.as_str()).collect();
        tracing::warn!(
            kind = ?alert.kind,
            title = %alert.title,
            actions = ?actions,
            "{}",
            alert.message
        );
    }
}

/// Settings navigator that only logs the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSettingsNavigator;

impl SettingsNavigator for TracingSettingsNavigator {
    fn open_settings(&self) {
        tracing::info!("Settings navigation requested");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_watch_options() {
        let options = WatchOptions::default();
        assert_eq!(options.accuracy, LocationAccuracy::BestForNavigation);
        assert_eq!(options.time_interval, Duration::from_millis(1000));
        assert_eq!(options.distance_interval_m, 5.0);
    }

    #[test]
    fn test_tracing_adapters_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TracingAlertSurface>();
        assert_send_sync::<TracingSettingsNavigator>();
    }

    #[tokio::test]
    async fn test_subscription_closes_with_sender() {
        let (tx, rx) = mpsc::channel(4);
        let mut subscription = LocationSubscription::new(SubscriptionId(7), rx);

        tx.send(RawLocation::new(51.5, -0.12, 5.0)).await.unwrap();
        drop(tx);

        assert!(subscription.recv().await.is_some());
        assert!(subscription.recv().await.is_none());
        assert_eq!(subscription.id.to_string(), "sub-7");
    }
}
