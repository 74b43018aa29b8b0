//! Simulated location provider.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::tracking::{
    LocationProvider, LocationSubscription, PermissionStatus, PositionOptions, ProviderError,
    RawLocation, SubscriptionId, WatchOptions,
};

/// Buffer size of each simulated subscription channel.
pub const SUBSCRIPTION_BUFFER: usize = 64;

struct Watcher {
    options: WatchOptions,
    tx: mpsc::Sender<RawLocation>,
}

struct SimState {
    foreground: PermissionStatus,
    background: PermissionStatus,
    service_enabled: bool,
    one_shot: VecDeque<Result<RawLocation, ProviderError>>,
    one_shot_delay: Duration,
    one_shot_calls: u32,
    watch_calls: u32,
    permission_queries: u32,
    watchers: BTreeMap<SubscriptionId, Watcher>,
}

/// In-process [`LocationProvider`] driven by the test or replay harness.
///
/// Starts with both permissions granted and services on. Fixes are pushed with
/// [`emit`](Self::emit); one-shot requests are answered from a queue.
pub struct SimulatedProvider {
    state: Mutex<SimState>,
    next_id: AtomicU64,
}

impl SimulatedProvider {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState {
                foreground: PermissionStatus::Granted,
                background: PermissionStatus::Granted,
                service_enabled: true,
                one_shot: VecDeque::new(),
                one_shot_delay: Duration::ZERO,
                one_shot_calls: 0,
                watch_calls: 0,
                permission_queries: 0,
                watchers: BTreeMap::new(),
            }),
            next_id: AtomicU64::new(1),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // =========================================================================
    // Scenario controls
    // =========================================================================

    pub fn set_foreground_permission(&self, status: PermissionStatus) {
        self.lock().foreground = status;
    }

    pub fn set_background_permission(&self, status: PermissionStatus) {
        self.lock().background = status;
    }

    pub fn set_service_enabled(&self, enabled: bool) {
        self.lock().service_enabled = enabled;
    }

    /// Queue the answer to the next one-shot request.
    pub fn push_one_shot(&self, result: Result<RawLocation, ProviderError>) {
        self.lock().one_shot.push_back(result);
    }

    /// Delay before each one-shot request answers.
    pub fn set_one_shot_delay(&self, delay: Duration) {
        self.lock().one_shot_delay = delay;
    }

    /// Deliver a fix to every open subscription. Returns how many received it.
    pub fn emit(&self, location: RawLocation) -> usize {
        self.emit_where(location, |_| true)
    }

    /// Deliver a fix to the subscriptions whose options match `filter`.
    pub fn emit_where(&self, location: RawLocation, filter: impl Fn(&WatchOptions) -> bool) -> usize {
        let mut state = self.lock();
        let mut delivered = 0;
        let mut closed = Vec::new();

        for (id, watcher) in state.watchers.iter() {
            if !filter(&watcher.options) {
                continue;
            }
            match watcher.tx.try_send(location.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(id = %id, "Simulated subscription full, fix dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*id),
            }
        }
        for id in closed {
            state.watchers.remove(&id);
        }
        delivered
    }

    /// Deliver a fix to one subscription.
    pub fn emit_to(&self, id: SubscriptionId, location: RawLocation) -> bool {
        let state = self.lock();
        state
            .watchers
            .get(&id)
            .is_some_and(|watcher| watcher.tx.try_send(location).is_ok())
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn active_subscription_count(&self) -> usize {
        self.lock().watchers.len()
    }

    /// Open subscriptions in the order they were opened.
    pub fn subscriptions(&self) -> Vec<(SubscriptionId, WatchOptions)> {
        self.lock()
            .watchers
            .iter()
            .map(|(id, watcher)| (*id, watcher.options))
            .collect()
    }

    pub fn one_shot_calls(&self) -> u32 {
        self.lock().one_shot_calls
    }

    pub fn watch_calls(&self) -> u32 {
        self.lock().watch_calls
    }

    /// Non-prompting permission queries made so far.
    pub fn permission_queries(&self) -> u32 {
        self.lock().permission_queries
    }
}

impl Default for SimulatedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationProvider for SimulatedProvider {
    async fn watch(&self, options: WatchOptions) -> Result<LocationSubscription, ProviderError> {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);

        let mut state = self.lock();
        state.watch_calls += 1;
        state.watchers.insert(id, Watcher { options, tx });
        Ok(LocationSubscription::new(id, rx))
    }

    fn unwatch(&self, id: SubscriptionId) {
        self.lock().watchers.remove(&id);
    }

    async fn get_once(&self, _options: PositionOptions) -> Result<RawLocation, ProviderError> {
        let delay = {
            let mut state = self.lock();
            state.one_shot_calls += 1;
            state.one_shot_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.lock()
            .one_shot
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Platform("no fix available".to_string())))
    }

    async fn foreground_permission(&self) -> Result<PermissionStatus, ProviderError> {
        let mut state = self.lock();
        state.permission_queries += 1;
        Ok(state.foreground)
    }

    async fn request_foreground_permission(&self) -> Result<PermissionStatus, ProviderError> {
        Ok(self.lock().foreground)
    }

    async fn background_permission(&self) -> Result<PermissionStatus, ProviderError> {
        let mut state = self.lock();
        state.permission_queries += 1;
        Ok(state.background)
    }

    async fn request_background_permission(&self) -> Result<PermissionStatus, ProviderError> {
        Ok(self.lock().background)
    }

    async fn is_service_enabled(&self) -> Result<bool, ProviderError> {
        Ok(self.lock().service_enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_watch_and_emit() {
        let provider = SimulatedProvider::new();
        let mut subscription = provider.watch(WatchOptions::default()).await.unwrap();

        assert_eq!(provider.emit(RawLocation::new(51.5, -0.12, 5.0)), 1);
        let fix = subscription.recv().await.unwrap();
        assert_eq!(fix.latitude, 51.5);
    }

    #[tokio::test]
    async fn test_unwatch_closes_stream() {
        let provider = SimulatedProvider::new();
        let mut subscription = provider.watch(WatchOptions::default()).await.unwrap();

        provider.unwatch(subscription.id);
        provider.unwatch(subscription.id);

        assert_eq!(provider.active_subscription_count(), 0);
        assert!(subscription.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_one_shot_queue() {
        let provider = SimulatedProvider::new();
        provider.push_one_shot(Ok(RawLocation::new(51.5, -0.12, 10.0)));

        assert!(provider.get_once(PositionOptions::default()).await.is_ok());
        assert!(provider.get_once(PositionOptions::default()).await.is_err());
        assert_eq!(provider.one_shot_calls(), 2);
    }

    #[tokio::test]
    async fn test_emit_where_filters_by_options() {
        let provider = SimulatedProvider::new();
        let _main = provider.watch(WatchOptions::default()).await.unwrap();
        let fast = WatchOptions {
            time_interval: Duration::from_millis(500),
            ..WatchOptions::default()
        };
        let _warmup = provider.watch(fast).await.unwrap();

        let delivered = provider.emit_where(RawLocation::new(51.5, -0.12, 5.0), |o| {
            o.time_interval == Duration::from_millis(500)
        });
        assert_eq!(delivered, 1);
    }
}
