//! Periodic session logging daemon.
//!
//! Logs the engine status at DEBUG level at a fixed interval, useful when
//! analysing a recorded walk after the fact.
//!
//! # Usage
//!
//! ```ignore
//! use walktrack::tracking::spawn_session_logger;
//! use tokio_util::sync::CancellationToken;
//!
//! let cancellation = CancellationToken::new();
//! if tracing::enabled!(tracing::Level::DEBUG) {
//!     spawn_session_logger(engine.clone(), cancellation.clone(), DEFAULT_LOG_INTERVAL);
//! }
//! ```
//!
//! # Output Format
//!
//! - `state` - Engine state (idle, active, paused)
//! - `samples` - Accepted samples in the current session
//! - `distance_m` - Walked distance so far
//! - `lat`, `lon`, `accuracy_m` - Last accepted sample
//! - `recovering`, `attempts` - Watchdog recovery progress
//! - `warmup` - Warm-up phase

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::engine::{EngineStatus, TrackingEngine};

/// Default logging interval (20 seconds).
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(20);

/// Spawns a background task that periodically logs the engine status.
///
/// Stops when `cancellation` fires or the engine shuts down.
pub fn spawn_session_logger(
    engine: Arc<TrackingEngine>,
    cancellation: CancellationToken,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match engine.status().await {
                        Ok(status) => log_status(&status),
                        Err(_) => break,
                    }
                }
                _ = cancellation.cancelled() => break,
            }
        }
        tracing::debug!("Session logger stopped");
    })
}

fn log_status(status: &EngineStatus) {
    let Some(session) = status.session.as_ref() else {
        tracing::debug!(state = %status.state, app = %status.app_state, "Tracking status (no session)");
        return;
    };

    match session.last_sample() {
        Some(last) => tracing::debug!(
            state = %status.state,
            session_id = %session.id,
            samples = session.coordinate_count(),
            distance_m = format!("{:.0}", session.distance_m()),
            lat = format!("{:.6}", last.latitude),
            lon = format!("{:.6}", last.longitude),
            accuracy_m = format!("{:.1}", last.accuracy),
            recovering = status.recovery.is_recovering,
            attempts = status.recovery.attempts,
            warmup = ?status.warmup.phase,
            app = %status.app_state,
            "Tracking status"
        ),
        None => tracing::debug!(
            state = %status.state,
            session_id = %session.id,
            recovering = status.recovery.is_recovering,
            warmup = ?status.warmup.phase,
            "Tracking status (no samples yet)"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimulatedLifecycle, SimulatedProvider};
    use crate::tracking::engine::{Collaborators, EngineConfig};

    fn engine() -> Arc<TrackingEngine> {
        let provider = Arc::new(SimulatedProvider::new());
        let lifecycle = Arc::new(SimulatedLifecycle::new());
        Arc::new(TrackingEngine::spawn(
            Collaborators::new(provider, lifecycle),
            EngineConfig::default(),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_logger_stops_on_cancellation() {
        let engine = engine();
        let cancellation = CancellationToken::new();
        let handle = spawn_session_logger(engine.clone(), cancellation.clone(), DEFAULT_LOG_INTERVAL);

        tokio::time::sleep(DEFAULT_LOG_INTERVAL * 3).await;
        assert!(!handle.is_finished());

        cancellation.cancel();
        handle.await.unwrap();
        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_logger_stops_when_engine_closes() {
        let engine = engine();
        engine.start("walk-log").await.unwrap();
        let handle = spawn_session_logger(
            engine.clone(),
            CancellationToken::new(),
            Duration::from_secs(1),
        );

        tokio::time::sleep(Duration::from_secs(2)).await;
        engine.shutdown().await;

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("logger did not stop")
            .unwrap();
    }
}
