//! Ordered background writer for a [`SampleStore`].
//!
//! The engine hands every storage operation to this writer and moves on. A
//! single task applies operations strictly in submission order, running each
//! one on the blocking pool. Failures are logged; they never reach the engine.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{SampleStore, StorageError};
use crate::tracking::LocationSample;

enum StoreOp {
    Append(LocationSample),
    Clear,
    ReadAll(oneshot::Sender<Result<Vec<LocationSample>, StorageError>>),
    Flush(oneshot::Sender<()>),
}

/// Handle to the writer task. Cheap to clone.
///
/// The task exits once every handle is dropped and the queue is drained.
#[derive(Clone)]
pub struct SampleStoreWriter {
    tx: mpsc::UnboundedSender<StoreOp>,
}

impl SampleStoreWriter {
    /// Spawn the writer task for `store`.
    pub fn spawn(store: Arc<dyn SampleStore>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_writer(store, rx));
        (Self { tx }, handle)
    }

    /// Queue an append.
    pub fn append(&self, sample: LocationSample) {
        if self.tx.send(StoreOp::Append(sample)).is_err() {
            warn!("Sample store writer closed, sample not buffered");
        }
    }

    /// Queue a clear.
    pub fn clear(&self) {
        if self.tx.send(StoreOp::Clear).is_err() {
            warn!("Sample store writer closed, buffer not cleared");
        }
    }

    /// Read the buffer after all previously queued operations have applied.
    pub async fn read_all(&self) -> Result<Vec<LocationSample>, StorageError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(StoreOp::ReadAll(reply))
            .map_err(|_| StorageError::Closed)?;
        rx.await.map_err(|_| StorageError::Closed)?
    }

    /// Wait until all previously queued operations have applied.
    pub async fn flush(&self) -> Result<(), StorageError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(StoreOp::Flush(reply))
            .map_err(|_| StorageError::Closed)?;
        rx.await.map_err(|_| StorageError::Closed)
    }
}

async fn run_writer(store: Arc<dyn SampleStore>, mut rx: mpsc::UnboundedReceiver<StoreOp>) {
    debug!("Sample store writer started");

    while let Some(op) = rx.recv().await {
        match op {
            StoreOp::Append(sample) => {
                let store = Arc::clone(&store);
                if let Err(e) = run_blocking(move || store.append(&sample)).await {
                    warn!(error = %e, "Failed to buffer sample");
                }
            }
            StoreOp::Clear => {
                let store = Arc::clone(&store);
                if let Err(e) = run_blocking(move || store.clear()).await {
                    warn!(error = %e, "Failed to clear sample buffer");
                }
            }
            StoreOp::ReadAll(reply) => {
                let store = Arc::clone(&store);
                let result = run_blocking(move || store.read_all()).await;
                let _ = reply.send(result);
            }
            StoreOp::Flush(reply) => {
                let _ = reply.send(());
            }
        }
    }

    debug!("Sample store writer stopped");
}

async fn run_blocking<T, F>(f: F) -> Result<T, StorageError>
where
    F: FnOnce() -> Result<T, StorageError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|_| StorageError::Closed)?
}
