//! Persistent side buffer for accepted samples.
//!
//! While a walk is running, every accepted sample is also written to a
//! [`SampleStore`]. If the app is killed mid-walk, the host can read the
//! buffer back on next launch and offer to recover the route. The buffer is
//! cleared when a session stops normally.
//!
//! # Components
//!
//! - [`SampleStore`] - storage trait (`append`, `read_all`, `clear`)
//! - [`MemorySampleStore`] - in-memory store for tests and ephemeral hosts
//! - [`FileSampleStore`] - JSON file store under the data directory
//! - [`SampleStoreWriter`] - ordered background writer so the engine never
//!   blocks on storage I/O
//!
//! Stores are capped; when full, the oldest entries are evicted.

mod error;
mod file;
mod memory;
mod writer;

pub use error::StorageError;
pub use file::FileSampleStore;
pub use memory::MemorySampleStore;
pub use writer::SampleStoreWriter;

use crate::tracking::LocationSample;

/// Default maximum number of buffered samples.
pub const DEFAULT_MAX_BUFFERED_SAMPLES: usize = 1000;

/// Capped, ordered sample buffer.
///
/// Implementations do blocking I/O; call them from
/// [`SampleStoreWriter`] or `spawn_blocking`, not directly from async code.
pub trait SampleStore: Send + Sync {
    /// Append a sample, evicting the oldest if the store is full.
    fn append(&self, sample: &LocationSample) -> Result<(), StorageError>;

    /// All buffered samples, oldest first.
    fn read_all(&self) -> Result<Vec<LocationSample>, StorageError>;

    /// Remove every buffered sample.
    fn clear(&self) -> Result<(), StorageError>;
}
