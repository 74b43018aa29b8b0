use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from a [`SampleStore`](super::SampleStore).
///
/// Storage failures are never fatal to tracking; the engine logs them and
/// carries on.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to (de)serialize sample buffer: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The background writer has stopped.
    #[error("sample store writer is closed")]
    Closed,
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
