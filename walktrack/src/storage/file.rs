//! JSON file sample store.
//!
//! The buffer is kept as a single JSON array. Writes go to a temporary file
//! that is renamed over the original, so a crash mid-write leaves the previous
//! buffer intact.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::warn;

use super::{SampleStore, StorageError, DEFAULT_MAX_BUFFERED_SAMPLES};
use crate::tracking::LocationSample;

/// Sample store persisted to a JSON file.
///
/// The file is read lazily on first access and cached; every mutation
/// rewrites the whole file.
#[derive(Debug)]
pub struct FileSampleStore {
    path: PathBuf,
    max_entries: usize,
    cache: Mutex<Option<VecDeque<LocationSample>>>,
}

impl FileSampleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_capacity(path, DEFAULT_MAX_BUFFERED_SAMPLES)
    }

    pub fn with_capacity(path: impl Into<PathBuf>, max_entries: usize) -> Self {
        Self {
            path: path.into(),
            max_entries: max_entries.max(1),
            cache: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<VecDeque<LocationSample>, StorageError> {
        if !self.path.exists() {
            return Ok(VecDeque::new());
        }
        let contents =
            fs::read_to_string(&self.path).map_err(|e| StorageError::io(&self.path, e))?;
        if contents.trim().is_empty() {
            return Ok(VecDeque::new());
        }
        let samples: Vec<LocationSample> = serde_json::from_str(&contents)?;
        Ok(samples.into())
    }

    fn persist(&self, entries: &VecDeque<LocationSample>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
            }
        }

        let json = serde_json::to_string(entries)?;
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, json).map_err(|e| StorageError::io(&tmp_path, e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| StorageError::io(&self.path, e))?;
        Ok(())
    }
}

impl SampleStore for FileSampleStore {
    fn append(&self, sample: &LocationSample) -> Result<(), StorageError> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        let entries = match cache.as_mut() {
            Some(entries) => entries,
            None => {
                let loaded = match self.load() {
                    Ok(entries) => entries,
                    Err(StorageError::Serialization(e)) => {
                        warn!(
                            path = %self.path.display(),
                            error = %e,
                            "Corrupt sample buffer, starting fresh"
                        );
                        VecDeque::new()
                    }
                    Err(e) => return Err(e),
                };
                cache.insert(loaded)
            }
        };

        while entries.len() >= self.max_entries {
            entries.pop_front();
        }
        entries.push_back(sample.clone());
        self.persist(entries)
    }

    fn read_all(&self) -> Result<Vec<LocationSample>, StorageError> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if cache.is_none() {
            *cache = Some(self.load()?);
        }
        Ok(cache
            .as_ref()
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        *cache = Some(VecDeque::new());
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(&self.path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::RawLocation;
    use tempfile::TempDir;

    fn sample(lat: f64) -> LocationSample {
        LocationSample::from_raw(&RawLocation::new(lat, -0.12, 5.0))
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let temp = TempDir::new().unwrap();
        let store = FileSampleStore::new(temp.path().join("buffer.json"));
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_append_persists_across_instances() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("buffer.json");

        let store = FileSampleStore::new(&path);
        store.append(&sample(51.1)).unwrap();
        store.append(&sample(51.2)).unwrap();

        let reopened = FileSampleStore::new(&path);
        let all = reopened.read_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].latitude, 51.2);
    }

    #[test]
    fn test_cap_evicts_oldest() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("buffer.json");
        let store = FileSampleStore::with_capacity(&path, 2);

        store.append(&sample(51.1)).unwrap();
        store.append(&sample(51.2)).unwrap();
        store.append(&sample(51.3)).unwrap();

        let all = FileSampleStore::new(&path).read_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].latitude, 51.2);
    }

    #[test]
    fn test_clear_removes_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("buffer.json");
        let store = FileSampleStore::new(&path);

        store.append(&sample(51.1)).unwrap();
        assert!(path.exists());

        store.clear().unwrap();
        assert!(!path.exists());
        assert!(store.read_all().unwrap().is_empty());
        store.clear().unwrap();
    }

    #[test]
    fn test_corrupt_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("buffer.json");
        fs::write(&path, "not json").unwrap();

        let store = FileSampleStore::new(&path);
        assert!(matches!(
            store.read_all(),
            Err(StorageError::Serialization(_))
        ));

        let store = FileSampleStore::new(&path);
        store.append(&sample(51.1)).unwrap();
        assert_eq!(store.read_all().unwrap().len(), 1);
    }
}
