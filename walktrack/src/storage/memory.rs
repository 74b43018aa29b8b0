//! In-memory sample store.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::{SampleStore, StorageError, DEFAULT_MAX_BUFFERED_SAMPLES};
use crate::tracking::LocationSample;

/// Sample store backed by a bounded in-memory queue.
#[derive(Debug)]
pub struct MemorySampleStore {
    entries: Mutex<VecDeque<LocationSample>>,
    max_entries: usize,
}

impl MemorySampleStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_BUFFERED_SAMPLES)
    }

    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            max_entries: max_entries.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemorySampleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleStore for MemorySampleStore {
    fn append(&self, sample: &LocationSample) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        while entries.len() >= self.max_entries {
            entries.pop_front();
        }
        entries.push_back(sample.clone());
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<LocationSample>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.iter().cloned().collect())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::RawLocation;

    fn sample(lat: f64) -> LocationSample {
        LocationSample::from_raw(&RawLocation::new(lat, -0.12, 5.0))
    }

    #[test]
    fn test_append_and_read_in_order() {
        let store = MemorySampleStore::new();
        store.append(&sample(51.1)).unwrap();
        store.append(&sample(51.2)).unwrap();

        let all = store.read_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].latitude, 51.1);
        assert_eq!(all[1].latitude, 51.2);
    }

    #[test]
    fn test_evicts_oldest_when_full() {
        let store = MemorySampleStore::with_capacity(3);
        for i in 0..5 {
            store.append(&sample(50.0 + i as f64)).unwrap();
        }

        let all = store.read_all().unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].latitude, 52.0);
        assert_eq!(all[2].latitude, 54.0);
    }

    #[test]
    fn test_clear() {
        let store = MemorySampleStore::new();
        store.append(&sample(51.1)).unwrap();
        store.clear().unwrap();
        assert!(store.is_empty());
    }
}
