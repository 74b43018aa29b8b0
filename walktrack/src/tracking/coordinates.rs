//! Append-only coordinate storage for a session.
//!
//! Sessions are shared as copy-on-write snapshots, so the engine clones a
//! session whenever a subscriber still holds the previous one. Samples are
//! therefore kept in sealed, shared chunks of [`CHUNK_LEN`]: cloning a log
//! copies only the chunk handles and the unsealed tail, not the whole walk.

use std::ops::Index;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::sample::LocationSample;

/// Samples per sealed chunk.
pub const CHUNK_LEN: usize = 256;

/// Ordered, append-only list of accepted samples.
#[derive(Debug, Clone, Default)]
pub struct CoordinateLog {
    sealed: Vec<Arc<[LocationSample]>>,
    tail: Vec<LocationSample>,
}

impl CoordinateLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, sample: LocationSample) {
        self.tail.push(sample);
        if self.tail.len() == CHUNK_LEN {
            let chunk: Arc<[LocationSample]> = std::mem::take(&mut self.tail).into();
            self.sealed.push(chunk);
        }
    }

    pub fn len(&self) -> usize {
        self.sealed.len() * CHUNK_LEN + self.tail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sealed.is_empty() && self.tail.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LocationSample> {
        let chunk = index / CHUNK_LEN;
        match self.sealed.get(chunk) {
            Some(sealed) => sealed.get(index % CHUNK_LEN),
            None if chunk == self.sealed.len() => self.tail.get(index % CHUNK_LEN),
            None => None,
        }
    }

    pub fn last(&self) -> Option<&LocationSample> {
        self.tail
            .last()
            .or_else(|| self.sealed.last().and_then(|chunk| chunk.last()))
    }

    /// Samples in the order they were accepted.
    pub fn iter(&self) -> impl Iterator<Item = &LocationSample> + '_ {
        self.sealed
            .iter()
            .flat_map(|chunk| chunk.iter())
            .chain(self.tail.iter())
    }

    pub fn to_vec(&self) -> Vec<LocationSample> {
        self.iter().cloned().collect()
    }
}

impl Index<usize> for CoordinateLog {
    type Output = LocationSample;

    fn index(&self, index: usize) -> &LocationSample {
        match self.get(index) {
            Some(sample) => sample,
            None => panic!(
                "coordinate index {index} out of range for log of length {}",
                self.len()
            ),
        }
    }
}

impl PartialEq for CoordinateLog {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl FromIterator<LocationSample> for CoordinateLog {
    fn from_iter<I: IntoIterator<Item = LocationSample>>(iter: I) -> Self {
        let mut log = Self::new();
        for sample in iter {
            log.push(sample);
        }
        log
    }
}

impl Serialize for CoordinateLog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for CoordinateLog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let samples = Vec::<LocationSample>::deserialize(deserializer)?;
        Ok(samples.into_iter().collect())
    }
}
