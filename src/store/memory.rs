// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! In-memory record store.

use super::{sort_newest_first, RecordStore, StoreError};
use crate::recording::Recording;

/// Record store held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    recordings: Vec<Recording>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored recordings
    pub fn len(&self) -> usize {
        self.recordings.len()
    }

    /// True if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.recordings.is_empty()
    }
}

impl RecordStore for MemoryStore {
    fn save(&mut self, recording: &Recording) -> Result<Recording, StoreError> {
        if self.recordings.iter().any(|r| r.id == recording.id) {
            return Err(StoreError::Duplicate(recording.id.clone()));
        }
        self.recordings.push(recording.clone());
        Ok(recording.clone())
    }

    fn list_all(&self) -> Result<Vec<Recording>, StoreError> {
        let mut recordings = self.recordings.clone();
        sort_newest_first(&mut recordings);
        Ok(recordings)
    }
}
