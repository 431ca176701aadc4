// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Record stores for saved performances.
//!
//! This module provides:
//! - The `RecordStore` persistence boundary
//! - An in-memory store
//! - A JSON file store using the recording wire format

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use thiserror::Error;
use tracing::warn;

use crate::recording::Recording;

/// Store error types
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Duplicate recording id: {0}")]
    Duplicate(String),
}

/// Persistence boundary for recordings
pub trait RecordStore {
    /// Save a recording and return the stored copy
    fn save(&mut self, recording: &Recording) -> Result<Recording, StoreError>;

    /// All recordings, most recent first
    fn list_all(&self) -> Result<Vec<Recording>, StoreError>;

    /// Look up one recording by id
    fn find(&self, id: &str) -> Result<Option<Recording>, StoreError> {
        Ok(self.list_all()?.into_iter().find(|r| r.id == id))
    }
}

impl<S: RecordStore + ?Sized> RecordStore for Box<S> {
    fn save(&mut self, recording: &Recording) -> Result<Recording, StoreError> {
        (**self).save(recording)
    }

    fn list_all(&self) -> Result<Vec<Recording>, StoreError> {
        (**self).list_all()
    }

    fn find(&self, id: &str) -> Result<Option<Recording>, StoreError> {
        (**self).find(id)
    }
}

/// Fetch all recordings, degrading any store failure to an empty list
pub fn fetch_recordings(store: &dyn RecordStore) -> Vec<Recording> {
    match store.list_all() {
        Ok(recordings) => recordings,
        Err(e) => {
            warn!(error = %e, "failed to fetch recordings");
            Vec::new()
        }
    }
}

/// Sort recordings most recent first
pub(crate) fn sort_newest_first(recordings: &mut [Recording]) {
    recordings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::Frame;

    struct BrokenStore;

    impl RecordStore for BrokenStore {
        fn save(&mut self, _recording: &Recording) -> Result<Recording, StoreError> {
            Err(StoreError::Unavailable("offline".to_string()))
        }

        fn list_all(&self) -> Result<Vec<Recording>, StoreError> {
            Err(StoreError::Unavailable("offline".to_string()))
        }
    }

    #[test]
    fn test_fetch_degrades_to_empty() {
        assert!(fetch_recordings(&BrokenStore).is_empty());
    }

    #[test]
    fn test_default_find() {
        let mut store = MemoryStore::new();
        let saved = store
            .save(&Recording::from_frames(vec![Frame::new(50, ["A"])]))
            .unwrap();

        let boxed: Box<dyn RecordStore> = Box::new(store);
        assert_eq!(boxed.find(&saved.id).unwrap(), Some(saved));
        assert_eq!(boxed.find("missing").unwrap(), None);
    }

    #[test]
    fn test_error_display() {
        let err = StoreError::Unavailable("offline".to_string());
        assert_eq!(err.to_string(), "Store unavailable: offline");
    }
}
