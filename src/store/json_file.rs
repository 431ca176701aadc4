// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! JSON file record store.
//!
//! The whole table lives in one JSON array of wire-format rows. Every save
//! rewrites the file through a sibling temp file and a rename.
//!
//! Rows are decoded one at a time. A row that does not decode as a recording
//! is skipped when listing and written back untouched when saving.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use super::{sort_newest_first, RecordStore, StoreError};
use crate::recording::Recording;

/// Record store backed by a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Open a store at `path`; the file is created on first save
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw rows of the table, undecoded
    fn load_rows(&self) -> Result<Vec<Value>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(Vec::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, rows: &[Value]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(rows)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl RecordStore for JsonFileStore {
    fn save(&mut self, recording: &Recording) -> Result<Recording, StoreError> {
        let mut rows = self.load_rows()?;
        if rows
            .iter()
            .any(|row| row.get("id").and_then(Value::as_str) == Some(recording.id.as_str()))
        {
            return Err(StoreError::Duplicate(recording.id.clone()));
        }

        rows.push(serde_json::to_value(recording)?);
        self.write(&rows)?;
        debug!(id = %recording.id, path = ?self.path, "recording saved");

        Ok(recording.clone())
    }

    fn list_all(&self) -> Result<Vec<Recording>, StoreError> {
        let mut recordings: Vec<Recording> = self
            .load_rows()?
            .into_iter()
            .enumerate()
            .filter_map(|(index, row)| match serde_json::from_value(row) {
                Ok(recording) => Some(recording),
                Err(e) => {
                    warn!(index, error = %e, path = ?self.path, "skipping unreadable row");
                    None
                }
            })
            .collect();
        sort_newest_first(&mut recordings);
        Ok(recordings)
    }
}
