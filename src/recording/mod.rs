// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Performance recordings.
//!
//! This module provides:
//! - Snapshot frames and the recording type built from them
//! - Capture of live input state at a fixed cadence
//! - The wire encoding used by record stores
//! - Offline rendering to WAV files

pub mod capture;
pub mod codec;
pub mod export;

pub use capture::{CaptureSampler, InputState};
pub use export::{export_wav, render_recording, ExportError, ExportSettings, ExportSummary};

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Set of bindings held down at one instant
pub type NoteSet = BTreeSet<String>;

/// Provenance recorded when no location is available
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// One timestamped snapshot of held keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    /// Milliseconds from recording start
    pub timestamp: u64,
    /// Bindings held down at this instant
    #[serde(default)]
    pub active_notes: NoteSet,
}

impl Frame {
    /// Create a frame from any collection of bindings
    pub fn new<I, S>(timestamp: u64, notes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            timestamp,
            active_notes: notes.into_iter().map(Into::into).collect(),
        }
    }

    /// Frame with no keys held
    pub fn silent(timestamp: u64) -> Self {
        Self {
            timestamp,
            active_notes: NoteSet::new(),
        }
    }
}

/// Reasons a frame sequence cannot be played
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// No frames at all
    #[error("recording has no frames")]
    Empty,
    /// A frame is timestamped earlier than its predecessor
    #[error("frame {index} at {timestamp}ms precedes previous frame at {previous}ms")]
    OutOfOrder {
        index: usize,
        previous: u64,
        timestamp: u64,
    },
    /// A frame holds an empty binding
    #[error("frame {index} contains an empty binding")]
    EmptyBinding { index: usize },
}

/// Check that frames form a playable sequence.
///
/// Equal timestamps are allowed; decreasing ones are not.
pub fn validate_frames(frames: &[Frame]) -> Result<(), FrameError> {
    if frames.is_empty() {
        return Err(FrameError::Empty);
    }

    let mut previous = 0u64;
    for (index, frame) in frames.iter().enumerate() {
        if index > 0 && frame.timestamp < previous {
            return Err(FrameError::OutOfOrder {
                index,
                previous,
                timestamp: frame.timestamp,
            });
        }
        if frame.active_notes.iter().any(|n| n.trim().is_empty()) {
            return Err(FrameError::EmptyBinding { index });
        }
        previous = frame.timestamp;
    }

    Ok(())
}

/// Duration of a frame sequence in seconds (zero when empty)
pub fn duration_seconds(frames: &[Frame]) -> f64 {
    frames
        .last()
        .map(|f| f.timestamp as f64 / 1000.0)
        .unwrap_or(0.0)
}

/// A captured performance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    /// Unique identifier
    pub id: String,
    /// Snapshot frames in chronological order
    #[serde(with = "codec::frames")]
    pub frames: Vec<Frame>,
    /// Free-text provenance
    #[serde(default = "default_location")]
    pub location: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Name shown in recording lists
    #[serde(default)]
    pub display_name: String,
    /// Last frame timestamp in seconds
    #[serde(deserialize_with = "codec::lenient_f64", default)]
    pub duration_seconds: f64,
}

fn default_location() -> String {
    UNKNOWN_LOCATION.to_string()
}

impl Recording {
    /// Package frames into a recording with a fresh identifier.
    ///
    /// Provenance is left at its defaults for the store boundary to fill.
    pub fn from_frames(frames: Vec<Frame>) -> Self {
        let created_at = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            duration_seconds: duration_seconds(&frames),
            frames,
            location: default_location(),
            created_at,
            display_name: String::new(),
        }
    }

    /// Number of frames
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Check that the frames can be played
    pub fn validate(&self) -> Result<(), FrameError> {
        validate_frames(&self.frames)
    }

    /// Display name, falling back to the identifier
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.id
        } else {
            &self.display_name
        }
    }
}
