// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Playback of recorded performances.
//!
//! The scheduler turns a frame sequence into timed tone on/off calls by
//! diffing each snapshot against the one before it.

pub mod scheduler;

pub use scheduler::{PlaybackScheduler, ScheduledAction};

use crate::recording::NoteSet;

/// Presentation hook invoked with the active notes at every playback step
pub type NoteCallback = Box<dyn FnMut(&NoteSet)>;

/// Summary of a finished or cancelled playback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackReport {
    /// Identifier of the recording that was played
    pub recording_id: String,
    /// Frames whose step ran before playback ended
    pub frames_played: usize,
    /// Note starts skipped because the binding had no key
    pub skipped_notes: usize,
    /// True if playback was cut short
    pub cancelled: bool,
}
