// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Snapshot capture of live input.
//!
//! The input layer keeps `InputState` current as keys go down and up;
//! `CaptureSampler` copies it into a frame once per cadence tick while a
//! recording session is open.

use super::{Frame, NoteSet};

/// Keys currently held down by the player
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputState {
    held: NoteSet,
}

impl InputState {
    /// Create an empty input state
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a binding as held. Returns false if it already was.
    pub fn press(&mut self, binding: &str) -> bool {
        self.held.insert(binding.to_string())
    }

    /// Mark a binding as released. Returns false if it was not held.
    pub fn release(&mut self, binding: &str) -> bool {
        self.held.remove(binding)
    }

    /// Check if a binding is held
    pub fn is_held(&self, binding: &str) -> bool {
        self.held.contains(binding)
    }

    /// Copy of the held set
    pub fn snapshot(&self) -> NoteSet {
        self.held.clone()
    }

    /// Borrow the held set
    pub fn held(&self) -> &NoteSet {
        &self.held
    }

    /// Release everything, returning what was held
    pub fn release_all(&mut self) -> NoteSet {
        std::mem::take(&mut self.held)
    }
}

/// Fixed-cadence sampler accumulating frames
#[derive(Debug, Clone)]
pub struct CaptureSampler {
    /// Tick period in milliseconds
    cadence_ms: u64,
    /// Offset of the next tick
    next_tick_ms: u64,
    /// Accumulated frames
    frames: Vec<Frame>,
}

impl CaptureSampler {
    /// Begin sampling at `cadence_ms` (clamped to at least 1ms).
    ///
    /// The first sample is due one cadence after start.
    pub fn start_sampling(cadence_ms: u64) -> Self {
        let cadence_ms = cadence_ms.max(1);
        Self {
            cadence_ms,
            next_tick_ms: cadence_ms,
            frames: Vec::new(),
        }
    }

    /// Tick period
    pub fn cadence_ms(&self) -> u64 {
        self.cadence_ms
    }

    /// Offset at which the next sample is due
    pub fn next_tick_ms(&self) -> u64 {
        self.next_tick_ms
    }

    /// Check whether a sample is due at `elapsed_ms`
    pub fn is_due(&self, elapsed_ms: u64) -> bool {
        elapsed_ms >= self.next_tick_ms
    }

    /// Take a sample if one is due. Returns true if a frame was appended.
    ///
    /// A late wake-up produces a single frame at the actual elapsed time;
    /// missed ticks are not back-filled.
    pub fn sample(&mut self, elapsed_ms: u64, input: &InputState) -> bool {
        if !self.is_due(elapsed_ms) {
            return false;
        }

        // Never step backwards even if the caller's clock does
        let timestamp = self
            .frames
            .last()
            .map_or(elapsed_ms, |last| elapsed_ms.max(last.timestamp));

        self.frames.push(Frame {
            timestamp,
            active_notes: input.snapshot(),
        });
        self.next_tick_ms = (elapsed_ms / self.cadence_ms + 1) * self.cadence_ms;
        true
    }

    /// Frames captured so far
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Number of frames captured so far
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Stop sampling and hand back the frames
    pub fn stop_sampling(self) -> Vec<Frame> {
        self.frames
    }
}
