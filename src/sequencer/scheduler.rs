// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Playback scheduler.
//!
//! Holds a priority queue of deferred playback actions keyed by their
//! offset from playback start. The event loop asks for the next deadline,
//! sleeps until it, then polls; every due action runs in offset order,
//! with ties broken by position in the recording.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tokio::time::Instant;
use tracing::{debug, warn};

use super::{NoteCallback, PlaybackReport};
use crate::audio::ToneSource;
use crate::music::KeyMap;
use crate::recording::{Frame, NoteSet};
use crate::timing::SessionClock;

/// What a deferred action does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Apply the frame at this index
    Step(usize),
    /// Silence everything and end the session
    Finish,
}

/// A deferred playback action
#[derive(Debug, Clone, Copy)]
pub struct ScheduledAction {
    /// Offset from playback start in milliseconds
    pub offset_ms: u64,
    /// Insertion order, used to break offset ties
    pub seq: usize,
    /// Action to perform
    pub kind: ActionKind,
}

// For BinaryHeap - we want the earliest (offset, seq) first
impl Eq for ScheduledAction {}

impl PartialEq for ScheduledAction {
    fn eq(&self, other: &Self) -> bool {
        self.offset_ms == other.offset_ms && self.seq == other.seq
    }
}

impl Ord for ScheduledAction {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior
        (other.offset_ms, other.seq).cmp(&(self.offset_ms, self.seq))
    }
}

impl PartialOrd for ScheduledAction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// State of the playback in progress
struct PlaybackSession {
    recording_id: String,
    frames: Vec<Frame>,
    previous: NoteSet,
    clock: SessionClock,
    on_change: NoteCallback,
    frames_played: usize,
    skipped_notes: usize,
}

impl PlaybackSession {
    /// Diff frame `index` against the previous snapshot and sound the changes
    fn apply_frame(&mut self, index: usize, keymap: &KeyMap, tones: &mut dyn ToneSource) {
        let Some(frame) = self.frames.get(index) else {
            return;
        };
        let next = canonical_notes(&frame.active_notes, keymap);
        let next = &next;

        for binding in self.previous.difference(next) {
            if let Some(frequency) = keymap.frequency(binding) {
                tones.stop_tone(frequency);
            }
        }

        for binding in next.difference(&self.previous) {
            match keymap.frequency(binding) {
                Some(frequency) => tones.start_tone(frequency),
                None => {
                    warn!(binding = %binding, frame = index, "no key for binding, skipping note");
                    self.skipped_notes += 1;
                }
            }
        }

        self.previous = next.clone();
        self.frames_played += 1;
        (self.on_change)(&self.previous);
    }

    /// Stop whatever is still sounding and report
    fn finish(mut self, cancelled: bool, keymap: &KeyMap, tones: &mut dyn ToneSource) -> PlaybackReport {
        for binding in &self.previous {
            if let Some(frequency) = keymap.frequency(binding) {
                tones.stop_tone(frequency);
            }
        }
        self.previous.clear();
        (self.on_change)(&self.previous);

        PlaybackReport {
            recording_id: self.recording_id,
            frames_played: self.frames_played,
            skipped_notes: self.skipped_notes,
            cancelled,
        }
    }
}

/// Rewrite bound keys in the key map's spelling so "a" and "A" are one note.
///
/// Unbound bindings are kept as written.
fn canonical_notes(notes: &NoteSet, keymap: &KeyMap) -> NoteSet {
    notes
        .iter()
        .map(|binding| {
            keymap
                .canonical(binding)
                .map_or_else(|| binding.clone(), str::to_string)
        })
        .collect()
}

/// Deadline-driven scheduler for a single playback at a time
pub struct PlaybackScheduler {
    /// Priority queue of pending actions
    queue: BinaryHeap<ScheduledAction>,
    /// Playback in progress, if any
    session: Option<PlaybackSession>,
}

impl PlaybackScheduler {
    /// Create an idle scheduler
    pub fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
            session: None,
        }
    }

    /// Check if a playback is in progress
    pub fn is_playing(&self) -> bool {
        self.session.is_some()
    }

    /// Number of actions still waiting to fire
    pub fn pending_actions(&self) -> usize {
        self.queue.len()
    }

    /// Identifier of the recording being played
    pub fn current_recording(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.recording_id.as_str())
    }

    /// Notes sounding at the last applied step
    pub fn active_notes(&self) -> Option<&NoteSet> {
        self.session.as_ref().map(|s| &s.previous)
    }

    /// Schedule every frame plus the closing action.
    ///
    /// Returns false without touching any state if a playback is already
    /// running or there is nothing to play. Frames are expected to be
    /// validated by the caller.
    pub fn start(
        &mut self,
        recording_id: impl Into<String>,
        frames: Vec<Frame>,
        clock: SessionClock,
        on_change: NoteCallback,
    ) -> bool {
        if self.is_playing() {
            return false;
        }
        let Some(last) = frames.last() else {
            return false;
        };
        let end_ms = last.timestamp;

        self.queue.clear();
        for (seq, frame) in frames.iter().enumerate() {
            self.queue.push(ScheduledAction {
                offset_ms: frame.timestamp,
                seq,
                kind: ActionKind::Step(seq),
            });
        }
        self.queue.push(ScheduledAction {
            offset_ms: end_ms,
            seq: frames.len(),
            kind: ActionKind::Finish,
        });

        let recording_id = recording_id.into();
        debug!(recording = %recording_id, frames = frames.len(), end_ms, "playback scheduled");

        self.session = Some(PlaybackSession {
            recording_id,
            frames,
            previous: NoteSet::new(),
            clock,
            on_change,
            frames_played: 0,
            skipped_notes: 0,
        });
        true
    }

    /// Instant at which the next action is due
    pub fn next_deadline(&self) -> Option<Instant> {
        let session = self.session.as_ref()?;
        self.queue
            .peek()
            .map(|action| session.clock.deadline(action.offset_ms))
    }

    /// Run every action due at `now`
    pub fn poll_at(
        &mut self,
        now: Instant,
        keymap: &KeyMap,
        tones: &mut dyn ToneSource,
    ) -> Option<PlaybackReport> {
        let elapsed_ms = self.session.as_ref()?.clock.elapsed_ms_at(now);
        self.advance_to(elapsed_ms, keymap, tones)
    }

    /// Run every action with an offset at or before `elapsed_ms`.
    ///
    /// Returns the report once the closing action has fired.
    pub fn advance_to(
        &mut self,
        elapsed_ms: u64,
        keymap: &KeyMap,
        tones: &mut dyn ToneSource,
    ) -> Option<PlaybackReport> {
        while let Some(action) = self.queue.peek().copied() {
            if action.offset_ms > elapsed_ms {
                break;
            }
            self.queue.pop();

            match action.kind {
                ActionKind::Step(index) => {
                    if let Some(session) = self.session.as_mut() {
                        session.apply_frame(index, keymap, tones);
                    }
                }
                ActionKind::Finish => return self.finish(false, keymap, tones),
            }
        }
        None
    }

    /// Abandon the playback in progress.
    ///
    /// Pending actions are discarded, sounding tones are stopped and the
    /// callback sees an empty set.
    pub fn cancel(&mut self, keymap: &KeyMap, tones: &mut dyn ToneSource) -> Option<PlaybackReport> {
        self.finish(true, keymap, tones)
    }

    fn finish(
        &mut self,
        cancelled: bool,
        keymap: &KeyMap,
        tones: &mut dyn ToneSource,
    ) -> Option<PlaybackReport> {
        self.queue.clear();
        let session = self.session.take()?;
        let report = session.finish(cancelled, keymap, tones);
        debug!(
            recording = %report.recording_id,
            frames = report.frames_played,
            cancelled,
            "playback ended"
        );
        Some(report)
    }
}

impl Default for PlaybackScheduler {
    fn default() -> Self {
        Self::new()
    }
}
