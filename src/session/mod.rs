// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Recording and playback sessions.
//!
//! `SessionManager` is the only owner of session state. It enforces at most
//! one recording and at most one playback at a time, routes live key input
//! to the tone source, and hands finished recordings to a record store.

pub mod runtime;

pub use runtime::{Command, EventLoop, Notification, PianoHandle};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::audio::ToneSource;
use crate::location::{provenance, Locator};
use crate::music::KeyMap;
use crate::recording::{CaptureSampler, FrameError, InputState, NoteSet, Recording};
use crate::sequencer::{NoteCallback, PlaybackReport, PlaybackScheduler};
use crate::store::RecordStore;
use crate::timing::{SessionClock, DEFAULT_CADENCE_MS};

/// Session error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("a recording is already in progress")]
    RecordingActive,

    #[error("a playback is already in progress")]
    PlaybackActive,

    #[error("invalid recording: {0}")]
    InvalidRecording(#[from] FrameError),
}

/// An open recording session
#[derive(Debug)]
struct RecordingSession {
    clock: SessionClock,
    sampler: CaptureSampler,
}

/// Owner of live input, recording and playback state
pub struct SessionManager<T: ToneSource> {
    /// Shared key table
    keymap: Arc<KeyMap>,
    /// Tone output
    tones: T,
    /// Keys currently held by the player
    input: InputState,
    /// Capture cadence for new recordings
    cadence_ms: u64,
    /// Recording in progress
    recording: Option<RecordingSession>,
    /// Playback scheduler (holds the playback session)
    scheduler: PlaybackScheduler,
    /// Last recording whose save failed
    unsaved: Option<Recording>,
}

impl<T: ToneSource> SessionManager<T> {
    /// Create a manager with the default capture cadence
    pub fn new(keymap: Arc<KeyMap>, tones: T) -> Self {
        Self {
            keymap,
            tones,
            input: InputState::new(),
            cadence_ms: DEFAULT_CADENCE_MS,
            recording: None,
            scheduler: PlaybackScheduler::new(),
            unsaved: None,
        }
    }

    /// Set the capture cadence used by subsequent recordings
    pub fn with_cadence(mut self, cadence_ms: u64) -> Self {
        self.cadence_ms = cadence_ms.max(1);
        self
    }

    /// Capture cadence in milliseconds
    pub fn cadence_ms(&self) -> u64 {
        self.cadence_ms
    }

    /// Tone output
    pub fn tones(&self) -> &T {
        &self.tones
    }

    /// Live input state
    pub fn input(&self) -> &InputState {
        &self.input
    }

    // ---- Live input ----

    /// Key down from the input layer. Returns true if a tone started.
    pub fn press_key(&mut self, binding: &str) -> bool {
        let Some(key) = self.keymap.find(binding) else {
            debug!(binding, "ignoring unbound key");
            return false;
        };
        if !self.input.press(&key.binding) {
            return false;
        }
        self.tones.start_tone(key.frequency);
        true
    }

    /// Key up from the input layer. Returns true if a tone stopped.
    pub fn release_key(&mut self, binding: &str) -> bool {
        let Some(key) = self.keymap.find(binding) else {
            return false;
        };
        if !self.input.release(&key.binding) {
            return false;
        }
        let frequency = key.frequency;
        self.stop_live_tone(frequency);
        true
    }

    /// Release every held key
    pub fn release_all(&mut self) {
        for binding in self.input.release_all() {
            if let Some(frequency) = self.keymap.frequency(&binding) {
                self.stop_live_tone(frequency);
            }
        }
    }

    /// Stop a live tone unless the playback is sounding the same frequency
    fn stop_live_tone(&mut self, frequency: f64) {
        let playing = self
            .scheduler
            .active_notes()
            .map(|notes| held_frequencies(&self.keymap, notes))
            .unwrap_or_default();
        if playing.contains(&frequency) {
            debug!(frequency, "tone kept for playback");
            return;
        }
        self.tones.stop_tone(frequency);
    }

    // ---- Recording ----

    /// Check if a recording is in progress
    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    /// Frames captured by the recording in progress
    pub fn recorded_frames(&self) -> usize {
        self.recording
            .as_ref()
            .map_or(0, |session| session.sampler.frame_count())
    }

    /// Open a recording session
    pub fn try_begin_recording(&mut self) -> Result<(), SessionError> {
        if self.recording.is_some() {
            return Err(SessionError::RecordingActive);
        }

        self.recording = Some(RecordingSession {
            clock: SessionClock::start(),
            sampler: CaptureSampler::start_sampling(self.cadence_ms),
        });
        info!(cadence_ms = self.cadence_ms, "recording started");
        Ok(())
    }

    /// Open a recording session; false if one is already open
    pub fn begin_recording(&mut self) -> bool {
        match self.try_begin_recording() {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "begin recording ignored");
                false
            }
        }
    }

    /// Close the recording session.
    ///
    /// Returns `None` if nothing was being recorded or no frame was captured.
    pub fn end_recording(&mut self) -> Option<Recording> {
        let session = self.recording.take()?;
        let frames = session.sampler.stop_sampling();

        if frames.is_empty() {
            info!("recording stopped before the first sample, nothing kept");
            return None;
        }

        let recording = Recording::from_frames(frames);
        info!(
            id = %recording.id,
            frames = recording.frame_count(),
            duration = recording.duration_seconds,
            "recording stopped"
        );
        Some(recording)
    }

    // ---- Playback ----

    /// Check if a playback is in progress
    pub fn is_playing(&self) -> bool {
        self.scheduler.is_playing()
    }

    /// Playback actions still waiting to fire
    pub fn pending_actions(&self) -> usize {
        self.scheduler.pending_actions()
    }

    /// Validate and schedule a recording for playback
    pub fn try_begin_playback(
        &mut self,
        recording: &Recording,
        on_change: NoteCallback,
    ) -> Result<(), SessionError> {
        if self.scheduler.is_playing() {
            return Err(SessionError::PlaybackActive);
        }
        recording.validate()?;

        let started = self.scheduler.start(
            recording.id.clone(),
            recording.frames.clone(),
            SessionClock::start(),
            on_change,
        );
        debug_assert!(started);
        info!(id = %recording.id, frames = recording.frame_count(), "playback started");
        Ok(())
    }

    /// Schedule a recording for playback; false if the request was dropped
    pub fn begin_playback(&mut self, recording: &Recording, on_change: NoteCallback) -> bool {
        match self.try_begin_playback(recording, on_change) {
            Ok(()) => true,
            Err(e) => {
                warn!(id = %recording.id, error = %e, "playback request ignored");
                false
            }
        }
    }

    /// Stop the playback in progress, silencing its notes
    pub fn cancel_playback(&mut self) -> Option<PlaybackReport> {
        let mut tones = SharedTones {
            tones: &mut self.tones,
            held: held_frequencies(&self.keymap, self.input.held()),
        };
        let report = self.scheduler.cancel(&self.keymap, &mut tones)?;
        info!(id = %report.recording_id, "playback cancelled");
        Some(report)
    }

    // ---- Event loop hooks ----

    /// Earliest instant at which `pump` has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        let capture = self
            .recording
            .as_ref()
            .map(|session| session.clock.deadline(session.sampler.next_tick_ms()));
        let playback = self.scheduler.next_deadline();

        match (capture, playback) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Run capture ticks and playback actions due at `now`.
    ///
    /// Returns the playback report when a playback completes.
    pub fn pump(&mut self, now: Instant) -> Option<PlaybackReport> {
        if let Some(session) = self.recording.as_mut() {
            let elapsed_ms = session.clock.elapsed_ms_at(now);
            session.sampler.sample(elapsed_ms, &self.input);
        }

        let mut tones = SharedTones {
            tones: &mut self.tones,
            held: held_frequencies(&self.keymap, self.input.held()),
        };
        let report = self.scheduler.poll_at(now, &self.keymap, &mut tones);
        if let Some(report) = &report {
            info!(
                id = %report.recording_id,
                frames = report.frames_played,
                skipped = report.skipped_notes,
                "playback finished"
            );
        }
        report
    }

    // ---- Persistence ----

    /// Stamp provenance on a recording and save it.
    ///
    /// On failure the recording is kept as unsaved and `None` is returned.
    pub fn save_recording(
        &mut self,
        mut recording: Recording,
        store: &mut dyn RecordStore,
        locator: &dyn Locator,
    ) -> Option<Recording> {
        recording.location = provenance(locator.locate().as_ref());
        if recording.display_name.is_empty() {
            recording.display_name = default_display_name(recording.created_at);
        }

        match store.save(&recording) {
            Ok(saved) => {
                info!(id = %saved.id, location = %saved.location, "recording saved");
                if self.unsaved.as_ref().is_some_and(|r| r.id == saved.id) {
                    self.unsaved = None;
                }
                Some(saved)
            }
            Err(e) => {
                warn!(id = %recording.id, error = %e, "failed to save recording");
                self.unsaved = Some(recording);
                None
            }
        }
    }

    /// Close the recording session and save the result
    pub fn end_and_save(
        &mut self,
        store: &mut dyn RecordStore,
        locator: &dyn Locator,
    ) -> Option<Recording> {
        let recording = self.end_recording()?;
        self.save_recording(recording, store, locator)
    }

    /// Retry saving the last recording whose save failed
    pub fn retry_unsaved(
        &mut self,
        store: &mut dyn RecordStore,
        locator: &dyn Locator,
    ) -> Option<Recording> {
        let recording = self.unsaved.take()?;
        self.save_recording(recording, store, locator)
    }

    /// Last recording whose save failed
    pub fn unsaved(&self) -> Option<&Recording> {
        self.unsaved.as_ref()
    }

    /// Take ownership of the unsaved recording
    pub fn take_unsaved(&mut self) -> Option<Recording> {
        self.unsaved.take()
    }

    /// Drop the unsaved recording. Returns false if there was none.
    pub fn discard_unsaved(&mut self) -> bool {
        match self.unsaved.take() {
            Some(recording) => {
                debug!(id = %recording.id, "unsaved recording discarded");
                true
            }
            None => false,
        }
    }
}

/// Frequencies of the bound keys in `notes`
fn held_frequencies(keymap: &KeyMap, notes: &NoteSet) -> Vec<f64> {
    notes
        .iter()
        .filter_map(|binding| keymap.frequency(binding))
        .collect()
}

/// Playback's view of the tone output.
///
/// Stops are dropped for frequencies the player is still holding.
struct SharedTones<'a, T: ToneSource> {
    tones: &'a mut T,
    held: Vec<f64>,
}

impl<T: ToneSource> ToneSource for SharedTones<'_, T> {
    fn start_tone(&mut self, frequency: f64) {
        self.tones.start_tone(frequency);
    }

    fn stop_tone(&mut self, frequency: f64) {
        if self.held.contains(&frequency) {
            debug!(frequency, "tone kept for live key");
            return;
        }
        self.tones.stop_tone(frequency);
    }
}

/// Name given to recordings saved without one
pub fn default_display_name(created_at: DateTime<Utc>) -> String {
    format!("Recording {}", created_at.format("%Y-%m-%d %H:%M:%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{LocationInfo, StaticLocator};
    use crate::recording::Frame;
    use crate::store::{MemoryStore, StoreError};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    #[derive(Default)]
    struct MockTones {
        calls: Vec<(bool, f64)>,
    }

    impl ToneSource for MockTones {
        fn start_tone(&mut self, frequency: f64) {
            self.calls.push((true, frequency));
        }

        fn stop_tone(&mut self, frequency: f64) {
            self.calls.push((false, frequency));
        }
    }

    struct OfflineStore;

    impl RecordStore for OfflineStore {
        fn save(&mut self, _recording: &Recording) -> Result<Recording, StoreError> {
            Err(StoreError::Unavailable("network error".to_string()))
        }

        fn list_all(&self) -> Result<Vec<Recording>, StoreError> {
            Err(StoreError::Unavailable("network error".to_string()))
        }
    }

    fn manager() -> SessionManager<MockTones> {
        SessionManager::new(Arc::new(KeyMap::c_major()), MockTones::default())
    }

    fn ignore() -> NoteCallback {
        Box::new(|_: &NoteSet| {})
    }

    async fn tick(manager: &mut SessionManager<MockTones>, ms: u64) {
        tokio::time::advance(Duration::from_millis(ms)).await;
        manager.pump(Instant::now());
    }

    #[test]
    fn test_live_keys_drive_tones() {
        let mut manager = manager();

        assert!(manager.press_key("a"));
        assert!(!manager.press_key("A"));
        assert!(manager.input().is_held("A"));
        assert!(!manager.press_key("Q"));

        assert!(manager.release_key("A"));
        assert!(!manager.release_key("A"));

        assert_eq!(manager.tones().calls, vec![(true, 261.63), (false, 261.63)]);
    }

    #[test]
    fn test_release_all() {
        let mut manager = manager();
        manager.press_key("A");
        manager.press_key("S");
        manager.release_all();
        assert!(manager.input().held().is_empty());
        assert_eq!(manager.tones().calls.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_session() {
        let mut manager = manager();
        assert!(manager.begin_recording());
        assert!(manager.is_recording());

        manager.press_key("A");
        tick(&mut manager, 50).await;
        manager.press_key("S");
        tick(&mut manager, 50).await;
        manager.release_key("A");
        tick(&mut manager, 50).await;

        let recording = manager.end_recording().unwrap();
        assert!(!manager.is_recording());
        assert_eq!(
            recording.frames,
            vec![
                Frame::new(50, ["A"]),
                Frame::new(100, ["A", "S"]),
                Frame::new(150, ["S"]),
            ]
        );
        assert_eq!(recording.duration_seconds, 0.15);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_recording_leaves_first_untouched() {
        let mut manager = manager();
        assert!(manager.begin_recording());
        manager.press_key("A");
        tick(&mut manager, 50).await;
        assert_eq!(manager.recorded_frames(), 1);

        assert_eq!(
            manager.try_begin_recording(),
            Err(SessionError::RecordingActive)
        );
        assert!(!manager.begin_recording());
        assert_eq!(manager.recorded_frames(), 1);

        tick(&mut manager, 50).await;
        let recording = manager.end_recording().unwrap();
        assert_eq!(recording.frames[0], Frame::new(50, ["A"]));
        assert_eq!(recording.frame_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_recording_is_none() {
        let mut manager = manager();
        manager.begin_recording();
        tick(&mut manager, 30).await;
        assert!(manager.end_recording().is_none());
        assert!(!manager.is_recording());
        assert!(manager.end_recording().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_playback_through_manager() {
        let mut manager = manager();
        let recording = Recording::from_frames(vec![
            Frame::new(0, ["A"]),
            Frame::new(50, ["A", "S"]),
            Frame::new(100, ["S"]),
            Frame::silent(150),
        ]);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        assert!(manager.begin_playback(
            &recording,
            Box::new(move |notes: &NoteSet| sink.borrow_mut().push(notes.len()))
        ));

        assert!(manager.pump(Instant::now()).is_none());
        tick(&mut manager, 50).await;
        tick(&mut manager, 50).await;
        tokio::time::advance(Duration::from_millis(50)).await;
        let report = manager.pump(Instant::now()).unwrap();

        assert_eq!(report.frames_played, 4);
        assert!(!manager.is_playing());
        assert_eq!(
            manager.tones().calls,
            vec![(true, 261.63), (true, 293.66), (false, 261.63), (false, 293.66)]
        );
        assert_eq!(*seen.borrow(), vec![1, 2, 1, 0, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_playback_rejected() {
        let mut manager = manager();
        let first = Recording::from_frames(vec![Frame::new(0, ["A"]), Frame::silent(500)]);
        let second = Recording::from_frames(vec![Frame::new(0, ["K"])]);

        assert!(manager.begin_playback(&first, ignore()));
        let pending = manager.pending_actions();

        assert_eq!(
            manager.try_begin_playback(&second, ignore()),
            Err(SessionError::PlaybackActive)
        );
        assert!(!manager.begin_playback(&second, ignore()));
        assert_eq!(manager.pending_actions(), pending);
    }

    #[test]
    fn test_empty_playback_rejected_without_side_effects() {
        let mut manager = manager();
        let empty = Recording::from_frames(Vec::new());

        assert_eq!(
            manager.try_begin_playback(&empty, ignore()),
            Err(SessionError::InvalidRecording(FrameError::Empty))
        );
        assert!(!manager.is_playing());
        assert_eq!(manager.pending_actions(), 0);
        assert!(manager.tones().calls.is_empty());
    }

    #[test]
    fn test_out_of_order_playback_rejected() {
        let mut manager = manager();
        let mut recording = Recording::from_frames(vec![Frame::new(100, ["A"])]);
        recording.frames.push(Frame::new(50, ["S"]));

        assert!(!manager.begin_playback(&recording, ignore()));
        assert!(!manager.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_playback() {
        let mut manager = manager();
        let recording = Recording::from_frames(vec![Frame::new(0, ["A", "S"]), Frame::silent(1000)]);
        manager.begin_playback(&recording, ignore());
        manager.pump(Instant::now());

        let report = manager.cancel_playback().unwrap();
        assert!(report.cancelled);
        assert!(!manager.is_playing());
        assert_eq!(manager.pending_actions(), 0);

        let stops = manager.tones().calls.iter().filter(|(on, _)| !on).count();
        assert_eq!(stops, 2);
        assert!(manager.cancel_playback().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_playback_keeps_live_held_tone() {
        let mut manager = manager();
        assert!(manager.press_key("A"));

        let recording = Recording::from_frames(vec![Frame::new(0, ["A"]), Frame::silent(50)]);
        assert!(manager.begin_playback(&recording, ignore()));
        manager.pump(Instant::now());
        tick(&mut manager, 50).await;
        assert!(!manager.is_playing());

        // The player still holds A, so playback never stopped it
        assert_eq!(manager.tones().calls, vec![(true, 261.63), (true, 261.63)]);

        assert!(manager.release_key("A"));
        assert_eq!(manager.tones().calls.last(), Some(&(false, 261.63)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_release_keeps_playback_tone() {
        let mut manager = manager();
        let recording = Recording::from_frames(vec![Frame::new(0, ["S"]), Frame::silent(1000)]);
        manager.begin_playback(&recording, ignore());
        manager.pump(Instant::now());

        manager.press_key("s");
        manager.release_key("s");
        let stops = manager.tones().calls.iter().filter(|(on, _)| !on).count();
        assert_eq!(stops, 0);

        // Cancelling with a live key down leaves that key sounding
        manager.press_key("S");
        manager.cancel_playback().unwrap();
        let stops = manager.tones().calls.iter().filter(|(on, _)| !on).count();
        assert_eq!(stops, 0);

        manager.release_key("S");
        assert_eq!(manager.tones().calls.last(), Some(&(false, 293.66)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_deadline_picks_earliest() {
        let mut manager = manager().with_cadence(40);
        assert!(manager.next_deadline().is_none());

        let start = Instant::now();
        manager.begin_recording();
        assert_eq!(manager.next_deadline(), Some(start + Duration::from_millis(40)));

        let recording = Recording::from_frames(vec![Frame::new(10, ["A"])]);
        manager.begin_playback(&recording, ignore());
        assert_eq!(manager.next_deadline(), Some(start + Duration::from_millis(10)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_and_save_stamps_provenance() {
        let mut manager = manager();
        let mut store = MemoryStore::new();
        let locator = StaticLocator::new(Some(LocationInfo {
            city: Some("Sierra Vista".to_string()),
            region: Some("Arizona".to_string()),
            ..Default::default()
        }));

        manager.begin_recording();
        manager.press_key("G");
        tick(&mut manager, 50).await;

        let saved = manager.end_and_save(&mut store, &locator).unwrap();
        assert_eq!(saved.location, "Sierra Vista, Arizona");
        assert!(saved.display_name.starts_with("Recording "));
        assert_eq!(store.len(), 1);
        assert!(manager.unsaved().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_keeps_recording() {
        let mut manager = manager();
        let mut offline = OfflineStore;
        let locator = StaticLocator::unknown();

        manager.begin_recording();
        manager.press_key("A");
        tick(&mut manager, 50).await;

        assert!(manager.end_and_save(&mut offline, &locator).is_none());
        let unsaved = manager.unsaved().unwrap();
        assert_eq!(unsaved.frames, vec![Frame::new(50, ["A"])]);
        assert_eq!(unsaved.location, "Unknown");

        // The in-memory copy still plays
        let copy = unsaved.clone();
        assert!(manager.begin_playback(&copy, ignore()));

        // And can be saved once the store is reachable
        let mut store = MemoryStore::new();
        let saved = manager.retry_unsaved(&mut store, &locator).unwrap();
        assert_eq!(saved.id, copy.id);
        assert!(manager.unsaved().is_none());
    }

    #[test]
    fn test_discard_unsaved() {
        let mut manager = manager();
        let recording = Recording::from_frames(vec![Frame::new(50, ["A"])]);
        assert!(manager
            .save_recording(recording, &mut OfflineStore, &StaticLocator::unknown())
            .is_none());
        assert!(manager.unsaved().is_some());

        assert!(manager.discard_unsaved());
        assert!(manager.unsaved().is_none());
        assert!(!manager.discard_unsaved());
        assert!(manager.take_unsaved().is_none());
    }

    #[test]
    fn test_default_display_name() {
        let created = DateTime::parse_from_rfc3339("2026-03-04T05:06:07Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(default_display_name(created), "Recording 2026-03-04 05:06:07");
    }
}
