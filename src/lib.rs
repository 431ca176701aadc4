// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! keyrec - virtual piano recorder.
//!
//! Live key input sounds tones, a recording session samples the held keys
//! at a fixed cadence into snapshot frames, and playback replays those
//! frames by diffing consecutive snapshots into tone on/off calls.

pub mod audio;
pub mod config;
pub mod location;
pub mod music;
pub mod recording;
pub mod sequencer;
pub mod session;
pub mod store;
pub mod timing;

pub use audio::{OscillatorBank, ToneSource, TracingToneSource};
pub use config::PianoConfig;
pub use location::{LocationInfo, Locator};
pub use music::{Key, KeyMap};
pub use recording::{Frame, NoteSet, Recording};
pub use sequencer::{NoteCallback, PlaybackReport, PlaybackScheduler};
pub use session::{EventLoop, Notification, PianoHandle, SessionError, SessionManager};
pub use store::{JsonFileStore, MemoryStore, RecordStore, StoreError};
