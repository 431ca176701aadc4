// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Offline rendering of recordings to WAV files.
//!
//! The recording is played through the same scheduler as live playback,
//! but against an oscillator bank and a sample counter instead of the
//! wall clock.

use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use super::{FrameError, NoteSet, Recording};
use crate::audio::OscillatorBank;
use crate::music::KeyMap;
use crate::sequencer::PlaybackScheduler;
use crate::timing::SessionClock;

/// Export error types
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Invalid recording: {0}")]
    InvalidRecording(#[from] FrameError),

    #[error("Invalid export settings: {0}")]
    InvalidSettings(String),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

/// Output format for rendered audio
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportSettings {
    /// Sample rate in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Output channels (1 = mono, 2 = stereo)
    #[serde(default = "default_channels")]
    pub channels: u16,
    /// Mix gain (0.0 - 1.0)
    #[serde(default = "default_gain")]
    pub gain: f32,
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_channels() -> u16 {
    2
}

fn default_gain() -> f32 {
    0.25
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            gain: default_gain(),
        }
    }
}

impl ExportSettings {
    /// Check values serde cannot
    pub fn validate(&self) -> Result<(), ExportError> {
        if self.sample_rate == 0 {
            return Err(ExportError::InvalidSettings(
                "sample_rate must be greater than zero".to_string(),
            ));
        }
        if !(1..=2).contains(&self.channels) {
            return Err(ExportError::InvalidSettings(format!(
                "channels must be 1 or 2, got {}",
                self.channels
            )));
        }
        if !(0.0..=1.0).contains(&self.gain) {
            return Err(ExportError::InvalidSettings(format!(
                "gain must be between 0.0 and 1.0, got {}",
                self.gain
            )));
        }
        Ok(())
    }
}

/// What an export produced
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    /// Sample frames per channel
    pub samples: u64,
    /// Rendered length in seconds
    pub duration_seconds: f64,
    /// Note starts skipped because the binding had no key
    pub skipped_notes: usize,
}

/// Render a recording into interleaved samples.
///
/// The output ends at the last frame, where every tone is stopped.
pub fn render_recording(
    recording: &Recording,
    keymap: &KeyMap,
    settings: &ExportSettings,
) -> Result<(Vec<f32>, ExportSummary), ExportError> {
    settings.validate()?;
    recording.validate()?;

    let mut bank = OscillatorBank::new(settings.sample_rate);
    bank.set_gain(settings.gain);

    let mut scheduler = PlaybackScheduler::new();
    if !scheduler.start(
        recording.id.clone(),
        recording.frames.clone(),
        SessionClock::start(),
        Box::new(|_: &NoteSet| {}),
    ) {
        return Err(FrameError::Empty.into());
    }

    let channels = settings.channels as usize;
    let mut samples = Vec::new();
    let mut rendered = 0u64;
    let mut report = None;

    for frame in &recording.frames {
        let target = sample_index(frame.timestamp, bank.sample_rate());
        if target > rendered {
            let start = samples.len();
            samples.resize(start + (target - rendered) as usize * channels, 0.0);
            bank.render(&mut samples[start..], channels);
            rendered = target;
        }
        if let Some(done) = scheduler.advance_to(frame.timestamp, keymap, &mut bank) {
            report = Some(done);
        }
    }

    let summary = ExportSummary {
        samples: rendered,
        duration_seconds: rendered as f64 / settings.sample_rate as f64,
        skipped_notes: report.map_or(0, |r| r.skipped_notes),
    };
    Ok((samples, summary))
}

/// Render a recording and write it as a 16-bit WAV file
pub fn export_wav<P: AsRef<Path>>(
    recording: &Recording,
    keymap: &KeyMap,
    settings: &ExportSettings,
    path: P,
) -> Result<ExportSummary, ExportError> {
    let (samples, summary) = render_recording(recording, keymap, settings)?;

    let spec = WavSpec {
        channels: settings.channels,
        sample_rate: settings.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path.as_ref(), spec)?;
    for sample in &samples {
        writer.write_sample(to_i16(*sample))?;
    }
    writer.finalize()?;

    info!(
        recording = %recording.id,
        path = ?path.as_ref(),
        samples = summary.samples,
        "recording exported"
    );
    Ok(summary)
}

/// Sample frame at which `ms` milliseconds have elapsed
fn sample_index(ms: u64, sample_rate: u32) -> u64 {
    ms * sample_rate as u64 / 1000
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::Frame;
    use tempfile::tempdir;

    fn mono(sample_rate: u32) -> ExportSettings {
        ExportSettings {
            sample_rate,
            channels: 1,
            gain: 1.0,
        }
    }

    #[test]
    fn test_render_follows_frames() {
        // A sounds from 0 to 100 ms, then silence until 200 ms
        let recording = Recording::from_frames(vec![
            Frame::new(0, ["A"]),
            Frame::silent(100),
            Frame::silent(200),
        ]);
        let (samples, summary) =
            render_recording(&recording, &KeyMap::c_major(), &mono(1000)).unwrap();

        assert_eq!(summary.samples, 200);
        assert_eq!(summary.duration_seconds, 0.2);
        assert_eq!(summary.skipped_notes, 0);
        assert_eq!(samples.len(), 200);

        assert!(samples[..100].iter().any(|s| s.abs() > 0.5));
        assert!(samples[100..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_render_counts_unbound_notes() {
        let recording =
            Recording::from_frames(vec![Frame::new(0, ["A", "Z"]), Frame::silent(50)]);
        let (_, summary) =
            render_recording(&recording, &KeyMap::c_major(), &mono(8000)).unwrap();
        assert_eq!(summary.skipped_notes, 1);
        assert_eq!(summary.samples, 400);
    }

    #[test]
    fn test_stereo_channels_match() {
        let recording = Recording::from_frames(vec![Frame::new(0, ["G"]), Frame::silent(20)]);
        let settings = ExportSettings::default();
        let (samples, summary) =
            render_recording(&recording, &KeyMap::c_major(), &settings).unwrap();

        assert_eq!(samples.len() as u64, summary.samples * 2);
        for frame in samples.chunks(2) {
            assert_eq!(frame[0], frame[1]);
        }
        // Default gain keeps one voice well under full scale
        assert!(samples.iter().all(|s| s.abs() <= 0.25));
    }

    #[test]
    fn test_empty_recording_rejected() {
        let recording = Recording::from_frames(Vec::new());
        assert!(matches!(
            render_recording(&recording, &KeyMap::c_major(), &mono(8000)),
            Err(ExportError::InvalidRecording(FrameError::Empty))
        ));
    }

    #[test]
    fn test_unordered_frames_rejected() {
        let recording =
            Recording::from_frames(vec![Frame::new(100, ["A"]), Frame::new(50, ["S"])]);
        assert!(matches!(
            render_recording(&recording, &KeyMap::c_major(), &mono(8000)),
            Err(ExportError::InvalidRecording(_))
        ));
    }

    #[test]
    fn test_bad_settings_rejected() {
        let recording = Recording::from_frames(vec![Frame::new(0, ["A"])]);
        let settings = ExportSettings {
            channels: 6,
            ..Default::default()
        };
        assert!(matches!(
            render_recording(&recording, &KeyMap::c_major(), &settings),
            Err(ExportError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_export_writes_wav() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("take.wav");
        let recording = Recording::from_frames(vec![
            Frame::new(0, ["A", "D"]),
            Frame::new(50, ["D"]),
            Frame::silent(100),
        ]);

        let summary = export_wav(&recording, &KeyMap::c_major(), &mono(8000), &path).unwrap();
        assert_eq!(summary.samples, 800);

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 8000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.len(), 800);
    }
}
