// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Tone output for the piano.
//!
//! This module provides:
//! - The `ToneSource` boundary used by live input and playback
//! - A sine oscillator bank that renders interleaved sample buffers
//! - A tracing-backed tone source for headless runs

pub mod oscillator;

pub use oscillator::{OscillatorBank, SineOscillator};

use tracing::info;

/// Something that can sound a tone at a frequency.
///
/// Implementations keep at most one voice per distinct frequency: starting
/// a frequency that is already sounding replaces the running voice rather
/// than stacking a second one.
pub trait ToneSource {
    /// Start (or restart) a tone at `frequency` Hz
    fn start_tone(&mut self, frequency: f64);

    /// Stop the tone at `frequency` Hz; no-op if it is not sounding
    fn stop_tone(&mut self, frequency: f64);
}

impl<T: ToneSource + ?Sized> ToneSource for Box<T> {
    fn start_tone(&mut self, frequency: f64) {
        (**self).start_tone(frequency);
    }

    fn stop_tone(&mut self, frequency: f64) {
        (**self).stop_tone(frequency);
    }
}

/// Tone source that logs tone changes instead of producing sound.
///
/// Wraps an `OscillatorBank` so the voice bookkeeping is the same as a
/// real output path.
#[derive(Debug, Default)]
pub struct TracingToneSource {
    bank: OscillatorBank,
}

impl TracingToneSource {
    /// Create a new tracing tone source
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tones currently sounding
    pub fn sounding(&self) -> usize {
        self.bank.active_count()
    }
}

impl ToneSource for TracingToneSource {
    fn start_tone(&mut self, frequency: f64) {
        info!(frequency, "tone on");
        self.bank.start_tone(frequency);
    }

    fn stop_tone(&mut self, frequency: f64) {
        info!(frequency, "tone off");
        self.bank.stop_tone(frequency);
    }
}
