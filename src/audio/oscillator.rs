// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Sine oscillator bank.
//!
//! One oscillator per sounding frequency, mixed into interleaved
//! output buffers by `render`.

use std::collections::HashMap;
use std::f64::consts::TAU;

use super::ToneSource;

/// A single sine voice
#[derive(Debug, Clone, PartialEq)]
pub struct SineOscillator {
    /// Frequency in Hz
    pub frequency: f64,
    /// Phase in radians (0..TAU)
    phase: f64,
}

impl SineOscillator {
    /// Create an oscillator at phase zero
    pub fn new(frequency: f64) -> Self {
        Self {
            frequency,
            phase: 0.0,
        }
    }

    /// Produce the next sample and advance the phase
    pub fn next_sample(&mut self, sample_rate: f64) -> f32 {
        let value = self.phase.sin();
        self.phase = (self.phase + TAU * self.frequency / sample_rate) % TAU;
        value as f32
    }
}

/// Bank of sine oscillators keyed by frequency
#[derive(Debug, Clone)]
pub struct OscillatorBank {
    /// Active voices, keyed by the frequency's bit pattern
    voices: HashMap<u64, SineOscillator>,
    /// Output gain (0.0 - 1.0)
    gain: f32,
    /// Sample rate
    sample_rate: u32,
}

impl OscillatorBank {
    /// Create an empty bank
    pub fn new(sample_rate: u32) -> Self {
        Self {
            voices: HashMap::new(),
            gain: 0.25,
            sample_rate,
        }
    }

    /// Number of sounding voices
    pub fn active_count(&self) -> usize {
        self.voices.len()
    }

    /// Set output gain (0.0 - 1.0)
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.clamp(0.0, 1.0);
    }

    /// Get sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Mix all voices into an interleaved buffer
    pub fn render(&mut self, buffer: &mut [f32], channels: usize) {
        if channels == 0 {
            return;
        }
        let sample_rate = self.sample_rate as f64;

        for frame in buffer.chunks_mut(channels) {
            let mut mixed = 0.0f32;
            for voice in self.voices.values_mut() {
                mixed += voice.next_sample(sample_rate);
            }
            let value = mixed * self.gain;
            for sample in frame.iter_mut() {
                *sample = value;
            }
        }
    }
}

impl Default for OscillatorBank {
    fn default() -> Self {
        Self::new(44100)
    }
}

impl ToneSource for OscillatorBank {
    fn start_tone(&mut self, frequency: f64) {
        // Replacing drops the previous voice for this frequency
        self.voices
            .insert(frequency.to_bits(), SineOscillator::new(frequency));
    }

    fn stop_tone(&mut self, frequency: f64) {
        self.voices.remove(&frequency.to_bits());
    }
}
