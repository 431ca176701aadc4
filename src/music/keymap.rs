// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Key map: the static table binding input keys to notes and frequencies.
//!
//! The map is built once and shared read-only (usually behind an `Arc`)
//! by the capture, session and playback layers.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single piano key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Key {
    /// Symbolic pitch name (e.g., "C", "F#")
    pub note: String,
    /// Input identifier that triggers this key (e.g., "A")
    pub binding: String,
    /// Tone frequency in Hz
    pub frequency: f64,
}

impl Key {
    /// Create a new key
    pub fn new(note: impl Into<String>, binding: impl Into<String>, frequency: f64) -> Self {
        Self {
            note: note.into(),
            binding: binding.into(),
            frequency,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) {:.2} Hz", self.note, self.binding, self.frequency)
    }
}

/// Errors raised while building a key map
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KeyMapError {
    /// The table has no keys
    #[error("key map is empty")]
    Empty,
    /// A key has an empty binding
    #[error("key for note {0:?} has an empty binding")]
    EmptyBinding(String),
    /// Two keys share a binding
    #[error("binding {0:?} is used by more than one key")]
    DuplicateBinding(String),
    /// A frequency is zero, negative or not finite
    #[error("key {binding:?} has invalid frequency {frequency}")]
    InvalidFrequency { binding: String, frequency: f64 },
}

/// Lookup table from input binding to key
#[derive(Debug, Clone, PartialEq)]
pub struct KeyMap {
    keys: Vec<Key>,
}

impl KeyMap {
    /// Build a key map, validating every entry
    pub fn new(keys: Vec<Key>) -> Result<Self, KeyMapError> {
        if keys.is_empty() {
            return Err(KeyMapError::Empty);
        }

        let mut seen = HashSet::new();
        for key in &keys {
            if key.binding.trim().is_empty() {
                return Err(KeyMapError::EmptyBinding(key.note.clone()));
            }
            if !key.frequency.is_finite() || key.frequency <= 0.0 {
                return Err(KeyMapError::InvalidFrequency {
                    binding: key.binding.clone(),
                    frequency: key.frequency,
                });
            }
            if !seen.insert(key.binding.to_uppercase()) {
                return Err(KeyMapError::DuplicateBinding(key.binding.clone()));
            }
        }

        Ok(Self { keys })
    }

    /// One octave of white keys from middle C on the home row
    pub fn c_major() -> Self {
        Self {
            keys: vec![
                Key::new("C", "A", 261.63),
                Key::new("D", "S", 293.66),
                Key::new("E", "D", 329.63),
                Key::new("F", "F", 349.23),
                Key::new("G", "G", 392.00),
                Key::new("A", "H", 440.00),
                Key::new("B", "J", 493.88),
                Key::new("C", "K", 523.25),
            ],
        }
    }

    /// Find the key for a binding (case-insensitive)
    pub fn find(&self, binding: &str) -> Option<&Key> {
        self.keys
            .iter()
            .find(|k| k.binding.eq_ignore_ascii_case(binding))
    }

    /// Frequency for a binding, if bound
    pub fn frequency(&self, binding: &str) -> Option<f64> {
        self.find(binding).map(|k| k.frequency)
    }

    /// Canonical spelling of a binding as it appears in the table
    pub fn canonical(&self, binding: &str) -> Option<&str> {
        self.find(binding).map(|k| k.binding.as_str())
    }

    /// All keys in table order
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True if the map has no keys
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::c_major()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let map = KeyMap::default();
        assert_eq!(map.len(), 8);
        assert_eq!(map.keys()[0].note, "C");
        assert_eq!(map.keys()[7].binding, "K");
        assert_eq!(map.frequency("H"), Some(440.0));
    }

    #[test]
    fn test_find_is_case_insensitive() {
        let map = KeyMap::c_major();
        assert_eq!(map.find("a").map(|k| k.note.as_str()), Some("C"));
        assert_eq!(map.canonical("j"), Some("J"));
        assert!(map.find("Z").is_none());
    }

    #[test]
    fn test_rejects_duplicate_binding() {
        let keys = vec![Key::new("C", "A", 261.63), Key::new("D", "a", 293.66)];
        assert_eq!(
            KeyMap::new(keys),
            Err(KeyMapError::DuplicateBinding("a".to_string()))
        );
    }

    #[test]
    fn test_rejects_bad_frequency() {
        let keys = vec![Key::new("C", "A", 0.0)];
        assert!(matches!(
            KeyMap::new(keys),
            Err(KeyMapError::InvalidFrequency { .. })
        ));

        let keys = vec![Key::new("C", "A", f64::NAN)];
        assert!(KeyMap::new(keys).is_err());
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(KeyMap::new(Vec::new()), Err(KeyMapError::Empty));
        assert_eq!(
            KeyMap::new(vec![Key::new("C", " ", 261.63)]),
            Err(KeyMapError::EmptyBinding("C".to_string()))
        );
    }

    #[test]
    fn test_key_display() {
        let key = Key::new("A", "H", 440.0);
        assert_eq!(key.to_string(), "A (H) 440.00 Hz");
    }
}
