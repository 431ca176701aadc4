// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Musical reference data for the piano.
//!
//! This module provides the key map that ties input bindings to note
//! names and tone frequencies.

pub mod keymap;

pub use keymap::{Key, KeyMap, KeyMapError};
