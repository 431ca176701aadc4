// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Timing module.
//!
//! Monotonic session clocks shared by capture and playback.

pub mod clock;

pub use clock::{SessionClock, DEFAULT_CADENCE_MS};
