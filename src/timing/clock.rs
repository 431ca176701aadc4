// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Session clock.
//!
//! Measures millisecond offsets from a monotonic anchor. Built on
//! `tokio::time::Instant` so a paused test runtime drives it.

use std::time::Duration;

use tokio::time::Instant;

/// Default capture cadence in milliseconds
pub const DEFAULT_CADENCE_MS: u64 = 50;

/// Monotonic clock anchored at session start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClock {
    anchor: Instant,
}

impl SessionClock {
    /// Start a clock anchored at the current instant
    pub fn start() -> Self {
        Self::anchored_at(Instant::now())
    }

    /// Start a clock anchored at `anchor`
    pub fn anchored_at(anchor: Instant) -> Self {
        Self { anchor }
    }

    /// Whole milliseconds elapsed at `now` (zero if `now` precedes the anchor)
    pub fn elapsed_ms_at(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.anchor).as_millis() as u64
    }

    /// Whole milliseconds elapsed since the anchor
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms_at(Instant::now())
    }

    /// Instant at which `offset_ms` will have elapsed
    pub fn deadline(&self, offset_ms: u64) -> Instant {
        self.anchor + Duration::from_millis(offset_ms)
    }
}
