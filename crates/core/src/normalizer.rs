// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Beat normalization
//!
//! Participants doing heavier units of work register a larger scale. A raw
//! advance call only counts as one beat once `scale / min_scale` calls have
//! accumulated, so heterogeneous participants are compared on equal footing.

use std::sync::atomic::{AtomicU64, Ordering};

/// Scale used by `Drumline::register`
pub const DEFAULT_SCALE: u64 = 1;

/// Scales below one are treated as one
pub fn clamp_scale(scale: u64) -> u64 {
    scale.max(1)
}

/// Raw calls per normalized beat for `scale` relative to the smallest
/// registered scale
pub fn step_divisor(scale: u64, min_scale: u64) -> u64 {
    (scale / min_scale.max(1)).max(1)
}

/// Per-participant sub-beat counter
///
/// The divisor only changes under the registry's write lock; ticking is
/// atomic so concurrent readers may advance the counter.
#[derive(Debug)]
pub struct BeatNormalizer {
    step_divisor: u64,
    sub_beats: AtomicU64,
}

impl BeatNormalizer {
    pub fn new(step_divisor: u64) -> Self {
        Self {
            step_divisor: step_divisor.max(1),
            sub_beats: AtomicU64::new(0),
        }
    }

    pub fn step_divisor(&self) -> u64 {
        self.step_divisor
    }

    pub(crate) fn set_step_divisor(&mut self, step_divisor: u64) {
        self.step_divisor = step_divisor.max(1);
    }

    /// Raw calls counted toward the next beat
    pub fn sub_beats(&self) -> u64 {
        self.sub_beats.load(Ordering::Acquire)
    }

    /// Count one raw call. Returns true when it completes a beat, in which
    /// case the counter wraps back to zero.
    pub fn tick(&self) -> bool {
        let divisor = self.step_divisor;
        let previous = self
            .sub_beats
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                Some(if n + 1 >= divisor { 0 } else { n + 1 })
            })
            .unwrap_or_else(|n| n);
        previous + 1 >= divisor
    }

    pub(crate) fn clear(&self) {
        self.sub_beats.store(0, Ordering::Release);
    }
}

#[cfg(test)]
#[path = "normalizer_tests.rs"]
mod tests;
