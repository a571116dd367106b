// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! drumline: keeps concurrent tasks advancing in bounded lock-step
//!
//! This crate provides:
//! - [`Drumline`], the coordination primitive: participants register,
//!   advance, and retire; none gets more than `buffer` beats ahead of the
//!   slowest active participant
//! - Scale normalization so heavy and light units of work compare fairly
//! - Immediate and cancellable timed resets
//! - Round checkpoints and statistics for hosts

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod error;
pub mod normalizer;
pub mod reset;
pub mod stats;

mod coordinator;
mod drumline;
mod registry;

pub use config::DrumlineConfig;
pub use drumline::{Advance, Drumline};
pub use error::{DrumlineError, Result};
pub use normalizer::{clamp_scale, step_divisor, BeatNormalizer, DEFAULT_SCALE};
pub use registry::ParticipantId;
pub use reset::ResetTimeout;
pub use stats::{DrumlineStats, ParticipantStats};
