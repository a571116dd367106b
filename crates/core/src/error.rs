// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for drumline operations

use crate::registry::ParticipantId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DrumlineError {
    #[error("participant not registered: {0}")]
    UnknownParticipant(ParticipantId),
    #[error("drumline is closed")]
    Closed,
    #[error("drumline was already closed")]
    AlreadyClosed,
    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DrumlineError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
