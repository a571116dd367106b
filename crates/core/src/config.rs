// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Drumline configuration
//!
//! Configs can be built in code or loaded from TOML:
//!
//! ```toml
//! name = "ingest"
//! buffer = 8
//! reset_timeout = "250ms"
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default maximum lead, in beats, of any participant over the draining pace
pub const DEFAULT_BUFFER: usize = 5;

/// Default delay used by `Drumline::schedule_reset`
pub const DEFAULT_RESET_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DrumlineConfig {
    /// Label attached to every log line emitted by the instance
    pub name: String,
    /// Capacity of each participant's credit queue
    ///
    /// 0 is raised to 1, so a lone leader can still get two beats ahead
    /// rather than one.
    pub buffer: usize,
    #[serde(with = "humantime_serde")]
    pub reset_timeout: Duration,
}

impl DrumlineConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer;
        self
    }

    pub fn with_reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }

    /// Parse a config from TOML; missing keys take their defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Queue capacity actually used; bounded channels need at least one slot
    pub(crate) fn effective_buffer(&self) -> usize {
        self.buffer.max(1)
    }
}

impl Default for DrumlineConfig {
    fn default() -> Self {
        Self {
            name: "drumline".to_string(),
            buffer: DEFAULT_BUFFER,
            reset_timeout: DEFAULT_RESET_TIMEOUT,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
