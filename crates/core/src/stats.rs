// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Point-in-time statistics for a drumline

use crate::registry::{ParticipantId, Registry};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParticipantStats {
    pub id: ParticipantId,
    pub scale: u64,
    pub step_divisor: u64,
    /// Raw advance calls counted toward the next beat
    pub sub_beats: u64,
    /// Beats deposited but not yet drained by the coordinator
    pub pending: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DrumlineStats {
    pub name: String,
    pub buffer: usize,
    /// Rounds the coordinator has completed
    pub rounds: u64,
    /// None until a participant registers
    pub min_scale: Option<u64>,
    pub participants: Vec<ParticipantStats>,
    pub retired: Vec<ParticipantId>,
    pub closed: bool,
}

impl DrumlineStats {
    /// Collect statistics from a registry snapshot
    pub(crate) fn collect(name: &str, registry: &Registry, rounds: u64, closed: bool) -> Self {
        let participants = registry
            .participants()
            .map(|(id, p)| ParticipantStats {
                id,
                scale: p.scale,
                step_divisor: p.normalizer.step_divisor(),
                sub_beats: p.normalizer.sub_beats(),
                pending: p.pending(),
            })
            .collect();

        Self {
            name: name.to_string(),
            buffer: registry.buffer(),
            rounds,
            min_scale: registry.min_scale(),
            participants,
            retired: registry.retired().collect(),
            closed,
        }
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&ParticipantStats> {
        self.participants.iter().find(|p| p.id == id)
    }

    /// Total beats waiting across every participant
    pub fn total_pending(&self) -> usize {
        self.participants.iter().map(|p| p.pending).sum()
    }
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
