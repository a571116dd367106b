// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Participant registry
//!
//! Tracks every participant's scale, beat normalizer, credit queue and reset
//! signal. The registry lives behind the drumline's read/write lock; the
//! receiving half of each credit queue is handed to the coordinator.

use crate::normalizer::{clamp_scale, step_divisor, BeatNormalizer};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};

/// Caller-chosen participant handle
pub type ParticipantId = u64;

/// Receiving half of a participant's credit queue
pub(crate) type CreditReceiver = mpsc::Receiver<()>;

/// Registered participant
#[derive(Debug)]
pub(crate) struct Participant {
    pub(crate) scale: u64,
    pub(crate) normalizer: BeatNormalizer,
    pub(crate) credits: mpsc::Sender<()>,
    /// Wakes an `advance` call that is currently waiting on a full queue
    pub(crate) reset: Arc<Notify>,
}

impl Participant {
    /// Credits deposited but not yet drained
    pub(crate) fn pending(&self) -> usize {
        self.credits.max_capacity() - self.credits.capacity()
    }
}

#[derive(Debug)]
pub(crate) struct Registry {
    buffer: usize,
    /// `u64::MAX` until the first registration
    min_scale: u64,
    participants: BTreeMap<ParticipantId, Participant>,
    retired: BTreeSet<ParticipantId>,
}

impl Registry {
    pub(crate) fn new(buffer: usize) -> Self {
        Self {
            buffer: buffer.max(1),
            min_scale: u64::MAX,
            participants: BTreeMap::new(),
            retired: BTreeSet::new(),
        }
    }

    pub(crate) fn buffer(&self) -> usize {
        self.buffer
    }

    pub(crate) fn min_scale(&self) -> Option<u64> {
        (self.min_scale != u64::MAX).then_some(self.min_scale)
    }

    pub(crate) fn get(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.get(&id)
    }

    pub(crate) fn participants(
        &self,
    ) -> impl Iterator<Item = (ParticipantId, &Participant)> + '_ {
        self.participants.iter().map(|(id, p)| (*id, p))
    }

    pub(crate) fn is_retired(&self, id: ParticipantId) -> bool {
        self.retired.contains(&id)
    }

    pub(crate) fn retired(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        self.retired.iter().copied()
    }

    /// Add or overwrite a participant, returning the receiving half of its
    /// fresh credit queue.
    ///
    /// A smaller scale than any seen so far lowers the minimum and rescales
    /// every registered participant, not just the new one.
    pub(crate) fn register(&mut self, id: ParticipantId, scale: u64) -> CreditReceiver {
        let scale = clamp_scale(scale);
        if scale < self.min_scale {
            self.min_scale = scale;
            for participant in self.participants.values_mut() {
                let divisor = step_divisor(participant.scale, scale);
                participant.normalizer.set_step_divisor(divisor);
            }
        }

        let (credits, receiver) = mpsc::channel(self.buffer);
        self.retired.remove(&id);
        self.participants.insert(
            id,
            Participant {
                scale,
                normalizer: BeatNormalizer::new(step_divisor(scale, self.min_scale)),
                credits,
                reset: Arc::new(Notify::new()),
            },
        );
        receiver
    }

    /// Replace every participant's credit queue with an empty one of the same
    /// capacity and discard partial sub-beat progress.
    ///
    /// Callers still waiting on an old queue stay parked until its receiver
    /// is dropped or their reset signal fires.
    pub(crate) fn reinitialize(&mut self) -> Vec<(ParticipantId, CreditReceiver)> {
        let buffer = self.buffer;
        self.participants
            .iter_mut()
            .map(|(id, participant)| {
                let (credits, receiver) = mpsc::channel(buffer);
                participant.credits = credits;
                participant.normalizer.clear();
                (*id, receiver)
            })
            .collect()
    }

    /// Remove a participant from the active set and remember it as retired
    pub(crate) fn retire(&mut self, id: ParticipantId) -> Option<Participant> {
        self.retired.insert(id);
        self.participants.remove(&id)
    }

    pub(crate) fn reset_signals(&self) -> Vec<(ParticipantId, Arc<Notify>)> {
        self.participants
            .iter()
            .map(|(id, p)| (*id, Arc::clone(&p.reset)))
            .collect()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
