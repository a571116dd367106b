// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator loop
//!
//! A single background task per drumline. Each round it visits every active
//! participant in ascending id order and waits for one credit from it before
//! moving on, which is what bounds how far ahead any participant can get.
//! While waiting it also services enlistments, retirements, reset broadcasts
//! and shutdown.
//!
//! Queued control events are applied before each visit, so a participant
//! whose registration returned before a round reaches its id is part of that
//! round.

use crate::registry::{CreditReceiver, ParticipantId, Registry};
use std::collections::BTreeMap;
use std::ops::{Bound, ControlFlow};
use std::sync::{Arc, RwLock};
use tokio::sync::{mpsc, oneshot, watch};

/// Events delivered to the coordinator outside the credit queues
#[derive(Debug)]
pub(crate) enum Control {
    /// Install (or replace) a participant's credit queue
    Enlist {
        id: ParticipantId,
        credits: CreditReceiver,
    },
    /// Drop a participant from every future round; `ack` fires once accepted
    Retire {
        id: ParticipantId,
        ack: oneshot::Sender<()>,
    },
}

/// Sending halves held by the drumline
#[derive(Debug)]
pub(crate) struct CoordinatorHandle {
    pub(crate) control: mpsc::UnboundedSender<Control>,
    /// One slot: a broadcast request that finds it full is dropped
    pub(crate) resets: mpsc::Sender<()>,
    pub(crate) shutdown: oneshot::Sender<()>,
    pub(crate) rounds: watch::Receiver<u64>,
}

#[derive(Debug)]
enum Wake {
    Credit,
    QueueClosed,
    Control(Control),
    Reset,
    Shutdown,
}

#[derive(Debug)]
pub(crate) struct Coordinator {
    name: String,
    registry: Arc<RwLock<Registry>>,
    active: BTreeMap<ParticipantId, CreditReceiver>,
    control: mpsc::UnboundedReceiver<Control>,
    resets: mpsc::Receiver<()>,
    shutdown: oneshot::Receiver<()>,
    rounds: watch::Sender<u64>,
}

impl Coordinator {
    pub(crate) fn new(
        name: impl Into<String>,
        registry: Arc<RwLock<Registry>>,
    ) -> (Self, CoordinatorHandle) {
        let (control_tx, control) = mpsc::unbounded_channel();
        let (resets_tx, resets) = mpsc::channel(1);
        let (shutdown_tx, shutdown) = oneshot::channel();
        let (rounds, rounds_rx) = watch::channel(0);

        let coordinator = Self {
            name: name.into(),
            registry,
            active: BTreeMap::new(),
            control,
            resets,
            shutdown,
            rounds,
        };
        let handle = CoordinatorHandle {
            control: control_tx,
            resets: resets_tx,
            shutdown: shutdown_tx,
            rounds: rounds_rx,
        };
        (coordinator, handle)
    }

    /// Run rounds until shutdown is signalled or the drumline is dropped
    pub(crate) async fn run(mut self) {
        tracing::debug!(drumline = %self.name, "coordinator started");

        'rounds: loop {
            self.apply_pending();
            if self.active.is_empty() {
                if self.idle().await.is_break() {
                    break;
                }
                continue;
            }

            let mut visited = None;
            while let Some(id) = self.next_after(visited) {
                if self.drain(id).await.is_break() {
                    break 'rounds;
                }
                visited = Some(id);
                self.apply_pending();
            }

            self.rounds.send_modify(|round| *round += 1);
            tracing::trace!(drumline = %self.name, round = *self.rounds.borrow(), "round complete");
        }

        tracing::debug!(drumline = %self.name, "coordinator stopped");
    }

    /// Next active id after `visited` in this round
    fn next_after(&self, visited: Option<ParticipantId>) -> Option<ParticipantId> {
        let lower = match visited {
            Some(id) => Bound::Excluded(id),
            None => Bound::Unbounded,
        };
        self.active
            .range((lower, Bound::Unbounded))
            .next()
            .map(|(id, _)| *id)
    }

    /// Apply every control event already queued without waiting
    fn apply_pending(&mut self) {
        while let Ok(control) = self.control.try_recv() {
            self.apply(control);
        }
    }

    fn apply(&mut self, control: Control) {
        match control {
            Control::Enlist { id, credits } => self.enlist(id, credits),
            Control::Retire { id, ack } => self.retire(id, ack),
        }
    }

    /// Nobody to drain: wait for control events only
    async fn idle(&mut self) -> ControlFlow<()> {
        let wake = tokio::select! {
            biased;
            _ = &mut self.shutdown => Wake::Shutdown,
            Some(control) = self.control.recv() => Wake::Control(control),
            Some(()) = self.resets.recv() => Wake::Reset,
        };
        self.handle(wake).await
    }

    /// Wait until `id` yields one credit, leaves the active set, or shutdown
    async fn drain(&mut self, id: ParticipantId) -> ControlFlow<()> {
        loop {
            let wake = {
                let Some(credits) = self.active.get_mut(&id) else {
                    return ControlFlow::Continue(());
                };
                tokio::select! {
                    biased;
                    _ = &mut self.shutdown => Wake::Shutdown,
                    Some(control) = self.control.recv() => Wake::Control(control),
                    Some(()) = self.resets.recv() => Wake::Reset,
                    credit = credits.recv() => match credit {
                        Some(()) => Wake::Credit,
                        None => Wake::QueueClosed,
                    },
                }
            };

            match wake {
                Wake::Credit => return ControlFlow::Continue(()),
                Wake::QueueClosed => {
                    // Every sender is gone; a pending enlistment reinstalls it
                    tracing::debug!(drumline = %self.name, participant = id, "credit queue closed");
                    self.active.remove(&id);
                }
                other => {
                    if self.handle(other).await.is_break() {
                        return ControlFlow::Break(());
                    }
                }
            }
        }
    }

    async fn handle(&mut self, wake: Wake) -> ControlFlow<()> {
        match wake {
            Wake::Shutdown => return ControlFlow::Break(()),
            Wake::Control(control) => self.apply(control),
            Wake::Reset => self.broadcast_reset().await,
            Wake::Credit | Wake::QueueClosed => {}
        }
        ControlFlow::Continue(())
    }

    fn enlist(&mut self, id: ParticipantId, credits: CreditReceiver) {
        let retired = self
            .registry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_retired(id);
        if retired {
            tracing::debug!(drumline = %self.name, participant = id, "ignoring enlistment of retired participant");
            return;
        }
        self.active.insert(id, credits);
    }

    fn retire(&mut self, id: ParticipantId, ack: oneshot::Sender<()>) {
        self.active.remove(&id);
        let removed = self
            .registry
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retire(id);
        // Dropping the record closes its queue, releasing any stray waiter
        drop(removed);

        tracing::info!(
            drumline = %self.name,
            participant = id,
            remaining = self.active.len(),
            "participant retired"
        );
        let _ = ack.send(());
    }

    /// Best-effort wake of every active participant that is parked on a full
    /// queue. Participants that are not waiting simply miss it.
    async fn broadcast_reset(&mut self) {
        let signals = {
            let registry = self.registry.read().unwrap_or_else(|e| e.into_inner());
            registry.reset_signals()
        };

        tracing::debug!(drumline = %self.name, participants = signals.len(), "broadcasting reset");
        for (id, signal) in signals {
            if !self.active.contains_key(&id) {
                continue;
            }
            signal.notify_waiters();
            tokio::task::yield_now().await;
        }
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
