// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The drumline primitive
//!
//! A [`Drumline`] keeps a dynamic set of tasks in approximate lock-step: no
//! participant gets more than `buffer` normalized beats ahead of the slowest
//! active participant. Every operation must run inside a Tokio runtime; the
//! coordinator task is spawned on the first registration.

use crate::config::DrumlineConfig;
use crate::coordinator::{Control, Coordinator};
use crate::error::{DrumlineError, Result};
use crate::normalizer::DEFAULT_SCALE;
use crate::registry::{ParticipantId, Registry};
use crate::reset::{reset_timeout, ResetTimeout};
use crate::stats::DrumlineStats;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// Outcome of a single [`Drumline::advance`] call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advance {
    /// Counted toward the next beat; scaled participants need several calls
    Partial,
    /// A full beat was recorded
    Beat,
    /// Released by a reset while waiting; no beat was recorded
    Reset,
    /// The participant has retired; the call was discarded
    Retired,
}

/// State shared with the coordinator and reset timers
#[derive(Debug)]
struct Shared {
    config: DrumlineConfig,
    registry: Arc<RwLock<Registry>>,
    control: mpsc::UnboundedSender<Control>,
    resets: mpsc::Sender<()>,
    rounds: watch::Receiver<u64>,
    closed: AtomicBool,
}

impl Shared {
    fn read_registry(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_registry(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(|e| e.into_inner())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Empty every credit queue and ask the coordinator to wake waiters
    fn resync(&self) {
        let participants = {
            let mut registry = self.write_registry();
            let fresh = registry.reinitialize();
            let count = fresh.len();
            // Enlist under the lock so queues are installed in registry order
            for (id, credits) in fresh {
                let _ = self.control.send(Control::Enlist { id, credits });
            }
            count
        };

        match self.resets.try_send(()) {
            Ok(()) => {}
            Err(TrySendError::Full(())) => {
                tracing::debug!(drumline = %self.config.name, "reset broadcast already pending");
            }
            Err(TrySendError::Closed(())) => {
                tracing::debug!(drumline = %self.config.name, "coordinator gone, reset broadcast dropped");
            }
        }
        tracing::info!(drumline = %self.config.name, participants, "drumline resynchronized");
    }
}

#[derive(Debug)]
struct Lifecycle {
    /// Coordinator waiting for the first registration
    pending: Option<Coordinator>,
    task: Option<JoinHandle<()>>,
    /// Taken by `close`
    shutdown: Option<oneshot::Sender<()>>,
}

/// Bounded-lead synchronization primitive
///
/// Share it between tasks by reference (typically `Arc<Drumline>`). Dropping
/// the last handle stops the coordinator even without [`Drumline::close`].
#[derive(Debug)]
pub struct Drumline {
    shared: Arc<Shared>,
    lifecycle: Mutex<Lifecycle>,
}

impl Drumline {
    /// Create a drumline allowing participants to lead by `buffer` beats
    ///
    /// The participant the coordinator is currently waiting on has one credit
    /// drained already, so it gets at most `buffer + 1` calls through before
    /// blocking. A `buffer` of 0 behaves as 1: a lead of up to two calls.
    pub fn new(buffer: usize) -> Self {
        Self::with_config(DrumlineConfig::default().with_buffer(buffer))
    }

    pub fn with_config(config: DrumlineConfig) -> Self {
        if config.buffer == 0 {
            tracing::warn!(drumline = %config.name, "buffer of 0 raised to 1");
        }
        let registry = Arc::new(RwLock::new(Registry::new(config.effective_buffer())));
        let (coordinator, handle) = Coordinator::new(config.name.clone(), Arc::clone(&registry));

        Self {
            shared: Arc::new(Shared {
                config,
                registry,
                control: handle.control,
                resets: handle.resets,
                rounds: handle.rounds,
                closed: AtomicBool::new(false),
            }),
            lifecycle: Mutex::new(Lifecycle {
                pending: Some(coordinator),
                task: None,
                shutdown: Some(handle.shutdown),
            }),
        }
    }

    pub fn config(&self) -> &DrumlineConfig {
        &self.shared.config
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Register a participant with the default scale
    pub fn register(&self, id: ParticipantId) -> Result<()> {
        self.register_scaled(id, DEFAULT_SCALE)
    }

    /// Register a participant whose units of work weigh `scale`
    ///
    /// Registering an existing id overwrites it; a retired id becomes active
    /// again. Must not race an in-flight `advance` for the same id.
    pub fn register_scaled(&self, id: ParticipantId, scale: u64) -> Result<()> {
        if self.is_closed() {
            return Err(DrumlineError::Closed);
        }

        {
            let mut registry = self.shared.write_registry();
            let credits = registry.register(id, scale);
            let _ = self.shared.control.send(Control::Enlist { id, credits });

            tracing::debug!(
                drumline = %self.shared.config.name,
                participant = id,
                scale,
                min_scale = ?registry.min_scale(),
                "participant registered"
            );
        }

        self.start();
        Ok(())
    }

    fn start(&self) {
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
        if lifecycle.shutdown.is_none() {
            return;
        }
        if let Some(coordinator) = lifecycle.pending.take() {
            lifecycle.task = Some(tokio::spawn(coordinator.run()));
        }
    }

    /// Count one unit of work for `id`
    ///
    /// Suspends while the participant is `buffer` beats ahead of the
    /// coordinator's draining pace. A reset releases the wait without
    /// recording the beat.
    pub async fn advance(&self, id: ParticipantId) -> Result<Advance> {
        let (credits, reset) = {
            let registry = self.shared.read_registry();
            if registry.is_retired(id) {
                return Ok(Advance::Retired);
            }
            let participant = registry
                .get(id)
                .ok_or(DrumlineError::UnknownParticipant(id))?;
            if !participant.normalizer.tick() {
                return Ok(Advance::Partial);
            }
            (participant.credits.clone(), Arc::clone(&participant.reset))
        };

        let released = reset.notified();
        tokio::select! {
            biased;
            sent = credits.send(()) => match sent {
                Ok(()) => Ok(Advance::Beat),
                Err(_) => self.released(id),
            },
            _ = released => Ok(Advance::Reset),
        }
    }

    /// Classify a deposit whose queue was torn down underneath it
    fn released(&self, id: ParticipantId) -> Result<Advance> {
        if self.is_closed() {
            return Err(DrumlineError::Closed);
        }
        if self.shared.read_registry().is_retired(id) {
            Ok(Advance::Retired)
        } else {
            Ok(Advance::Reset)
        }
    }

    /// Retire a participant; it stops counting toward every future round
    ///
    /// Waits until the coordinator has accepted the retirement. Retiring an
    /// already retired participant is a no-op.
    pub async fn done(&self, id: ParticipantId) -> Result<()> {
        if self.is_closed() {
            return Err(DrumlineError::Closed);
        }
        {
            let registry = self.shared.read_registry();
            if registry.is_retired(id) {
                return Ok(());
            }
            if registry.get(id).is_none() {
                return Err(DrumlineError::UnknownParticipant(id));
            }
        }

        let (ack, accepted) = oneshot::channel();
        self.shared
            .control
            .send(Control::Retire { id, ack })
            .map_err(|_| DrumlineError::Closed)?;
        accepted.await.map_err(|_| DrumlineError::Closed)
    }

    /// Resynchronize every participant to zero right away
    pub fn reset_now(&self) {
        if self.is_closed() {
            return;
        }
        self.shared.resync();
    }

    /// Schedule a resynchronization after `delay`
    ///
    /// The reset only happens if the caller is awaiting
    /// [`ResetTimeout::fired`] when the delay elapses; otherwise it is
    /// cancelled. Returns `None` once the drumline is closed.
    pub fn reset_after(&self, delay: Duration) -> Option<ResetTimeout> {
        if self.is_closed() {
            return None;
        }

        let (timeout, trigger) = reset_timeout();
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if shared.is_closed() {
                return;
            }
            if trigger.fire() {
                shared.resync();
                trigger.complete();
            } else {
                tracing::debug!(drumline = %shared.config.name, ?delay, "timed reset cancelled");
            }
        });
        Some(timeout)
    }

    /// [`Drumline::reset_after`] using the configured reset timeout
    pub fn schedule_reset(&self) -> Option<ResetTimeout> {
        self.reset_after(self.shared.config.reset_timeout)
    }

    /// Rounds completed by the coordinator so far
    pub fn rounds(&self) -> u64 {
        *self.shared.rounds.borrow()
    }

    /// Wait until the coordinator has completed at least `round` rounds
    pub async fn checkpoint(&self, round: u64) -> Result<()> {
        let mut rounds = self.shared.rounds.clone();
        rounds
            .wait_for(|completed| *completed >= round)
            .await
            .map(|_| ())
            .map_err(|_| DrumlineError::Closed)
    }

    pub fn stats(&self) -> DrumlineStats {
        let rounds = self.rounds();
        let registry = self.shared.read_registry();
        DrumlineStats::collect(&self.shared.config.name, &registry, rounds, self.is_closed())
    }

    /// Stop the coordinator and wait for it to exit
    ///
    /// Participants waiting in `advance` are released with
    /// [`DrumlineError::Closed`]. Closing twice returns
    /// [`DrumlineError::AlreadyClosed`].
    pub async fn close(&self) -> Result<()> {
        let (shutdown, task) = {
            let mut lifecycle = self.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
            let shutdown = lifecycle
                .shutdown
                .take()
                .ok_or(DrumlineError::AlreadyClosed)?;
            lifecycle.pending = None;
            (shutdown, lifecycle.task.take())
        };
        self.shared.closed.store(true, Ordering::Release);
        let _ = shutdown.send(());

        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(drumline = %self.shared.config.name, error = %e, "coordinator task failed");
            }
        }
        tracing::info!(drumline = %self.shared.config.name, "drumline closed");
        Ok(())
    }
}

#[cfg(test)]
#[path = "drumline_tests.rs"]
mod tests;
