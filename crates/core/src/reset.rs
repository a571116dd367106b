// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellable timed resets
//!
//! `Drumline::reset_after` hands the caller a [`ResetTimeout`]. When the
//! timer elapses, the reset only goes ahead if somebody is awaiting
//! [`ResetTimeout::fired`] at that instant. Not listening (or dropping the
//! handle) is how a timed reset is cancelled.
//!
//! Delivery is claimed while a listener is present and then applied. A
//! listener that gives up between the two still counts as delivered: the
//! reset happens, [`ResetTimeout::has_fired`] turns true once it is applied,
//! and awaiting `fired` again resolves immediately.

use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct SlotState {
    listeners: usize,
    claimed: bool,
    fired: bool,
}

#[derive(Debug, Default)]
struct Slot {
    state: Mutex<SlotState>,
    notify: Notify,
}

impl Slot {
    fn state(&self) -> std::sync::MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Caller's half of a timed reset
#[derive(Debug)]
pub struct ResetTimeout {
    slot: Arc<Slot>,
}

/// Timer task's half of a timed reset
#[derive(Debug)]
pub(crate) struct ResetTrigger {
    slot: Arc<Slot>,
}

pub(crate) fn reset_timeout() -> (ResetTimeout, ResetTrigger) {
    let slot = Arc::new(Slot::default());
    (
        ResetTimeout {
            slot: Arc::clone(&slot),
        },
        ResetTrigger { slot },
    )
}

/// Counts an active `fired` call for as long as it is being awaited
struct Listening<'a> {
    slot: &'a Slot,
}

impl Drop for Listening<'_> {
    fn drop(&mut self) {
        let mut state = self.slot.state();
        state.listeners = state.listeners.saturating_sub(1);
    }
}

impl ResetTimeout {
    /// Wait for the timer to fire. Resolves once the reset has been applied.
    ///
    /// Only a caller that is waiting here when the timer elapses receives the
    /// notification; if nobody is, the reset is cancelled and this future
    /// never resolves.
    pub async fn fired(&self) {
        loop {
            let notified = self.slot.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let _listening = {
                let mut state = self.slot.state();
                if state.fired {
                    return;
                }
                state.listeners += 1;
                Listening { slot: &self.slot }
            };
            notified.await;
        }
    }

    /// Whether the timer delivered its notification and the reset was applied
    pub fn has_fired(&self) -> bool {
        self.slot.state().fired
    }
}

impl ResetTrigger {
    /// Claim delivery. True only when a caller is awaiting `fired` right now.
    pub(crate) fn fire(&self) -> bool {
        let mut state = self.slot.state();
        if state.listeners == 0 {
            return false;
        }
        state.claimed = true;
        true
    }

    /// Mark a claimed reset as applied and release the callers in `fired`
    pub(crate) fn complete(self) {
        {
            let mut state = self.slot.state();
            if !state.claimed {
                return;
            }
            state.fired = true;
        }
        self.slot.notify.notify_waiters();
    }
}

#[cfg(test)]
#[path = "reset_tests.rs"]
mod tests;
