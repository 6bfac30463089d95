// SPDX-License-Identifier: MIT

//! Mutation observer: debounced batching of tree diffs.
//!
//! Interactive prompt libraries redraw several lines per keystroke, each
//! arriving as its own write. Delivering every diff individually would wake
//! waiters on transient partial states, so mutations accumulate until
//! [`Config::error_debounce_timeout`](crate::Config) elapses with no new
//! mutation, then flush as one batch.
//!
//! Delivery uses a tokio broadcast channel: every subscriber receives every
//! batch flushed after it subscribed, in frame order, with no replay of
//! history. Unsubscribing is dropping the receiver; tearing down the sender
//! (on cleanup) makes all receivers observe closure.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::tree::Mutation;

/// One flushed batch of mutations, in the order the frames were produced.
#[derive(Debug, Clone)]
pub struct MutationBatch {
    /// Monotonic batch number within one render.
    pub seq: u64,
    pub mutations: Vec<Mutation>,
}

/// Receiver half of a mutation subscription.
pub type BatchReceiver = broadcast::Receiver<Arc<MutationBatch>>;

pub(crate) type BatchSender = broadcast::Sender<Arc<MutationBatch>>;

pub(crate) fn channel() -> BatchSender {
    // Waiters that fall behind see a Lagged error and simply re-evaluate,
    // so a modest buffer is enough.
    broadcast::channel(64).0
}

/// Timer-armed accumulator implementing the debounce window.
///
/// Each push resets the deadline; the pump flushes when the deadline
/// passes with nothing new arriving.
pub(crate) struct Debouncer {
    window: Duration,
    pending: Vec<Mutation>,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: Vec::new(),
            deadline: None,
        }
    }

    /// Accumulate mutations and re-arm the timer. Empty pushes are ignored
    /// so frames with no visible change never schedule a flush.
    pub fn push(&mut self, mutations: Vec<Mutation>) {
        if mutations.is_empty() {
            return;
        }
        self.pending.extend(mutations);
        self.deadline = Some(Instant::now() + self.window);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drain the accumulated mutations as one batch, disarming the timer.
    /// The session assigns the batch its sequence number on publish.
    pub fn take_batch(&mut self) -> Option<Vec<Mutation>> {
        self.deadline = None;
        if self.pending.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.pending))
    }
}

#[cfg(test)]
#[path = "observer_tests.rs"]
mod tests;
