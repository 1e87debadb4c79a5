//! Coalescing of layout recomputation.
//!
//! Every delta pushes a single pending deadline out: bursts of adds settle
//! `bulk_delay` after the last add, removals and updates `change_delay` after
//! the last one. Only the latest deadline counts.

use std::time::Duration;

use tokio::time::{Instant, sleep_until};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// An event was added; more usually follow.
    Bulk,
    /// A removal or update.
    Single,
}

#[derive(Debug, Clone)]
pub struct RelayoutQueue {
    bulk_delay: Duration,
    change_delay: Duration,
    deadline: Option<Instant>,
}

impl RelayoutQueue {
    pub fn new(bulk_delay: Duration, change_delay: Duration) -> Self {
        RelayoutQueue {
            bulk_delay,
            change_delay,
            deadline: None,
        }
    }

    pub fn schedule(&mut self, change: Change) {
        let delay = match change {
            Change::Bulk => self.bulk_delay,
            Change::Single => self.change_delay,
        };
        self.deadline = Some(Instant::now() + delay);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consume the pending relayout if its quiet period has passed.
    pub fn take_due(&mut self) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Wait out the quiet period. Returns false if nothing was pending.
    pub async fn settle(&mut self) -> bool {
        match self.deadline.take() {
            Some(deadline) => {
                sleep_until(deadline).await;
                true
            }
            None => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}
