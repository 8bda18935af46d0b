//! Consecutive-failure counter that rotates the node pool at a threshold.
//!
//! On every connectivity failure:
//! - the counter is incremented
//! - at `error_threshold` (and with rotation enabled) the pool moves to the
//!   next node and the counter resets to 0
//! - a first attempt asks for exactly one retry after `RetryConfig::delay()`
//! - a retry gives up until the next tick
//!
//! Any success resets the counter without rotating.

use std::time::Duration;

use crate::pool::NodePool;

use super::retry::{Attempt, RetryConfig};

/// What the caller should do after a recorded failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureAction {
    /// Index of the newly active node, if the pool rotated.
    pub rotated_to: Option<usize>,
    /// Delay before the single retry, or `None` to wait for the next tick.
    pub retry_after: Option<Duration>,
}

/// Failure bookkeeping for one poller.
#[derive(Debug, Clone)]
pub struct FailurePolicy {
    error_threshold: u32,
    rotate_nodes: bool,
    retry: RetryConfig,
    consecutive_errors: u32,
}

impl FailurePolicy {
    pub fn new(error_threshold: u32, rotate_nodes: bool, retry: RetryConfig) -> Self {
        Self {
            error_threshold,
            rotate_nodes,
            retry,
            consecutive_errors: 0,
        }
    }

    /// Current number of consecutive failures.
    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    pub fn error_threshold(&self) -> u32 {
        self.error_threshold
    }

    /// Record a successful node call.
    pub fn record_success(&mut self) {
        self.consecutive_errors = 0;
    }

    /// Record a connectivity failure and decide on rotation and retry.
    pub fn record_failure(&mut self, attempt: Attempt, pool: &NodePool) -> FailureAction {
        self.consecutive_errors += 1;

        let mut rotated_to = None;
        if self.rotate_nodes && self.consecutive_errors >= self.error_threshold {
            let next = pool.rotate();
            tracing::warn!(
                threshold = self.error_threshold,
                node = %pool.active_url(),
                "consecutive error threshold reached; rotated node"
            );
            self.consecutive_errors = 0;
            rotated_to = Some(next);
        }

        let retry_after = match attempt {
            Attempt::First => Some(self.retry.delay()),
            Attempt::Retry => None,
        };

        FailureAction {
            rotated_to,
            retry_after,
        }
    }
}
