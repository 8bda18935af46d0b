//! Failure handling for the refresh cycle.
//!
//! ```text
//! connectivity failure → [FailurePolicy: count / rotate] → [RetryConfig: one delayed retry]
//! ```

pub mod failover;
pub mod retry;

pub use failover::{FailureAction, FailurePolicy};
pub use retry::{Attempt, RetryConfig};
