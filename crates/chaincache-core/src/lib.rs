//! chaincache-core — polling transaction cache for RISE-style blockchain nodes.
//!
//! # Overview
//!
//! A [`Poller`] asks the active node of a [`NodePool`] for its height on a
//! timer, pulls every transaction since the last committed height and keeps
//! the two latest windows in a [`TransactionCache`]. Failures go through a
//! [`FailurePolicy`](policy::FailurePolicy): one delayed retry per tick, and a
//! switch to the next node after `error_threshold` consecutive failures.
//!
//! - [`NodeClient`] — the async trait every node backend implements
//! - [`QueryFacade`] — never-failing read operations for the HTTP layer
//! - [`PriceWatcher`] — independent timer caching a price document
//! - [`Listener`] — builds all of the above from a [`ListenerConfig`]
//!
//! This crate has no HTTP dependency; `chaincache-http` provides the
//! `reqwest` clients and the `axum` routes.

pub mod address;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod facade;
pub mod listener;
pub mod policy;
pub mod poller;
pub mod pool;
pub mod price;
pub mod schedule;
pub mod types;

#[cfg(test)]
mod mock;

pub use address::Address;
pub use cache::{CacheState, TransactionCache};
pub use client::NodeClient;
pub use config::{ListenerConfig, PollInterval, PollerConfig, PriceConfig, RESERVED_PATHS};
pub use error::{ConfigError, InvalidAddress, TransportError};
pub use facade::{QueryFacade, MAX_ADDRESSES};
pub use listener::Listener;
pub use poller::{PollOutcome, Poller, StatusReport};
pub use pool::NodePool;
pub use price::{PriceSource, PriceWatcher};
pub use types::{
    AccountRecord, Direction, MergeOrder, MergedTransactions, Transaction, TransactionFilter,
    TransactionSnapshot,
};
