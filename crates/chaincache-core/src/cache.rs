//! Two-window transaction cache.
//!
//! Holds the two most recent accepted polling results (`current` and
//! `previous`) plus the last non-empty one. Reads merge the two windows so a
//! client that missed a tick still sees the transactions it skipped.
//!
//! The poller is the only writer. Writes swap in already-fetched data under a
//! short write lock; no lock is held across network calls, so reads always
//! return the last committed state without waiting on a poll.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::types::{MergeOrder, MergedTransactions, TransactionSnapshot};

/// Everything the cache remembers between polling cycles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheState {
    pub current: TransactionSnapshot,
    pub previous: TransactionSnapshot,
    pub last_non_empty: TransactionSnapshot,
    /// Height of the last committed poll. Never decreases.
    pub last_height_checked: u64,
    /// When the last refresh attempt started, successful or not.
    pub last_checked_at: Option<DateTime<Utc>>,
}

/// Thread-safe owner of one [`CacheState`].
#[derive(Debug, Default)]
pub struct TransactionCache {
    state: RwLock<CacheState>,
}

impl TransactionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the start of a refresh attempt.
    pub fn mark_checked(&self, at: DateTime<Utc>) {
        self.write().last_checked_at = Some(at);
    }

    pub fn last_height_checked(&self) -> u64 {
        self.read().last_height_checked
    }

    pub fn last_checked_at(&self) -> Option<DateTime<Utc>> {
        self.read().last_checked_at
    }

    /// Accept a new snapshot observed at `height`.
    ///
    /// Shifts `current` into `previous` and updates `last_non_empty` when the
    /// snapshot has transactions. Returns `false` and changes nothing when
    /// `height` does not advance past `last_height_checked`.
    pub fn commit(&self, height: u64, snapshot: TransactionSnapshot) -> bool {
        let mut guard = self.write();
        let state = &mut *guard;
        if height <= state.last_height_checked {
            return false;
        }
        state.last_height_checked = height;
        if !snapshot.is_empty() {
            state.last_non_empty = snapshot.clone();
        }
        state.previous = std::mem::replace(&mut state.current, snapshot);
        true
    }

    /// `current ++ previous`, with counts summed. Duplicates across the two
    /// windows are kept.
    pub fn merged(&self, order: MergeOrder) -> MergedTransactions {
        let state = self.read();
        let mut transactions =
            Vec::with_capacity(state.current.transactions.len() + state.previous.transactions.len());
        transactions.extend(state.current.transactions.iter().cloned());
        transactions.extend(state.previous.transactions.iter().cloned());
        let count = state.current.count + state.previous.count;
        drop(state);

        if order == MergeOrder::HeightDesc {
            // stable: equal heights keep current-before-previous order
            transactions.sort_by(|a, b| b.height.cmp(&a.height));
        }

        MergedTransactions {
            success: true,
            transactions,
            count,
        }
    }

    pub fn current(&self) -> TransactionSnapshot {
        self.read().current.clone()
    }

    pub fn previous(&self) -> TransactionSnapshot {
        self.read().previous.clone()
    }

    pub fn last_non_empty(&self) -> TransactionSnapshot {
        self.read().last_non_empty.clone()
    }

    /// Copy of the whole state.
    pub fn snapshot(&self) -> CacheState {
        self.read().clone()
    }
}
