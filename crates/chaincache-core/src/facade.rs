//! Read-side operations served to HTTP clients.
//!
//! Every method here answers from cached state or a bounded number of node
//! queries and never fails: errors collapse into an empty result and a log
//! line.

use std::sync::Arc;

use futures::future::join_all;
use serde_json::{Map, Value};

use crate::address::Address;
use crate::error::TransportError;
use crate::poller::{Poller, StatusReport};
use crate::price::PriceWatcher;
use crate::types::{
    AccountRecord, Direction, MergeOrder, MergedTransactions, Transaction, TransactionSnapshot,
};

/// Number of address slots a single request may carry.
pub const MAX_ADDRESSES: usize = 5;

/// Pads or truncates request slots to exactly [`MAX_ADDRESSES`], dropping
/// anything that is not a valid address.
pub fn address_slots(slots: &[Option<String>]) -> [Option<Address>; MAX_ADDRESSES] {
    std::array::from_fn(|i| Address::from_slot(slots.get(i).and_then(|s| s.as_deref())))
}

/// Query surface over one poller and an optional price watcher.
#[derive(Debug, Clone)]
pub struct QueryFacade {
    poller: Arc<Poller>,
    prices: Option<Arc<PriceWatcher>>,
    history_limit: u32,
}

impl QueryFacade {
    pub fn new(poller: Arc<Poller>, prices: Option<Arc<PriceWatcher>>, history_limit: u32) -> Self {
        Self {
            poller,
            prices,
            history_limit,
        }
    }

    pub fn status(&self) -> StatusReport {
        self.poller.status()
    }

    /// Account records for up to five address slots, in slot order.
    ///
    /// Always five entries on success; empty or invalid slots are `{}` and are
    /// never sent to the node. A transport failure on any lookup discards the
    /// whole answer and returns an empty list.
    pub async fn accounts(&self, slots: &[Option<String>], include_delegates: bool) -> Vec<AccountRecord> {
        match self.lookup_accounts(slots, include_delegates).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "account lookup aborted");
                Vec::new()
            }
        }
    }

    async fn lookup_accounts(
        &self,
        slots: &[Option<String>],
        include_delegates: bool,
    ) -> Result<Vec<AccountRecord>, TransportError> {
        let node = self.poller.pool().active();
        let mut records = Vec::with_capacity(MAX_ADDRESSES);

        for slot in address_slots(slots) {
            let mut record = AccountRecord::default();
            if let Some(address) = slot {
                record.absorb_account(node.get_account(&address).await?);
                if include_delegates {
                    record.absorb_delegates(node.get_delegates(&address).await?);
                    if let Some(key) = record.public_key().map(str::to_owned) {
                        record.absorb_delegate(node.get_delegate_by_public_key(&key).await?);
                    }
                }
            }
            records.push(record);
        }
        Ok(records)
    }

    /// Transactions for up to five addresses since `since_height`, one list per
    /// slot. Invalid slots and failed queries yield an empty list.
    pub async fn history(
        &self,
        direction: Direction,
        since_height: u64,
        slots: &[Option<String>],
    ) -> Vec<Vec<Transaction>> {
        let node = self.poller.pool().active();
        let limit = self.history_limit;

        let queries = address_slots(slots).into_iter().map(|slot| {
            let node = Arc::clone(&node);
            async move {
                let Some(address) = slot else {
                    return Vec::new();
                };
                let filter = direction.filter(&address, since_height, limit);
                match node.list_transactions(&filter).await {
                    Ok(resp) => resp
                        .into_snapshot()
                        .map(|s| s.transactions)
                        .unwrap_or_default(),
                    Err(e) => {
                        tracing::debug!(%address, %direction, error = %e, "history query failed");
                        Vec::new()
                    }
                }
            }
        });
        join_all(queries).await
    }

    /// Both cached windows, highest block first.
    pub fn latest_merged(&self) -> MergedTransactions {
        self.poller.cache().merged(MergeOrder::HeightDesc)
    }

    pub fn last_non_empty(&self) -> TransactionSnapshot {
        self.poller.cache().last_non_empty()
    }

    /// Cached price document, or `{}` when prices are disabled.
    pub fn prices(&self) -> Value {
        self.prices
            .as_ref()
            .map(|w| w.prices())
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    /// Route key for prices, when the watcher is enabled.
    pub fn price_path(&self) -> Option<&str> {
        self.prices.as_deref().map(PriceWatcher::path)
    }
}
