//! Scripted `NodeClient` and `PriceSource` used by the unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::sync::Notify;

use crate::address::Address;
use crate::client::NodeClient;
use crate::error::TransportError;
use crate::price::PriceSource;
use crate::types::{
    AccountResponse, DelegateResponse, DelegatesResponse, HeightResponse, Transaction,
    TransactionFilter, TransactionListResponse,
};

pub(crate) fn tx(height: u64) -> Transaction {
    let mut extra = Map::new();
    extra.insert("id".into(), json!(format!("tx-{height}")));
    Transaction {
        height,
        sender_id: Some("123456789012345R".into()),
        recipient_id: Some("543210987654321R".into()),
        extra,
    }
}

pub(crate) fn txs(heights: &[u64]) -> Vec<Transaction> {
    heights.iter().copied().map(tx).collect()
}

pub(crate) fn down() -> TransportError {
    TransportError::Http("connection refused".into())
}

#[derive(Default)]
pub(crate) struct MockNode {
    url: String,
    heights: Mutex<VecDeque<Result<u64, TransportError>>>,
    lists: Mutex<VecDeque<Result<TransactionListResponse, TransportError>>>,
    accounts: Mutex<HashMap<String, Value>>,
    delegates: Mutex<HashMap<String, Value>>,
    registrations: Mutex<HashMap<String, Value>>,
    history: Mutex<HashMap<String, Vec<Transaction>>>,
    failing_history: Mutex<HashSet<String>>,
    fail_lookups: AtomicBool,
    gate: Mutex<Option<Arc<Notify>>>,
    hang: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub filters: Mutex<Vec<TransactionFilter>>,
    pub lookups: Mutex<Vec<String>>,
    pub height_calls: AtomicUsize,
}

impl MockNode {
    pub fn new(url: &str) -> Arc<Self> {
        Arc::new(Self {
            url: url.to_string(),
            ..Default::default()
        })
    }

    pub fn push_height(&self, height: u64) {
        self.heights.lock().unwrap().push_back(Ok(height));
    }

    pub fn push_height_err(&self) {
        self.heights.lock().unwrap().push_back(Err(down()));
    }

    pub fn push_list(&self, resp: TransactionListResponse) {
        self.lists.lock().unwrap().push_back(Ok(resp));
    }

    pub fn push_list_err(&self, err: TransportError) {
        self.lists.lock().unwrap().push_back(Err(err));
    }

    pub fn with_account(&self, address: &str, account: Value) {
        self.accounts.lock().unwrap().insert(address.into(), account);
    }

    pub fn with_delegates(&self, address: &str, delegates: Value) {
        self.delegates.lock().unwrap().insert(address.into(), delegates);
    }

    pub fn with_registration(&self, public_key: &str, delegate: Value) {
        self.registrations
            .lock()
            .unwrap()
            .insert(public_key.into(), delegate);
    }

    pub fn with_history(&self, address: &str, transactions: Vec<Transaction>) {
        self.history
            .lock()
            .unwrap()
            .insert(address.into(), transactions);
    }

    pub fn fail_history_for(&self, address: &str) {
        self.failing_history.lock().unwrap().insert(address.into());
    }

    pub fn fail_lookups(&self) {
        self.fail_lookups.store(true, Ordering::SeqCst);
    }

    /// Every `get_height` call waits for one `notify_one` on the returned
    /// gate before answering.
    pub fn gate_heights(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Every `get_height` call sleeps for `timeout` and then times out.
    pub fn hang_for(&self, timeout: Duration) {
        *self.hang.lock().unwrap() = Some(timeout);
    }

    pub fn filters(&self) -> Vec<TransactionFilter> {
        self.filters.lock().unwrap().clone()
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }

    fn lookup(&self, what: &str, key: &str) -> Result<(), TransportError> {
        self.lookups.lock().unwrap().push(format!("{what}:{key}"));
        if self.fail_lookups.load(Ordering::SeqCst) {
            Err(down())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl NodeClient for MockNode {
    async fn get_height(&self) -> Result<HeightResponse, TransportError> {
        self.height_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let hang = *self.hang.lock().unwrap();
        let result = match hang {
            Some(timeout) => {
                tokio::time::sleep(timeout).await;
                Err(TransportError::Timeout {
                    ms: timeout.as_millis() as u64,
                })
            }
            None => {
                let next = self.heights.lock().unwrap().pop_front();
                next.unwrap_or_else(|| Err(down()))
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result.map(|height| HeightResponse { height })
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<TransactionListResponse, TransportError> {
        self.filters.lock().unwrap().push(filter.clone());
        if filter.has_participants() {
            let key = filter
                .sender_id
                .clone()
                .or_else(|| filter.recipient_id.clone())
                .unwrap_or_default();
            if self.failing_history.lock().unwrap().contains(&key) {
                return Err(down());
            }
            let found = self.history.lock().unwrap().get(&key).cloned();
            return Ok(TransactionListResponse::ok(found.unwrap_or_default()));
        }
        let next = self.lists.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(down()))
    }

    async fn get_account(&self, address: &Address) -> Result<AccountResponse, TransportError> {
        self.lookup("account", address.as_str())?;
        let account = self.accounts.lock().unwrap().get(address.as_str()).cloned();
        Ok(AccountResponse {
            success: account.is_some(),
            account,
        })
    }

    async fn get_delegates(
        &self,
        address: &Address,
    ) -> Result<DelegatesResponse, TransportError> {
        self.lookup("delegates", address.as_str())?;
        let delegates = self.delegates.lock().unwrap().get(address.as_str()).cloned();
        Ok(DelegatesResponse {
            success: delegates.is_some(),
            delegates,
        })
    }

    async fn get_delegate_by_public_key(
        &self,
        public_key: &str,
    ) -> Result<DelegateResponse, TransportError> {
        self.lookup("delegate", public_key)?;
        let delegate = self.registrations.lock().unwrap().get(public_key).cloned();
        Ok(DelegateResponse {
            success: delegate.is_some(),
            delegate,
        })
    }

    fn url(&self) -> &str {
        &self.url
    }
}

/// Price source that replays scripted bodies.
#[derive(Default)]
pub(crate) struct MockPriceSource {
    bodies: Mutex<VecDeque<Result<String, TransportError>>>,
    pub calls: AtomicUsize,
}

impl MockPriceSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_body(&self, body: &str) {
        self.bodies.lock().unwrap().push_back(Ok(body.to_string()));
    }

    pub fn push_err(&self) {
        self.bodies.lock().unwrap().push_back(Err(down()));
    }
}

#[async_trait]
impl PriceSource for MockPriceSource {
    async fn fetch(&self) -> Result<String, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.bodies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(down()))
    }

    fn url(&self) -> &str {
        "https://prices.test/ticker"
    }
}
