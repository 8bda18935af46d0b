//! Node API payloads and the records served to clients.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::address::Address;

// ─── Transactions ─────────────────────────────────────────────────────────────

/// A single transaction. Only the fields the cache needs are typed; everything
/// else the node returns is carried through untouched in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Block height the transaction was included at.
    pub height: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Transaction {
    /// The node-assigned transaction id, if present.
    pub fn id(&self) -> Option<&str> {
        self.extra.get("id").and_then(Value::as_str)
    }
}

/// One accepted polling result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionSnapshot {
    pub success: bool,
    pub transactions: Vec<Transaction>,
    pub count: u64,
}

impl TransactionSnapshot {
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

/// Raw `listTransactions` reply. `transactions` may be missing when the node
/// rejects the query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionListResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub transactions: Option<Vec<Transaction>>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub count: u64,
}

impl TransactionListResponse {
    /// A successful reply carrying a transaction list.
    pub fn ok(transactions: Vec<Transaction>) -> Self {
        let count = transactions.len() as u64;
        Self {
            success: true,
            transactions: Some(transactions),
            count,
        }
    }

    /// Converts a well-formed successful reply into a snapshot.
    /// Returns `None` when `success` is false or `transactions` is missing.
    pub fn into_snapshot(self) -> Option<TransactionSnapshot> {
        match (self.success, self.transactions) {
            (true, Some(transactions)) => Some(TransactionSnapshot {
                success: true,
                transactions,
                count: self.count,
            }),
            _ => None,
        }
    }
}

/// Accepts `count` as a JSON number or a numeric string. Anything else is 0.
fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => {
            let digits: String = s
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits.parse().unwrap_or(0)
        }
        _ => 0,
    })
}

/// `getHeight` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeightResponse {
    pub height: u64,
}

// ─── Filters ──────────────────────────────────────────────────────────────────

/// Query passed to `NodeClient::list_transactions`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    /// Lowest block height to include.
    pub from_height: Option<u64>,
    /// Match transactions sent by this address.
    pub sender_id: Option<String>,
    /// Match transactions received by this address.
    pub recipient_id: Option<String>,
    /// Maximum number of transactions returned.
    pub limit: u32,
}

impl TransactionFilter {
    /// Every transaction from `from_height` on, regardless of participants.
    pub fn window(from_height: u64, limit: u32) -> Self {
        Self {
            from_height: Some(from_height),
            limit,
            ..Default::default()
        }
    }

    /// Returns `true` if the filter names a sender or a recipient.
    pub fn has_participants(&self) -> bool {
        self.sender_id.is_some() || self.recipient_id.is_some()
    }
}

/// Which side of an address's transactions a history query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    All,
    Incoming,
    Outgoing,
}

impl Direction {
    /// Builds the history filter for one address.
    pub fn filter(self, address: &Address, since_height: u64, limit: u32) -> TransactionFilter {
        TransactionFilter {
            from_height: Some(since_height),
            sender_id: (self != Self::Incoming).then(|| address.to_string()),
            recipient_id: (self != Self::Outgoing).then(|| address.to_string()),
            limit,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Incoming => write!(f, "incoming"),
            Self::Outgoing => write!(f, "outgoing"),
        }
    }
}

// ─── Merged view ──────────────────────────────────────────────────────────────

/// Ordering applied by `TransactionCache::merged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeOrder {
    /// `current` followed by `previous`, as stored.
    #[default]
    Raw,
    /// Highest block height first; equal heights keep their merged order.
    HeightDesc,
}

/// Union of the two most recent polling windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedTransactions {
    pub success: bool,
    pub transactions: Vec<Transaction>,
    pub count: u64,
}

// ─── Accounts ─────────────────────────────────────────────────────────────────

/// `getAccount` reply.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub account: Option<Value>,
}

/// `getDelegates` reply (the delegates an account voted for).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DelegatesResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub delegates: Option<Value>,
}

/// `getDelegateByPublicKey` reply (the account's own delegate registration).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DelegateResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub delegate: Option<Value>,
}

/// Everything known about one requested address. Serializes to `{}` when
/// nothing was found.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccountRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delegates: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delegate: Option<Value>,
}

impl AccountRecord {
    pub fn is_empty(&self) -> bool {
        self.success.is_none()
            && self.account.is_none()
            && self.delegates.is_none()
            && self.delegate.is_none()
    }

    pub fn absorb_account(&mut self, resp: AccountResponse) {
        if let (true, Some(account)) = (resp.success, resp.account) {
            self.success = Some(true);
            self.account = Some(account);
        }
    }

    pub fn absorb_delegates(&mut self, resp: DelegatesResponse) {
        if let (true, Some(delegates)) = (resp.success, resp.delegates) {
            self.success = Some(true);
            self.delegates = Some(delegates);
        }
    }

    pub fn absorb_delegate(&mut self, resp: DelegateResponse) {
        if let (true, Some(delegate)) = (resp.success, resp.delegate) {
            self.success = Some(true);
            self.delegate = Some(delegate);
        }
    }

    /// Public key of the account, when the node reported one.
    pub fn public_key(&self) -> Option<&str> {
        self.account.as_ref()?.get("publicKey")?.as_str()
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transaction_keeps_unknown_fields() {
        let raw = json!({
            "id": "1234",
            "height": 77,
            "senderId": "123456789012345R",
            "recipientId": "543210987654321R",
            "amount": 100000000,
            "type": 0
        });
        let tx: Transaction = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(tx.height, 77);
        assert_eq!(tx.id(), Some("1234"));
        assert_eq!(tx.extra["amount"], json!(100000000));
        assert_eq!(serde_json::to_value(&tx).unwrap(), raw);
    }

    #[test]
    fn count_accepts_number_and_string() {
        let a: TransactionListResponse =
            serde_json::from_value(json!({"success": true, "transactions": [], "count": 7})).unwrap();
        let b: TransactionListResponse =
            serde_json::from_value(json!({"success": true, "transactions": [], "count": "12"})).unwrap();
        let c: TransactionListResponse =
            serde_json::from_value(json!({"success": true, "transactions": [], "count": "n/a"})).unwrap();
        let d: TransactionListResponse =
            serde_json::from_value(json!({"success": true, "transactions": []})).unwrap();
        assert_eq!(a.count, 7);
        assert_eq!(b.count, 12);
        assert_eq!(c.count, 0);
        assert_eq!(d.count, 0);
    }

    #[test]
    fn unsuccessful_reply_is_not_a_snapshot() {
        let rejected: TransactionListResponse =
            serde_json::from_value(json!({"success": false, "error": "bad query"})).unwrap();
        assert!(rejected.into_snapshot().is_none());

        let missing: TransactionListResponse =
            serde_json::from_value(json!({"success": true})).unwrap();
        assert!(missing.into_snapshot().is_none());
    }

    #[test]
    fn direction_filters() {
        let addr: Address = "123456789012345R".parse().unwrap();

        let all = Direction::All.filter(&addr, 10, 500);
        assert_eq!(all.sender_id.as_deref(), Some("123456789012345R"));
        assert_eq!(all.recipient_id.as_deref(), Some("123456789012345R"));

        let incoming = Direction::Incoming.filter(&addr, 10, 500);
        assert!(incoming.sender_id.is_none());
        assert!(incoming.recipient_id.is_some());

        let outgoing = Direction::Outgoing.filter(&addr, 10, 500);
        assert!(outgoing.sender_id.is_some());
        assert!(outgoing.recipient_id.is_none());
        assert_eq!(outgoing.from_height, Some(10));
        assert_eq!(outgoing.limit, 500);
    }

    #[test]
    fn empty_record_serializes_to_empty_object() {
        let record = AccountRecord::default();
        assert!(record.is_empty());
        assert_eq!(serde_json::to_value(&record).unwrap(), json!({}));
    }

    #[test]
    fn record_ignores_unsuccessful_parts() {
        let mut record = AccountRecord::default();
        record.absorb_account(AccountResponse {
            success: true,
            account: Some(json!({"address": "123456789012345R", "publicKey": "abc"})),
        });
        record.absorb_delegates(DelegatesResponse {
            success: false,
            delegates: None,
        });
        assert_eq!(record.public_key(), Some("abc"));
        assert!(record.delegates.is_none());
        assert_eq!(record.success, Some(true));
    }
}
