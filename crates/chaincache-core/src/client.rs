//! `NodeClient`: the narrow contract the cache consumes from a node.

use async_trait::async_trait;

use crate::address::Address;
use crate::error::TransportError;
use crate::types::{
    AccountResponse, DelegateResponse, DelegatesResponse, HeightResponse, TransactionFilter,
    TransactionListResponse,
};

/// Query operations against a single node endpoint.
///
/// Every call may fail with a [`TransportError`]; a well-formed "nothing found"
/// reply is reported through the `success` flag of the response instead.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` for use across Tokio tasks.
///
/// # Object Safety
/// The trait is object-safe and is stored as `Arc<dyn NodeClient>` in a
/// [`NodePool`](crate::pool::NodePool).
#[async_trait]
pub trait NodeClient: Send + Sync + 'static {
    /// Current block height of the node.
    async fn get_height(&self) -> Result<HeightResponse, TransportError>;

    /// Transactions matching `filter`.
    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<TransactionListResponse, TransportError>;

    /// Account info for `address`.
    async fn get_account(&self, address: &Address) -> Result<AccountResponse, TransportError>;

    /// Delegates the account voted for.
    async fn get_delegates(&self, address: &Address)
        -> Result<DelegatesResponse, TransportError>;

    /// Delegate registration by public key.
    async fn get_delegate_by_public_key(
        &self,
        public_key: &str,
    ) -> Result<DelegateResponse, TransportError>;

    /// The endpoint this client talks to.
    fn url(&self) -> &str;
}
