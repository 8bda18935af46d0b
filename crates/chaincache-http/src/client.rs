//! Node REST client backed by `reqwest`.
//!
//! Maps the [`NodeClient`] operations onto a RISE-style node API:
//!
//! | Operation | Request |
//! |---|---|
//! | `get_height` | `GET /api/blocks/getHeight` |
//! | `list_transactions` | `GET /api/transactions?…` |
//! | `get_account` | `GET /api/accounts?address=` |
//! | `get_delegates` | `GET /api/accounts/delegates?address=` |
//! | `get_delegate_by_public_key` | `GET /api/delegates/get?publicKey=` |
//!
//! No retries happen here; the poller's failure policy owns that decision.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use chaincache_core::address::Address;
use chaincache_core::client::NodeClient;
use chaincache_core::error::{ConfigError, TransportError};
use chaincache_core::types::{
    AccountResponse, DelegateResponse, DelegatesResponse, HeightResponse, TransactionFilter,
    TransactionListResponse,
};

/// Configuration for [`HttpNodeClient`] and [`HttpPriceSource`](crate::HttpPriceSource).
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub request_timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Builds the shared `reqwest` client, validating `url` on the way.
pub(crate) fn build_http(url: &str, config: &HttpClientConfig) -> Result<reqwest::Client, ConfigError> {
    reqwest::Url::parse(url).map_err(|e| ConfigError::Client {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .map_err(|e| ConfigError::Client {
            url: url.to_string(),
            reason: e.to_string(),
        })
}

/// Converts a `reqwest` failure into the transport taxonomy.
pub(crate) fn map_reqwest(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout {
            ms: timeout.as_millis() as u64,
        }
    } else {
        TransportError::Http(err.to_string())
    }
}

/// Sends `req` and returns the body of a 2xx response.
pub(crate) async fn fetch_text(
    req: reqwest::RequestBuilder,
    timeout: Duration,
) -> Result<String, TransportError> {
    let resp = req.send().await.map_err(|e| map_reqwest(e, timeout))?;
    let status = resp.status();
    let body = resp.text().await.map_err(|e| map_reqwest(e, timeout))?;
    if !status.is_success() {
        return Err(TransportError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

/// Query string for a transaction filter.
///
/// With a sender or recipient set the node ORs the participants, so the
/// height bound is sent as `and:fromHeight` to apply to both.
pub fn query_pairs(filter: &TransactionFilter) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::with_capacity(4);
    if let Some(sender) = &filter.sender_id {
        pairs.push(("senderId", sender.clone()));
    }
    if let Some(recipient) = &filter.recipient_id {
        pairs.push(("recipientId", recipient.clone()));
    }
    if let Some(from) = filter.from_height {
        let key = if filter.has_participants() {
            "and:fromHeight"
        } else {
            "fromHeight"
        };
        pairs.push((key, from.to_string()));
    }
    pairs.push(("limit", filter.limit.to_string()));
    pairs
}

/// `NodeClient` for one node base URL.
pub struct HttpNodeClient {
    url: String,
    http: reqwest::Client,
    request_timeout: Duration,
}

impl HttpNodeClient {
    /// Create a client for the node at `url` (scheme and host, no path).
    pub fn new(url: impl Into<String>, config: HttpClientConfig) -> Result<Self, ConfigError> {
        let url = url.into().trim_end_matches('/').to_string();
        let http = build_http(&url, &config)?;
        Ok(Self {
            url,
            http,
            request_timeout: config.request_timeout,
        })
    }

    pub fn default_for(url: impl Into<String>) -> Result<Self, ConfigError> {
        Self::new(url, HttpClientConfig::default())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, TransportError> {
        let req = self.http.get(self.endpoint(path)).query(query);
        let body = fetch_text(req, self.request_timeout).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl std::fmt::Debug for HttpNodeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpNodeClient")
            .field("url", &self.url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[async_trait]
impl NodeClient for HttpNodeClient {
    async fn get_height(&self) -> Result<HeightResponse, TransportError> {
        self.get_json("/api/blocks/getHeight", &[]).await
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<TransactionListResponse, TransportError> {
        self.get_json("/api/transactions", &query_pairs(filter)).await
    }

    async fn get_account(&self, address: &Address) -> Result<AccountResponse, TransportError> {
        self.get_json("/api/accounts", &[("address", address.to_string())])
            .await
    }

    async fn get_delegates(
        &self,
        address: &Address,
    ) -> Result<DelegatesResponse, TransportError> {
        self.get_json("/api/accounts/delegates", &[("address", address.to_string())])
            .await
    }

    async fn get_delegate_by_public_key(
        &self,
        public_key: &str,
    ) -> Result<DelegateResponse, TransportError> {
        self.get_json("/api/delegates/get", &[("publicKey", public_key.to_string())])
            .await
    }

    fn url(&self) -> &str {
        &self.url
    }
}
