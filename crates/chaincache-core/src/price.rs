//! Price watcher: an independent poller that caches one opaque JSON document.
//!
//! No failure counting or rotation here. A fetch or parse failure is logged
//! and the previous document stays in place until the next tick.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::TransportError;
use crate::schedule::PeriodicTask;

/// Where the price document comes from.
#[async_trait]
pub trait PriceSource: Send + Sync + 'static {
    /// Raw response body.
    async fn fetch(&self) -> Result<String, TransportError>;

    fn url(&self) -> &str;
}

/// Caches the latest price document fetched from a [`PriceSource`].
pub struct PriceWatcher {
    inner: Arc<WatcherInner>,
    ticker: PeriodicTask,
    path: String,
}

struct WatcherInner {
    source: Arc<dyn PriceSource>,
    document: RwLock<Value>,
    poll_interval: Duration,
}

impl PriceWatcher {
    /// `path` is the route key the document is served under.
    pub fn new(source: Arc<dyn PriceSource>, poll_interval: Duration, path: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(WatcherInner {
                source,
                document: RwLock::new(Value::Object(Map::new())),
                poll_interval,
            }),
            ticker: PeriodicTask::new("price-watcher"),
            path: path.into(),
        }
    }

    pub fn start(&self) -> bool {
        let inner = Arc::clone(&self.inner);
        self.ticker.start(self.inner.poll_interval, move || {
            let inner = Arc::clone(&inner);
            async move {
                inner.check().await;
            }
        })
    }

    pub fn stop(&self) -> bool {
        self.ticker.stop()
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_running()
    }

    /// Fetch once now. Returns `true` if the cached document was replaced.
    pub async fn check_prices(&self) -> bool {
        self.inner.check().await
    }

    /// Fetch once in the background.
    pub fn trigger(&self) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.check().await;
        });
    }

    /// The cached document; `{}` until the first successful fetch.
    pub fn prices(&self) -> Value {
        self.inner
            .document
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn poll_interval(&self) -> Duration {
        self.inner.poll_interval
    }
}

impl std::fmt::Debug for PriceWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceWatcher")
            .field("source", &self.inner.source.url())
            .field("path", &self.path)
            .field("running", &self.is_running())
            .finish()
    }
}

impl WatcherInner {
    async fn check(&self) -> bool {
        let body = match self.source.fetch().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(source = %self.source.url(), error = %e, "price fetch failed");
                return false;
            }
        };
        match serde_json::from_str::<Value>(&body) {
            Ok(doc) => {
                *self.document.write().unwrap_or_else(PoisonError::into_inner) = doc;
                tracing::debug!(source = %self.source.url(), "prices updated");
                true
            }
            Err(e) => {
                tracing::warn!(source = %self.source.url(), error = %e, "malformed price document; keeping previous");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use serde_json::json;

    use super::*;
    use crate::mock::MockPriceSource;

    fn watcher(source: &Arc<MockPriceSource>) -> PriceWatcher {
        PriceWatcher::new(
            Arc::clone(source) as Arc<dyn PriceSource>,
            Duration::from_secs(60),
            "/prices",
        )
    }

    #[tokio::test]
    async fn starts_with_empty_object() {
        let source = MockPriceSource::new();
        let w = watcher(&source);
        assert_eq!(w.prices(), json!({}));
        assert_eq!(w.path(), "/prices");
    }

    #[tokio::test]
    async fn document_is_replaced_wholesale() {
        let source = MockPriceSource::new();
        source.push_body(r#"[{"symbol":"RISE","price_usd":"0.10"}]"#);
        source.push_body(r#"{"usd":0.2}"#);
        let w = watcher(&source);

        assert!(w.check_prices().await);
        assert_eq!(w.prices()[0]["symbol"], "RISE");
        assert!(w.check_prices().await);
        assert_eq!(w.prices(), json!({"usd": 0.2}));
    }

    #[tokio::test]
    async fn bad_body_keeps_previous_document() {
        let source = MockPriceSource::new();
        source.push_body(r#"{"usd":0.1}"#);
        source.push_body("<html>rate limited</html>");
        source.push_err();
        let w = watcher(&source);

        w.check_prices().await;
        assert!(!w.check_prices().await);
        assert!(!w.check_prices().await);
        assert_eq!(w.prices(), json!({"usd": 0.1}));
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fetches_each_period() {
        let source = MockPriceSource::new();
        source.push_body(r#"{"usd":1}"#);
        source.push_body(r#"{"usd":2}"#);
        let w = watcher(&source);

        assert!(w.start());
        assert!(!w.start());
        tokio::time::sleep(Duration::from_secs(121)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(w.prices(), json!({"usd": 2}));

        assert!(w.stop());
        assert!(!w.stop());
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }
}
