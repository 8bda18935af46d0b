//! Assembles a poller, an optional price watcher and the query facade from a
//! [`ListenerConfig`].

use std::sync::Arc;

use crate::client::NodeClient;
use crate::config::ListenerConfig;
use crate::error::ConfigError;
use crate::facade::QueryFacade;
use crate::poller::Poller;
use crate::pool::NodePool;
use crate::price::{PriceSource, PriceWatcher};

/// Everything one configured listener owns.
#[derive(Debug)]
pub struct Listener {
    poller: Arc<Poller>,
    prices: Option<Arc<PriceWatcher>>,
    facade: QueryFacade,
    autostart: bool,
    check_on_startup: bool,
    price_autostart: bool,
    price_check_on_startup: bool,
}

impl Listener {
    /// Validate `config` and wire the components. Nothing starts until
    /// [`launch`](Self::launch).
    ///
    /// `nodes` must follow the order of `config.nodes`. The price watcher is
    /// built only when `config.enable_pricewatch` is set and a source is given.
    pub fn new(
        config: &ListenerConfig,
        nodes: Vec<Arc<dyn NodeClient>>,
        price_source: Option<Arc<dyn PriceSource>>,
    ) -> Result<Self, ConfigError> {
        let poller_config = config.poller_config()?;
        let pool = NodePool::new(nodes)?;
        let poller = Arc::new(Poller::new(Arc::new(pool), poller_config)?);

        let prices = match (config.enable_pricewatch, price_source) {
            (true, Some(source)) => {
                config.pricewatch.validate()?;
                let interval = config.pricewatch.poll_interval()?;
                Some(Arc::new(PriceWatcher::new(
                    source,
                    interval,
                    config.pricewatch.path.clone(),
                )))
            }
            (true, None) => {
                tracing::warn!("price watcher enabled but no source given; prices disabled");
                None
            }
            (false, _) => None,
        };

        let facade = QueryFacade::new(Arc::clone(&poller), prices.clone(), config.history_limit);
        Ok(Self {
            poller,
            prices,
            facade,
            autostart: config.autostart,
            check_on_startup: config.check_on_startup,
            price_autostart: config.pricewatch.autostart,
            price_check_on_startup: config.pricewatch.check_on_startup,
        })
    }

    /// Apply the autostart and check-on-startup flags.
    pub fn launch(&self) {
        tracing::info!(
            nodes = ?self.poller.pool().endpoints(),
            interval_ms = self.poller.poll_interval().as_millis() as u64,
            "launching listener"
        );
        if self.autostart {
            self.poller.start();
        }
        if self.check_on_startup {
            self.poller.trigger();
        }

        if let Some(prices) = &self.prices {
            if self.price_check_on_startup {
                prices.trigger();
            }
            if self.price_autostart {
                prices.start();
            }
        }
    }

    /// Stop every timer and any pending retry.
    pub fn shutdown(&self) {
        self.poller.stop();
        if let Some(prices) = self.prices.as_ref().filter(|p| p.is_running()) {
            prices.stop();
        }
        tracing::info!("listener stopped");
    }

    pub fn facade(&self) -> QueryFacade {
        self.facade.clone()
    }

    pub fn poller(&self) -> &Arc<Poller> {
        &self.poller
    }

    pub fn price_watcher(&self) -> Option<&Arc<PriceWatcher>> {
        self.prices.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::mock::{txs, MockNode, MockPriceSource};
    use crate::types::TransactionListResponse;

    fn nodes(node: &Arc<MockNode>) -> Vec<Arc<dyn NodeClient>> {
        vec![Arc::clone(node) as Arc<dyn NodeClient>]
    }

    #[tokio::test]
    async fn disabled_prices_are_not_built() {
        let node = MockNode::new("https://a.test");
        let config = ListenerConfig {
            enable_pricewatch: false,
            ..Default::default()
        };
        let source = MockPriceSource::new();
        let listener = Listener::new(&config, nodes(&node), Some(source as Arc<dyn PriceSource>)).unwrap();
        assert!(listener.price_watcher().is_none());
        assert!(listener.facade().price_path().is_none());
    }

    #[test]
    fn bad_price_interval_fails_construction() {
        let node = MockNode::new("https://a.test");
        let mut config = ListenerConfig::default();
        config.pricewatch.min_poll_secs = 10;
        let source = MockPriceSource::new();
        let err = Listener::new(&config, nodes(&node), Some(source as Arc<dyn PriceSource>)).unwrap_err();
        assert!(matches!(err, ConfigError::PollIntervalOutOfRange { what: "price", .. }));
    }

    #[test]
    fn reserved_price_path_fails_construction() {
        let node = MockNode::new("https://a.test");
        let mut config = ListenerConfig::default();
        config.pricewatch.path = "/status".into();
        let source = MockPriceSource::new();
        let err = Listener::new(&config, nodes(&node), Some(source as Arc<dyn PriceSource>)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRoutePath { ref path, .. } if path == "/status"));

        config.enable_pricewatch = false;
        assert!(Listener::new(&config, nodes(&node), None).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn launch_applies_startup_flags() {
        let node = MockNode::new("https://a.test");
        node.push_height(300);
        node.push_list(TransactionListResponse::ok(txs(&[299, 300])));
        let source = MockPriceSource::new();
        source.push_body(r#"{"usd":0.05}"#);

        let config = ListenerConfig {
            check_on_startup: true,
            ..Default::default()
        };
        let listener =
            Listener::new(&config, nodes(&node), Some(Arc::clone(&source) as Arc<dyn PriceSource>)).unwrap();
        let mut updates = listener.poller().subscribe();

        listener.launch();
        updates.changed().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let facade = listener.facade();
        assert!(facade.status().running);
        assert_eq!(facade.latest_merged().transactions.len(), 2);
        assert_eq!(facade.prices(), json!({"usd": 0.05}));
        assert_eq!(facade.price_path(), Some("/prices"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        listener.shutdown();
        assert!(!facade.status().running);
        assert!(!listener.price_watcher().unwrap().is_running());
    }

    #[tokio::test]
    async fn no_autostart_leaves_timers_idle() {
        let node = MockNode::new("https://a.test");
        let mut config = ListenerConfig {
            autostart: false,
            ..Default::default()
        };
        config.pricewatch.autostart = false;
        config.pricewatch.check_on_startup = false;
        let listener =
            Listener::new(&config, nodes(&node), Some(MockPriceSource::new() as Arc<dyn PriceSource>)).unwrap();
        listener.launch();
        assert!(!listener.poller().is_running());
        assert!(!listener.price_watcher().unwrap().is_running());
    }
}
