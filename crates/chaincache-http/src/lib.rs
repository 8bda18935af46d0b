//! chaincache-http — HTTP plumbing for chaincache.
//!
//! - [`HttpNodeClient`] — `reqwest` implementation of
//!   [`NodeClient`](chaincache_core::NodeClient) for RISE-style node APIs
//! - [`HttpPriceSource`] — GETs the price document from a fixed URL
//! - [`router`] — `axum` routes over a [`QueryFacade`](chaincache_core::QueryFacade)
//! - [`build_listener`] — turns a [`ListenerConfig`] into a ready [`Listener`]

pub mod client;
pub mod price;
pub mod router;

use std::sync::Arc;

use chaincache_core::{ConfigError, Listener, ListenerConfig, NodeClient, PriceSource};

pub use client::{HttpClientConfig, HttpNodeClient};
pub use price::HttpPriceSource;
pub use router::{router, RouteConfig, SlotQuery};

/// Build HTTP clients for every configured node (and the price source, when
/// enabled) and assemble the listener. Nothing is started.
pub fn build_listener(config: &ListenerConfig, http: HttpClientConfig) -> Result<Listener, ConfigError> {
    let nodes = config
        .nodes
        .iter()
        .map(|url| {
            HttpNodeClient::new(url.as_str(), http.clone()).map(|c| Arc::new(c) as Arc<dyn NodeClient>)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let prices = if config.enable_pricewatch {
        let source = HttpPriceSource::new(config.pricewatch.source.as_str(), http)?;
        Some(Arc::new(source) as Arc<dyn PriceSource>)
    } else {
        None
    };

    Listener::new(config, nodes, prices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds() {
        let listener = build_listener(&ListenerConfig::default(), HttpClientConfig::default()).unwrap();
        assert_eq!(
            listener.poller().pool().endpoints(),
            vec!["https://wallet.rise.vision".to_string()]
        );
        assert_eq!(listener.price_watcher().unwrap().path(), "/prices");
    }

    #[test]
    fn bad_node_url_fails() {
        let config = ListenerConfig {
            nodes: vec!["https://ok.test".into(), "::nope::".into()],
            ..Default::default()
        };
        let err = build_listener(&config, HttpClientConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Client { .. }));
    }

    #[test]
    fn empty_node_list_fails() {
        let config = ListenerConfig {
            nodes: vec![],
            ..Default::default()
        };
        assert!(matches!(
            build_listener(&config, HttpClientConfig::default()),
            Err(ConfigError::NoNodes)
        ));
    }
}
