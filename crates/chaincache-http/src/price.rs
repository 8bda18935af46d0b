//! `PriceSource` that GETs a fixed URL.

use std::time::Duration;

use async_trait::async_trait;

use chaincache_core::error::{ConfigError, TransportError};
use chaincache_core::price::PriceSource;

use crate::client::{build_http, fetch_text, HttpClientConfig};

/// Fetches the price document from one URL. The body is returned unparsed.
#[derive(Debug)]
pub struct HttpPriceSource {
    url: String,
    http: reqwest::Client,
    request_timeout: Duration,
}

impl HttpPriceSource {
    pub fn new(url: impl Into<String>, config: HttpClientConfig) -> Result<Self, ConfigError> {
        let url = url.into();
        let http = build_http(&url, &config)?;
        Ok(Self {
            url,
            http,
            request_timeout: config.request_timeout,
        })
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    async fn fetch(&self) -> Result<String, TransportError> {
        fetch_text(self.http.get(&self.url), self.request_timeout).await
    }

    fn url(&self) -> &str {
        &self.url
    }
}
