//! Listener configuration and validation.
//!
//! [`ListenerConfig`] is the serde-facing file format. It is turned into the
//! validated runtime settings ([`PollerConfig`], [`PriceConfig::poll_interval`])
//! before anything starts, so a bad value fails at startup instead of at the
//! first tick.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::policy::RetryConfig;

/// Inclusive range a poll interval must fall within.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalBounds {
    pub lowest: Duration,
    pub highest: Duration,
}

/// 30 s – 10 min.
pub const TRANSACTION_POLL_BOUNDS: IntervalBounds = IntervalBounds {
    lowest: Duration::from_secs(30),
    highest: Duration::from_secs(600),
};

/// 1 min – 1 h.
pub const PRICE_POLL_BOUNDS: IntervalBounds = IntervalBounds {
    lowest: Duration::from_secs(60),
    highest: Duration::from_secs(3_600),
};

/// Paths served by the fixed HTTP routes. `/history/:direction` claims
/// everything under `/history/` as well.
pub const RESERVED_PATHS: &[&str] = &[
    "/status",
    "/accounts",
    "/transactions/latest",
    "/transactions/last-nonempty",
];

/// A `[min, max)` range the actual interval is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollInterval {
    pub min: Duration,
    pub max: Duration,
}

impl PollInterval {
    pub fn from_secs(min: u64, max: u64) -> Self {
        Self {
            min: Duration::from_secs(min),
            max: Duration::from_secs(max),
        }
    }

    pub fn fixed(period: Duration) -> Self {
        Self {
            min: period,
            max: period,
        }
    }

    /// Checks the range against `bounds` and draws the interval.
    ///
    /// `min == max` yields exactly `min`; otherwise the result is uniform in
    /// `[min, max)` at millisecond resolution.
    pub fn resolve(
        &self,
        bounds: IntervalBounds,
        what: &'static str,
    ) -> Result<Duration, ConfigError> {
        if self.min > self.max {
            return Err(ConfigError::InvertedPollInterval {
                what,
                min: self.min,
                max: self.max,
            });
        }
        if self.min < bounds.lowest || self.max > bounds.highest {
            return Err(ConfigError::PollIntervalOutOfRange {
                what,
                min: self.min,
                max: self.max,
                lowest: bounds.lowest,
                highest: bounds.highest,
            });
        }

        let min_ms = self.min.as_millis() as u64;
        let max_ms = self.max.as_millis() as u64;
        if min_ms == max_ms {
            return Ok(self.min);
        }
        Ok(Duration::from_millis(
            rand::thread_rng().gen_range(min_ms..max_ms),
        ))
    }
}

/// Validated settings for one [`Poller`](crate::poller::Poller).
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub poll_interval: Duration,
    /// Blocks to look back on the very first poll.
    pub initial_block_window: u64,
    /// `limit` sent with every window poll.
    pub transaction_limit: u32,
    pub rotate_nodes: bool,
    pub error_threshold: u32,
    pub retry: RetryConfig,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(45),
            initial_block_window: default_initial_block_window(),
            transaction_limit: default_transaction_limit(),
            rotate_nodes: true,
            error_threshold: default_error_threshold(),
            retry: RetryConfig::default(),
        }
    }
}

impl PollerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = TRANSACTION_POLL_BOUNDS;
        if self.poll_interval < b.lowest || self.poll_interval > b.highest {
            return Err(ConfigError::PollIntervalOutOfRange {
                what: "transaction",
                min: self.poll_interval,
                max: self.poll_interval,
                lowest: b.lowest,
                highest: b.highest,
            });
        }
        if self.error_threshold == 0 {
            return Err(ConfigError::ZeroErrorThreshold);
        }
        if self.transaction_limit == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "transaction_limit",
            });
        }
        Ok(())
    }
}

// ─── File format ──────────────────────────────────────────────────────────────

/// Top-level listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// Node base URLs in rotation order. The first one starts active.
    #[serde(default = "default_nodes")]
    pub nodes: Vec<String>,
    #[serde(default = "default_min_poll_secs")]
    pub min_poll_secs: u64,
    #[serde(default = "default_max_poll_secs")]
    pub max_poll_secs: u64,
    /// Start the timer when the listener launches.
    #[serde(default = "bool_true")]
    pub autostart: bool,
    /// Poll once right after launch instead of waiting a full interval.
    #[serde(default)]
    pub check_on_startup: bool,
    #[serde(default = "default_initial_block_window")]
    pub initial_block_window: u64,
    #[serde(default = "default_transaction_limit")]
    pub transaction_limit: u32,
    /// `limit` for per-address history queries.
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
    #[serde(default = "bool_true")]
    pub rotate_nodes: bool,
    #[serde(default = "default_error_threshold")]
    pub error_threshold: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_retry_jitter_ms")]
    pub retry_jitter_ms: u64,
    #[serde(default = "bool_true")]
    pub enable_pricewatch: bool,
    #[serde(default)]
    pub pricewatch: PriceConfig,
}

fn default_nodes() -> Vec<String> {
    vec!["https://wallet.rise.vision".to_string()]
}
fn default_min_poll_secs() -> u64 { 44 }
fn default_max_poll_secs() -> u64 { 46 }
fn default_initial_block_window() -> u64 { 100 }
fn default_transaction_limit() -> u32 { 1_000 }
fn default_history_limit() -> u32 { 500 }
fn default_error_threshold() -> u32 { 3 }
fn default_retry_backoff_ms() -> u64 { 8_000 }
fn default_retry_jitter_ms() -> u64 { 1_500 }
fn bool_true() -> bool { true }

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
            min_poll_secs: default_min_poll_secs(),
            max_poll_secs: default_max_poll_secs(),
            autostart: true,
            check_on_startup: false,
            initial_block_window: default_initial_block_window(),
            transaction_limit: default_transaction_limit(),
            history_limit: default_history_limit(),
            rotate_nodes: true,
            error_threshold: default_error_threshold(),
            retry_backoff_ms: default_retry_backoff_ms(),
            retry_jitter_ms: default_retry_jitter_ms(),
            enable_pricewatch: true,
            pricewatch: PriceConfig::default(),
        }
    }
}

impl ListenerConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub fn poll_interval(&self) -> PollInterval {
        PollInterval::from_secs(self.min_poll_secs, self.max_poll_secs)
    }

    /// Validate and draw the runtime poller settings.
    pub fn poller_config(&self) -> Result<PollerConfig, ConfigError> {
        if self.nodes.is_empty() {
            return Err(ConfigError::NoNodes);
        }
        if self.history_limit == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "history_limit",
            });
        }
        let config = PollerConfig {
            poll_interval: self
                .poll_interval()
                .resolve(TRANSACTION_POLL_BOUNDS, "transaction")?,
            initial_block_window: self.initial_block_window,
            transaction_limit: self.transaction_limit,
            rotate_nodes: self.rotate_nodes,
            error_threshold: self.error_threshold,
            retry: RetryConfig {
                backoff: Duration::from_millis(self.retry_backoff_ms),
                max_jitter: Duration::from_millis(self.retry_jitter_ms),
            },
        };
        config.validate()?;
        Ok(config)
    }
}

/// Price watcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceConfig {
    /// URL returning the price document.
    #[serde(default = "default_price_source")]
    pub source: String,
    #[serde(default = "default_price_min_poll_secs")]
    pub min_poll_secs: u64,
    #[serde(default = "default_price_max_poll_secs")]
    pub max_poll_secs: u64,
    #[serde(default = "bool_true")]
    pub autostart: bool,
    #[serde(default = "bool_true")]
    pub check_on_startup: bool,
    /// Route the cached document is served under.
    #[serde(default = "default_price_path")]
    pub path: String,
}

fn default_price_source() -> String {
    "https://api.coinmarketcap.com/v1/ticker/RISE/".to_string()
}
fn default_price_min_poll_secs() -> u64 { 480 }
fn default_price_max_poll_secs() -> u64 { 540 }
fn default_price_path() -> String {
    "/prices".to_string()
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            source: default_price_source(),
            min_poll_secs: default_price_min_poll_secs(),
            max_poll_secs: default_price_max_poll_secs(),
            autostart: true,
            check_on_startup: true,
            path: default_price_path(),
        }
    }
}

impl PriceConfig {
    pub fn poll_interval(&self) -> Result<Duration, ConfigError> {
        PollInterval::from_secs(self.min_poll_secs, self.max_poll_secs)
            .resolve(PRICE_POLL_BOUNDS, "price")
    }

    /// Check that `path` can be mounted next to the fixed routes: not empty,
    /// no `:`/`*` segments, no overlap with [`RESERVED_PATHS`] or `/history/`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let trimmed = self.path.trim().trim_matches('/');
        let invalid = |reason| ConfigError::InvalidRoutePath {
            path: self.path.clone(),
            reason,
        };
        if trimmed.is_empty() {
            return Err(invalid("is empty"));
        }
        if trimmed.contains([':', '*', '{', '}']) {
            return Err(invalid("must not contain route parameters or wildcards"));
        }
        let path = format!("/{trimmed}");
        if RESERVED_PATHS.contains(&path.as_str()) || path.starts_with("/history/") {
            return Err(invalid("is already served by another route"));
        }
        Ok(())
    }
}
