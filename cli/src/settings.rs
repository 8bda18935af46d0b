//! Settings file for `chaincache serve`.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use chaincache_core::ListenerConfig;
use chaincache_http::RouteConfig;

use crate::logging::LogConfig;

/// Everything the server reads at startup. Every section is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Socket address to listen on. `PORT` overrides the port.
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub routes: RouteConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub listener: ListenerConfig,
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            routes: RouteConfig::default(),
            log: LogConfig::default(),
            listener: ListenerConfig::default(),
        }
    }
}

impl Settings {
    /// Read `path` as JSON, or use the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read settings file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid settings file {}", path.display()))
    }

    /// `bind` with its port replaced by `port`, when one is given.
    pub fn bind_addr(&self, port: Option<&str>) -> String {
        match port.map(str::trim).filter(|p| !p.is_empty()) {
            Some(port) => {
                let host = self
                    .bind
                    .rsplit_once(':')
                    .map_or(self.bind.as_str(), |(host, _)| host);
                format!("{host}:{port}")
            }
            None => self.bind.clone(),
        }
    }
}
