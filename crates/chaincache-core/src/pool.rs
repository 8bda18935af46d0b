//! Ordered node pool with a single active endpoint.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::client::NodeClient;
use crate::error::ConfigError;

/// Ordered list of candidate nodes plus the index of the active one.
///
/// Every query goes to the active node. The index only moves when the
/// failure policy calls [`NodePool::rotate`], and it wraps past the end.
pub struct NodePool {
    nodes: Vec<Arc<dyn NodeClient>>,
    active: AtomicUsize,
}

impl NodePool {
    /// Build a pool from an ordered list of clients. The first one starts active.
    pub fn new(nodes: Vec<Arc<dyn NodeClient>>) -> Result<Self, ConfigError> {
        if nodes.is_empty() {
            return Err(ConfigError::NoNodes);
        }
        Ok(Self {
            nodes,
            active: AtomicUsize::new(0),
        })
    }

    /// Number of nodes in the pool.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`; construction rejects an empty list.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn active_index(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Client for the active node.
    pub fn active(&self) -> Arc<dyn NodeClient> {
        Arc::clone(&self.nodes[self.active_index()])
    }

    /// URL of the active node.
    pub fn active_url(&self) -> String {
        self.nodes[self.active_index()].url().to_string()
    }

    /// URLs of every node, in rotation order.
    pub fn endpoints(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.url().to_string()).collect()
    }

    /// Make the next node active (wrapping to the first) and return its index.
    pub fn rotate(&self) -> usize {
        let len = self.nodes.len();
        let next = (self.active_index() + 1) % len;
        self.active.store(next, Ordering::Release);
        tracing::info!(node = %self.nodes[next].url(), index = next, "switched active node");
        next
    }
}

impl std::fmt::Debug for NodePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodePool")
            .field("endpoints", &self.endpoints())
            .field("active", &self.active_index())
            .finish()
    }
}
