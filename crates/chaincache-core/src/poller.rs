//! Transaction poller: the timer, the refresh cycle and failure handling.
//!
//! ```text
//! tick ─► getHeight ─► (height advanced?) ─► listTransactions(fromHeight) ─► commit
//!              │                                      │
//!              └──────────── failure ─────────────────┘
//!                               │
//!                  FailurePolicy (count / rotate)
//!                               │
//!                 first attempt? ─► one retry after 8–9.5 s
//! ```
//!
//! Refresh attempts are serialized by the async mutex that owns the
//! [`FailurePolicy`], so a retry and a tick never interleave. A tick that
//! finds the mutex held is dropped rather than queued. The cache write lock is
//! only taken for the final in-memory commit.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::cache::TransactionCache;
use crate::client::NodeClient;
use crate::config::PollerConfig;
use crate::error::{ConfigError, TransportError};
use crate::policy::{Attempt, FailurePolicy};
use crate::pool::NodePool;
use crate::schedule::PeriodicTask;
use crate::types::TransactionFilter;

pub const RUNNING_MESSAGE: &str = "Service is active and running...";
pub const STOPPED_MESSAGE: &str = "Service is not active";
pub const NO_DATA_MESSAGE: &str = "No data available... System is not running...";

/// Result of one refresh attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// A new snapshot was committed.
    Updated { height: u64, transactions: usize },
    /// The node has nothing newer than the last committed height.
    Unchanged { height: u64 },
    /// The node answered with an unexpected payload. State is untouched.
    Malformed { reason: String },
    /// `stop()` ran while the attempt waited for the previous one. The node
    /// was not contacted.
    Cancelled,
    /// Connectivity failure, handed to the failure policy.
    Failed {
        error: String,
        rotated_to: Option<usize>,
        retry_after: Option<Duration>,
    },
}

/// Point-in-time view of a poller, as served by the status route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub date: DateTime<Utc>,
    pub running: bool,
    pub message: String,
    /// URL of the active node.
    pub node: String,
    pub poll_interval_ms: u64,
    pub last_height_checked: u64,
    pub last_checked_at: Option<DateTime<Utc>>,
}

/// Periodically pulls new transactions from the active node into a
/// [`TransactionCache`].
pub struct Poller {
    inner: Arc<PollerInner>,
    ticker: PeriodicTask,
}

struct PollerInner {
    pool: Arc<NodePool>,
    cache: Arc<TransactionCache>,
    policy: tokio::sync::Mutex<FailurePolicy>,
    /// Pending retry. Its lock also guards epoch bumps, so a retry is either
    /// scheduled before `stop()` (and aborted by it) or not at all.
    retry_task: Mutex<Option<JoinHandle<()>>>,
    /// Bumped by `stop()`. A refresh from an older epoch neither contacts the
    /// node nor schedules a retry.
    epoch: AtomicU64,
    poll_interval: Duration,
    initial_block_window: u64,
    transaction_limit: u32,
    updates: watch::Sender<u64>,
}

impl Poller {
    /// Build a poller over `pool` with a fresh, empty cache.
    pub fn new(pool: Arc<NodePool>, config: PollerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (updates, _) = watch::channel(0);
        let policy = FailurePolicy::new(config.error_threshold, config.rotate_nodes, config.retry);
        Ok(Self {
            inner: Arc::new(PollerInner {
                pool,
                cache: Arc::new(TransactionCache::new()),
                policy: tokio::sync::Mutex::new(policy),
                retry_task: Mutex::new(None),
                epoch: AtomicU64::new(0),
                poll_interval: config.poll_interval,
                initial_block_window: config.initial_block_window,
                transaction_limit: config.transaction_limit,
                updates,
            }),
            ticker: PeriodicTask::new("transaction-poller"),
        })
    }

    /// Start the recurring refresh. Returns `false` if already running.
    pub fn start(&self) -> bool {
        let inner = Arc::clone(&self.inner);
        self.ticker.start(self.inner.poll_interval, move || {
            let inner = Arc::clone(&inner);
            let epoch = inner.epoch.load(Ordering::SeqCst);
            async move {
                inner.tick(epoch).await;
            }
        })
    }

    /// Stop the timer and cancel any pending retry.
    ///
    /// Returns `false` if the timer was not running; a pending retry is
    /// cancelled either way.
    pub fn stop(&self) -> bool {
        self.inner.cancel_retry();
        self.ticker.stop()
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_running()
    }

    /// Run one refresh attempt and wait for it.
    pub async fn run_once(&self, attempt: Attempt) -> PollOutcome {
        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        Arc::clone(&self.inner).refresh(attempt, epoch).await
    }

    /// Run one refresh attempt in the background.
    pub fn trigger(&self) {
        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        tokio::spawn(Arc::clone(&self.inner).refresh(Attempt::First, epoch));
    }

    pub fn poll_interval(&self) -> Duration {
        self.inner.poll_interval
    }

    pub fn cache(&self) -> &Arc<TransactionCache> {
        &self.inner.cache
    }

    pub fn pool(&self) -> &Arc<NodePool> {
        &self.inner.pool
    }

    /// Receiver that observes the height of every commit.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.updates.subscribe()
    }

    /// Current consecutive-failure count. Waits for a refresh in flight to
    /// release the policy first.
    pub async fn consecutive_errors(&self) -> u32 {
        self.inner.policy.lock().await.consecutive_errors()
    }

    /// Returns `true` if a retry is scheduled but has not fired yet.
    pub fn retry_pending(&self) -> bool {
        self.inner
            .retry_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    pub fn status(&self) -> StatusReport {
        let state = self.inner.cache.snapshot();
        let running = self.is_running();
        let message = if running {
            RUNNING_MESSAGE
        } else if state.last_checked_at.is_none() {
            NO_DATA_MESSAGE
        } else {
            STOPPED_MESSAGE
        };
        StatusReport {
            date: Utc::now(),
            running,
            message: message.to_string(),
            node: self.inner.pool.active_url(),
            poll_interval_ms: self.inner.poll_interval.as_millis() as u64,
            last_height_checked: state.last_height_checked,
            last_checked_at: state.last_checked_at,
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.inner.cancel_retry();
    }
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("pool", &self.inner.pool)
            .field("poll_interval", &self.inner.poll_interval)
            .field("running", &self.is_running())
            .finish()
    }
}

impl PollerInner {
    /// Timer entry point. `epoch` is read when the tick fires. Skips the tick
    /// when a refresh or retry still holds the policy.
    async fn tick(self: Arc<Self>, epoch: u64) {
        let Ok(mut policy) = self.policy.try_lock() else {
            tracing::debug!("previous refresh still running; tick skipped");
            return;
        };
        if self.epoch.load(Ordering::SeqCst) != epoch {
            return;
        }
        self.refresh_locked(&mut policy, Attempt::First, epoch).await;
    }

    /// Waits for the policy, then refreshes unless `stop()` ran since `epoch`
    /// was read.
    async fn refresh(self: Arc<Self>, attempt: Attempt, epoch: u64) -> PollOutcome {
        let mut policy = self.policy.lock().await;
        if self.epoch.load(Ordering::SeqCst) != epoch {
            tracing::debug!(?attempt, "poller stopped while waiting; refresh cancelled");
            return PollOutcome::Cancelled;
        }
        self.refresh_locked(&mut policy, attempt, epoch).await
    }

    async fn refresh_locked(
        self: &Arc<Self>,
        policy: &mut FailurePolicy,
        attempt: Attempt,
        epoch: u64,
    ) -> PollOutcome {
        self.cache.mark_checked(Utc::now());

        let node = self.pool.active();
        let height = match node.get_height().await {
            Ok(resp) => {
                policy.record_success();
                resp.height
            }
            Err(e) => return self.on_failure(policy, attempt, epoch, node.as_ref(), e),
        };

        let last = self.cache.last_height_checked();
        if height <= last {
            tracing::debug!(node = %node.url(), height, last, "no new blocks");
            return PollOutcome::Unchanged { height };
        }

        let from_height = if last > 0 {
            last
        } else {
            height.saturating_sub(self.initial_block_window)
        };
        let filter = TransactionFilter::window(from_height, self.transaction_limit);
        let resp = match node.list_transactions(&filter).await {
            Ok(resp) => resp,
            Err(e) => return self.on_failure(policy, attempt, epoch, node.as_ref(), e),
        };

        let Some(snapshot) = resp.into_snapshot() else {
            tracing::warn!(node = %node.url(), height, "transaction list reported no success");
            return PollOutcome::Malformed {
                reason: "unsuccessful transaction list".to_string(),
            };
        };

        let transactions = snapshot.transactions.len();
        if !self.cache.commit(height, snapshot) {
            return PollOutcome::Unchanged { height };
        }
        self.updates.send_replace(height);
        tracing::info!(node = %node.url(), height, from_height, transactions, "cache updated");
        PollOutcome::Updated {
            height,
            transactions,
        }
    }

    fn on_failure(
        self: &Arc<Self>,
        policy: &mut FailurePolicy,
        attempt: Attempt,
        epoch: u64,
        node: &dyn NodeClient,
        error: TransportError,
    ) -> PollOutcome {
        if !error.is_retryable() {
            tracing::warn!(node = %node.url(), error = %error, "malformed node response");
            return PollOutcome::Malformed {
                reason: error.to_string(),
            };
        }

        let action = policy.record_failure(attempt, &self.pool);
        if attempt.is_retry() {
            tracing::error!(
                node = %node.url(),
                error = %error,
                consecutive = policy.consecutive_errors(),
                "retry failed; waiting for next tick"
            );
        } else {
            tracing::warn!(
                node = %node.url(),
                error = %error,
                consecutive = policy.consecutive_errors(),
                "poll failed"
            );
        }

        let retry_after = action
            .retry_after
            .filter(|&delay| self.schedule_retry(delay, epoch));

        PollOutcome::Failed {
            error: error.to_string(),
            rotated_to: action.rotated_to,
            retry_after,
        }
    }

    /// Schedule the single retry, replacing any pending one. Returns `false`
    /// without scheduling if the poller was stopped since `epoch`.
    fn schedule_retry(self: &Arc<Self>, delay: Duration, epoch: u64) -> bool {
        let mut slot = self
            .retry_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.epoch.load(Ordering::SeqCst) != epoch {
            tracing::debug!("poller stopped; retry dropped");
            return false;
        }

        tracing::info!(delay_ms = delay.as_millis() as u64, "retry scheduled");
        let inner = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(inner.refresh(Attempt::Retry, epoch));
        });
        if let Some(old) = slot.replace(handle) {
            old.abort();
        }
        true
    }

    /// Bump the epoch and abort the pending retry, under the retry lock.
    fn cancel_retry(&self) {
        let mut slot = self
            .retry_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}
