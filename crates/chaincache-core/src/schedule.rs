//! Recurring timer shared by the transaction poller and the price watcher.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// A cancellable interval timer.
///
/// The first tick fires one full `period` after [`start`](Self::start). Each
/// tick spawns its job as a detached task, so [`stop`](Self::stop) cancels
/// future ticks without cutting short a job that is already running.
pub struct PeriodicTask {
    name: &'static str,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PeriodicTask {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            handle: Mutex::new(None),
        }
    }

    /// Start ticking. Returns `false` (and logs a warning) if already running.
    pub fn start<F, Fut>(&self, period: Duration, mut job: F) -> bool
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            tracing::warn!(
                task = self.name,
                "already running; call stop() before starting again"
            );
            return false;
        }

        let name = self.name;
        *slot = Some(tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                tracing::trace!(task = name, "tick");
                tokio::spawn(job());
            }
        }));
        tracing::info!(task = self.name, period_ms = period.as_millis() as u64, "started");
        true
    }

    /// Cancel future ticks. Returns `false` (and logs a warning) if not running.
    pub fn stop(&self) -> bool {
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match handle {
            Some(h) => {
                h.abort();
                tracing::info!(task = self.name, "stopped");
                true
            }
            None => {
                tracing::warn!(task = self.name, "stop() called but not running");
                false
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        if let Some(h) = self
            .handle
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            h.abort();
        }
    }
}

impl std::fmt::Debug for PeriodicTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicTask")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .finish()
    }
}
