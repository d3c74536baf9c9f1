//! Background cache population.
//!
//! Cache writes after a fallback read, and counter bumps after an insert,
//! run as detached tokio tasks so the caller returns as soon as the source
//! of truth answers. A semaphore bounds how many of them touch the store at
//! once. Failures are logged and counted, never surfaced.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use imgboard_core::CacheResult;
use tokio::runtime::Handle;
use tokio::sync::{Notify, Semaphore};
use tracing::{error, warn};

use super::namespace::Namespace;
use super::stats::StatsRecorder;

/// What a background task does, for logging and stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Write a value fetched from the source of truth.
    Populate,
    /// Bump a namespace counter after an insert.
    Invalidate,
}

/// Bounded executor for fire-and-forget cache work.
#[derive(Clone)]
pub struct Populator {
    permits: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
    idle: Arc<Notify>,
    stats: Arc<StatsRecorder>,
}

/// Decrements the in-flight count when a task finishes, panics, or is
/// dropped with its runtime.
struct InFlightGuard {
    in_flight: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

impl Populator {
    /// Create a populator allowing `concurrency` tasks to run at once.
    pub fn new(concurrency: usize, stats: Arc<StatsRecorder>) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            in_flight: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(Notify::new()),
            stats,
        }
    }

    /// Number of spawned tasks that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Detach `task`. Returns immediately; the task waits for a permit.
    ///
    /// Outside a tokio runtime the work is dropped and counted as failed.
    pub fn spawn<F>(&self, kind: TaskKind, namespace: Namespace, key: String, task: F)
    where
        F: Future<Output = CacheResult<()>> + Send + 'static,
    {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!(%namespace, key = %key, error = %e, "No runtime for background cache task");
                self.record_failure(kind);
                return;
            }
        };

        self.in_flight.fetch_add(1, Ordering::AcqRel);
        let guard = InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            idle: Arc::clone(&self.idle),
        };
        let permits = Arc::clone(&self.permits);
        let populator = self.clone();

        handle.spawn(async move {
            let _guard = guard;
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };

            if let Err(e) = task.await {
                match kind {
                    TaskKind::Populate => {
                        error!(%namespace, key = %key, error = %e, "Background cache population failed");
                    }
                    TaskKind::Invalidate => {
                        warn!(%namespace, error = %e, "Namespace invalidation failed");
                    }
                }
                populator.record_failure(kind);
            }
        });
    }

    fn record_failure(&self, kind: TaskKind) {
        match kind {
            TaskKind::Populate => self.stats.record_populate_failure(),
            TaskKind::Invalidate => self.stats.record_invalidation_failure(),
        }
    }

    /// Wait until every spawned task has finished.
    #[cfg(any(test, feature = "testing"))]
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            let mut notified = std::pin::pin!(notified);
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}
