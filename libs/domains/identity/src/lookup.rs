use observability::IdentityMetrics;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::error::{IdentityError, IdentityResult};
use crate::models::UserRecord;
use crate::store::IdentityRepository;

type LookupTask = JoinHandle<IdentityResult<Option<UserRecord>>>;

/// A lookup running on the worker runtime.
///
/// Resolves to `Some(record)`, or `None` when the user was removed between
/// scheduling and resolution. Dropping the handle does not cancel the work.
#[derive(Debug)]
pub struct LookupHandle {
    task: LookupTask,
}

impl LookupHandle {
    /// Cancel the underlying task
    pub fn abort(&self) {
        self.task.abort();
    }

    pub(crate) fn into_task(self) -> LookupTask {
        self.task
    }
}

impl From<LookupTask> for LookupHandle {
    fn from(task: LookupTask) -> Self {
        Self { task }
    }
}

/// Runs username lookups off the caller's task, optionally after a delay.
///
/// Both operations check existence first: an absent username fails with
/// `NotFound` immediately and no work is dispatched. The check is point in
/// time; the read itself happens when the worker runs.
///
/// `max_in_flight` bounds concurrent store reads. A delayed lookup only
/// takes a permit once its delay has elapsed.
pub struct AsyncLookupScheduler<R: IdentityRepository> {
    store: Arc<R>,
    runtime: Handle,
    permits: Arc<Semaphore>,
    scheduled: AtomicU64,
    skipped: AtomicU64,
}

impl<R: IdentityRepository + 'static> AsyncLookupScheduler<R> {
    /// Scheduler on the current Tokio runtime with at most `max_in_flight`
    /// lookups executing at once.
    pub fn new(store: Arc<R>, max_in_flight: usize) -> IdentityResult<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| IdentityError::Internal(format!("no Tokio runtime for lookups: {e}")))?;
        Ok(Self::with_runtime(store, max_in_flight, runtime))
    }

    /// Scheduler dispatching onto `runtime`
    pub fn with_runtime(store: Arc<R>, max_in_flight: usize, runtime: Handle) -> Self {
        Self {
            store,
            runtime,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
            scheduled: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }

    pub async fn lookup(&self, username: &str) -> IdentityResult<LookupHandle> {
        self.schedule(username, None).await
    }

    /// Like [`lookup`](Self::lookup), but the worker sleeps `delay` before
    /// reading the store.
    pub async fn lookup_delayed(
        &self,
        username: &str,
        delay: Duration,
    ) -> IdentityResult<LookupHandle> {
        self.schedule(username, Some(delay)).await
    }

    /// Lookups dispatched to the worker runtime
    pub fn scheduled(&self) -> u64 {
        self.scheduled.load(Ordering::Relaxed)
    }

    /// Lookups answered not-found without dispatching work
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    async fn schedule(
        &self,
        username: &str,
        delay: Option<Duration>,
    ) -> IdentityResult<LookupHandle> {
        if !self.store.exists(username).await {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            IdentityMetrics::record_lookup_skipped();
            tracing::debug!(username, "Lookup skipped, user absent");
            return Err(IdentityError::NotFound(username.to_string()));
        }

        let store = Arc::clone(&self.store);
        let permits = Arc::clone(&self.permits);
        let name = username.to_string();

        let task = self.runtime.spawn(async move {
            // Sleeping holds no permit, so abandoned delayed lookups cannot
            // starve later ones.
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| IdentityError::Internal(e.to_string()))?;

            Ok(store.find_by_username(&name).await)
        });

        self.scheduled.fetch_add(1, Ordering::Relaxed);
        IdentityMetrics::record_lookup_scheduled(delay.is_some());
        tracing::debug!(
            username,
            delay_ms = delay.map(|d| d.as_millis() as u64),
            "Lookup scheduled"
        );

        Ok(LookupHandle::from(task))
    }
}
