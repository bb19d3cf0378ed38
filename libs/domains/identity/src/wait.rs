use observability::{IdentityMetrics, LookupOutcome};
use std::any::Any;
use std::time::{Duration, Instant};
use tokio::task::JoinError;

use crate::error::WaitError;
use crate::lookup::LookupHandle;
use crate::models::UserRecord;

/// Waits on a [`LookupHandle`] for at most a fixed deadline.
///
/// Every wait ends in exactly one of: resolved, interrupted, faulted or
/// timed out. A timed-out lookup keeps running on the worker runtime and its
/// result is discarded.
#[derive(Debug, Clone, Copy)]
pub struct BoundedWait {
    deadline: Duration,
}

impl BoundedWait {
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    pub async fn wait(&self, handle: LookupHandle) -> Result<Option<UserRecord>, WaitError> {
        let started = Instant::now();
        let result = match tokio::time::timeout(self.deadline, handle.into_task()).await {
            Ok(Ok(Ok(record))) => Ok(record),
            Ok(Ok(Err(error))) => Err(WaitError::Faulted(error.to_string())),
            Ok(Err(join_error)) => Err(classify(join_error)),
            Err(_) => Err(WaitError::TimedOut(self.deadline)),
        };

        IdentityMetrics::record_lookup_outcome(outcome(&result), started.elapsed());
        result
    }
}

fn outcome(result: &Result<Option<UserRecord>, WaitError>) -> LookupOutcome {
    match result {
        Ok(Some(_)) => LookupOutcome::Resolved,
        Ok(None) => LookupOutcome::ResolvedMissing,
        Err(WaitError::Interrupted) => LookupOutcome::Interrupted,
        Err(WaitError::Faulted(_)) => LookupOutcome::Faulted,
        Err(WaitError::TimedOut(_)) => LookupOutcome::TimedOut,
    }
}

fn classify(error: JoinError) -> WaitError {
    if error.is_cancelled() {
        return WaitError::Interrupted;
    }

    match error.try_into_panic() {
        Ok(payload) => WaitError::Faulted(panic_message(payload.as_ref())),
        Err(error) => WaitError::Faulted(error.to_string()),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "lookup task panicked".to_string()
    }
}
