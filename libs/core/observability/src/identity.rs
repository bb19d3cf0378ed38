//! Directory and lookup metrics.

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// How a bounded wait on a lookup ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    Resolved,
    ResolvedMissing,
    Interrupted,
    Faulted,
    TimedOut,
}

impl LookupOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupOutcome::Resolved => "resolved",
            LookupOutcome::ResolvedMissing => "resolved_missing",
            LookupOutcome::Interrupted => "interrupted",
            LookupOutcome::Faulted => "faulted",
            LookupOutcome::TimedOut => "timed_out",
        }
    }
}

/// Identity metrics recorder
pub struct IdentityMetrics;

impl IdentityMetrics {
    pub fn record_user_created() {
        counter!("identity_users_created_total").increment(1);
    }

    pub fn record_users_deleted(count: usize) {
        counter!("identity_users_deleted_total").increment(count as u64);
    }

    pub fn record_save_conflict() {
        counter!("identity_save_conflicts_total").increment(1);
    }

    pub fn set_directory_size(size: usize) {
        gauge!("identity_directory_size").set(size as f64);
    }

    pub fn record_lookup_scheduled(delayed: bool) {
        counter!(
            "identity_lookups_scheduled_total",
            "delayed" => if delayed { "true" } else { "false" }
        )
        .increment(1);
    }

    pub fn record_lookup_skipped() {
        counter!("identity_lookups_skipped_total").increment(1);
    }

    pub fn record_lookup_outcome(outcome: LookupOutcome, waited: Duration) {
        counter!(
            "identity_lookup_outcomes_total",
            "outcome" => outcome.as_str()
        )
        .increment(1);

        histogram!(
            "identity_lookup_wait_seconds",
            "outcome" => outcome.as_str()
        )
        .record(waited.as_secs_f64());

        tracing::debug!(
            outcome = outcome.as_str(),
            waited_ms = waited.as_millis() as u64,
            "Lookup wait finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        IdentityMetrics::record_user_created();
        IdentityMetrics::record_lookup_outcome(LookupOutcome::TimedOut, Duration::from_millis(5));
        IdentityMetrics::set_directory_size(3);
    }

    #[test]
    fn test_outcome_labels_are_distinct() {
        let labels = [
            LookupOutcome::Resolved,
            LookupOutcome::ResolvedMissing,
            LookupOutcome::Interrupted,
            LookupOutcome::Faulted,
            LookupOutcome::TimedOut,
        ]
        .map(|o| o.as_str());
        let unique: std::collections::HashSet<_> = labels.iter().collect();
        assert_eq!(unique.len(), labels.len());
    }
}
