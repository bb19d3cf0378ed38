//! Observability utilities for the identity service.
//!
//! - Prometheus metrics recorder and `/metrics` rendering
//! - Axum middleware for per-request HTTP metrics
//! - Directory and lookup metrics recorded by the identity domain
//!
//! # Example
//!
//! ```rust,ignore
//! use observability::{init_metrics, metrics_handler, IdentityMetrics};
//!
//! init_metrics()?;
//! IdentityMetrics::record_user_created();
//!
//! let app = Router::new().route("/metrics", get(metrics_handler));
//! ```

pub mod identity;
pub mod middleware;

pub use identity::{IdentityMetrics, LookupOutcome};
pub use middleware::metrics_middleware;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::info;

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder once per process.
///
/// Later calls return the handle installed by the first one.
pub fn init_metrics() -> Result<&'static PrometheusHandle, BuildError> {
    METRICS_HANDLE.get_or_try_init(|| {
        let handle = PrometheusBuilder::new().install_recorder()?;
        info!("Prometheus metrics recorder initialized");
        register_metric_descriptions();
        Ok(handle)
    })
}

/// Get the metrics handle (None until `init_metrics` succeeded)
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Axum handler for the /metrics endpoint
pub async fn metrics_handler() -> String {
    match get_metrics_handle() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}

fn register_metric_descriptions() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // HTTP metrics
    describe_counter!("http_requests_total", "Total number of HTTP requests");
    describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_counter!(
        "http_requests_errors_total",
        "Total number of HTTP responses with 4xx or 5xx status"
    );

    // Directory metrics
    describe_counter!(
        "identity_users_created_total",
        "Users added to the directory"
    );
    describe_counter!(
        "identity_users_deleted_total",
        "Users removed from the directory"
    );
    describe_counter!(
        "identity_save_conflicts_total",
        "Create requests rejected because the username exists"
    );
    describe_gauge!("identity_directory_size", "Users currently in the directory");

    // Async lookup metrics
    describe_counter!(
        "identity_lookups_scheduled_total",
        "Async lookups dispatched to the worker runtime"
    );
    describe_counter!(
        "identity_lookups_skipped_total",
        "Async lookups answered not-found without dispatching work"
    );
    describe_counter!(
        "identity_lookup_outcomes_total",
        "Bounded waits by outcome"
    );
    describe_histogram!(
        "identity_lookup_wait_seconds",
        "Time spent in a bounded wait"
    );
}
