//! Readiness handler for the identity service.

use crate::state::AppState;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use axum_helpers::server::{HealthCheckFuture, run_health_checks};
use domain_identity::IdentityRepository;

/// Readiness check: the directory must answer a read.
///
/// Uses the generic `run_health_checks` utility from axum-helpers.
pub async fn ready_handler(State(state): State<AppState>) -> Response {
    let checks: Vec<(&str, HealthCheckFuture<'_>)> = vec![(
        "directory",
        Box::pin(async {
            let size = state.identity.store().len().await;
            tracing::debug!(size, "Directory readiness probe");
            Ok::<(), String>(())
        }),
    )];

    run_health_checks(checks).await.into_response()
}
