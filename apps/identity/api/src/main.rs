use axum::routing::get;
use axum_helpers::{
    CredentialRealm,
    server::{create_production_app, health_router},
};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_identity::{ApiDoc, IdentityRepository, IdentityService, InMemoryIdentityStore};
use observability::{IdentityMetrics, init_metrics, metrics_handler, metrics_middleware};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod api;
mod config;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Install color-eyre first for colored error output (before any fallible operations)
    install_color_eyre();

    // Load configuration from environment variables
    let config = Config::from_env()?;

    // Initialize tracing with ErrorLayer for span trace capture
    init_tracing(&config.environment);

    init_metrics().map_err(|e| eyre::eyre!("Failed to install metrics recorder: {}", e))?;

    let store = if config.lookup.seed_demo_users {
        info!("Seeding directory with demo users");
        InMemoryIdentityStore::with_demo_records()
    } else {
        InMemoryIdentityStore::new()
    };
    IdentityMetrics::set_directory_size(store.len().await);

    let realm = CredentialRealm::with_defaults();
    info!(realm = realm.name(), "Credential realm ready");

    let identity = IdentityService::new(store, realm, &config.lookup)
        .map_err(|e| eyre::eyre!("Failed to build identity service: {}", e))?;

    info!(
        timeout_secs = config.lookup.timeout.as_secs(),
        max_in_flight = config.lookup.max_in_flight,
        "Async lookups configured"
    );

    let state = AppState {
        config,
        identity: Arc::new(identity),
    };

    // Build router with API routes (pass reference, not ownership!)
    let api_routes = api::routes(&state);

    // create_router adds docs/middleware to our composed routes
    let router = axum_helpers::create_router::<ApiDoc>(api_routes)?;

    // Merge health endpoints into the app
    // - /health: liveness check with app name/version
    // - /ready: readiness check against the directory
    // - /metrics: Prometheus exposition
    let app = router
        .merge(health_router(state.config.app))
        .merge(api::ready_router(state.clone()))
        .route("/metrics", get(metrics_handler))
        .layer(axum::middleware::from_fn(metrics_middleware));

    info!("Starting identity API with graceful shutdown (30s timeout)");

    let server = state.config.server.clone();
    create_production_app(app, &server, Duration::from_secs(30), async move {
        // Await before logging; the macro's temporaries are not Send.
        let users = state.identity.store().len().await;
        let scheduler = state.identity.scheduler();
        info!(
            lookups_scheduled = scheduler.scheduled(),
            lookups_skipped = scheduler.skipped(),
            users,
            "Shutting down: dropping in-memory directory"
        );
    })
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Identity API shutdown complete");
    Ok(())
}
