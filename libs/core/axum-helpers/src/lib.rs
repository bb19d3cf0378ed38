//! # Axum Helpers
//!
//! Shared building blocks for the service's HTTP layer.
//!
//! ## Modules
//!
//! - **[`auth`]**: HTTP Basic authentication against an in-memory credential realm
//! - **[`server`]**: Router setup, health checks, graceful shutdown
//! - **[`errors`]**: Structured error responses with error codes
//! - **[`extractors`]**: Validated JSON extractor

pub mod auth;
pub mod errors;
pub mod extractors;
pub mod server;

pub use auth::{AuthRejection, Caller, CredentialRealm, Role};

pub use server::{
    HealthCheckFuture, HealthResponse, ShutdownCoordinator, create_production_app, create_router,
    health_router, run_health_checks,
};

pub use errors::{ErrorCode, ErrorResponse};

pub use extractors::ValidatedJson;
