//! Application state management.
//!
//! The shared state passed to the app-level handlers:
//! - Configuration
//! - The identity service (directory, lookup scheduler, credential realm)

use domain_identity::{IdentityService, InMemoryIdentityStore};
use std::sync::Arc;

use crate::config::Config;

/// Shared application state.
///
/// Cloned for each handler; the service sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub identity: Arc<IdentityService<InMemoryIdentityStore>>,
}
