//! Identity Domain
//!
//! In-memory user directory with role-checked CRUD and a bounded
//! asynchronous lookup path.
//!
//! # Features
//!
//! - Case-insensitive, unique usernames with store-assigned ids
//! - Concurrent reads, exclusive writes (one `RwLock` over the directory)
//! - Async lookups on a worker runtime, optionally delayed
//! - Bounded waits that tell interruption, faults and timeouts apart
//! - Credential grant/revoke kept in step with the directory
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints, Basic auth extraction
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Role checks, credential side effects
//! └──┬───────┬──┘
//!    │       │
//!    │  ┌────▼──────────────┐
//!    │  │ Lookup + Wait     │  ← Worker dispatch, deadline classification
//!    │  └────┬──────────────┘
//!    │       │
//! ┌──▼───────▼──┐
//! │    Store    │  ← Directory (trait + in-memory implementation)
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← Records, inputs, status
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use axum_helpers::CredentialRealm;
//! use domain_identity::{handlers, IdentityService, InMemoryIdentityStore, LookupConfig};
//! use std::sync::Arc;
//!
//! # async fn build() -> domain_identity::IdentityResult<()> {
//! let store = InMemoryIdentityStore::with_demo_records();
//! let service = IdentityService::new(store, CredentialRealm::with_defaults(), &LookupConfig::default())?;
//!
//! let router = handlers::router(Arc::new(service));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod lookup;
pub mod models;
pub mod service;
pub mod store;
pub mod wait;

// Re-export commonly used types
pub use config::LookupConfig;
pub use error::{IdentityError, IdentityResult, WaitError};
pub use handlers::ApiDoc;
pub use lookup::{AsyncLookupScheduler, LookupHandle};
pub use models::{NewUser, Status, UserPatch, UserRecord};
pub use service::IdentityService;
pub use store::{IdentityRepository, InMemoryIdentityStore};
pub use wait::BoundedWait;
