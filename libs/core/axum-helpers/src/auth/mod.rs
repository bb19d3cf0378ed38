//! HTTP Basic authentication against an in-memory credential realm.
//!
//! # Example
//!
//! ```ignore
//! use axum::extract::FromRef;
//! use axum_helpers::auth::{Caller, CredentialRealm};
//!
//! #[derive(Clone)]
//! struct AppState {
//!     realm: CredentialRealm,
//! }
//!
//! impl FromRef<AppState> for CredentialRealm {
//!     fn from_ref(state: &AppState) -> Self {
//!         state.realm.clone()
//!     }
//! }
//!
//! async fn whoami(caller: Caller) -> String {
//!     caller.username().to_string()
//! }
//! ```

pub mod caller;
pub mod realm;

pub use caller::{AuthRejection, Caller, Role};
pub use realm::{CredentialRealm, DEFAULT_REALM};
