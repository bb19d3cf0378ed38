use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderValue, header, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::realm::CredentialRealm;
use crate::errors::{ErrorCode, ErrorResponse};

/// Capabilities a caller can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "USER"),
            Role::Admin => write!(f, "ADMIN"),
        }
    }
}

/// The authenticated principal of a request, with its role set.
///
/// Handlers take a `Caller` argument and pass it to the service layer, which
/// checks the role it needs once per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    username: String,
    roles: Vec<Role>,
}

impl Caller {
    pub fn new(username: String, roles: Vec<Role>) -> Self {
        Self { username, roles }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}

/// Why a request could not be turned into a [`Caller`].
#[derive(Debug, Error)]
pub enum AuthRejection {
    #[error("Missing or malformed Basic credentials")]
    MissingCredentials { realm: String },

    #[error("Invalid credentials")]
    InvalidCredentials { realm: String },
}

impl AuthRejection {
    fn realm(&self) -> &str {
        match self {
            AuthRejection::MissingCredentials { realm }
            | AuthRejection::InvalidCredentials { realm } => realm,
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let challenge = HeaderValue::from_str(&format!("Basic realm=\"{}\"", self.realm()))
            .unwrap_or_else(|_| HeaderValue::from_static("Basic"));

        let mut response = ErrorResponse::new(ErrorCode::Unauthorized, self.to_string())
            .into_response_with(ErrorCode::Unauthorized);
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, challenge);
        response
    }
}

impl<S> FromRequestParts<S> for Caller
where
    CredentialRealm: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let realm = CredentialRealm::from_ref(state);

        let TypedHeader(Authorization(basic)) =
            TypedHeader::<Authorization<Basic>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    tracing::debug!("No Basic credentials on request");
                    AuthRejection::MissingCredentials {
                        realm: realm.name().to_string(),
                    }
                })?;

        realm
            .authenticate(basic.username(), basic.password())
            .ok_or_else(|| {
                tracing::debug!(username = basic.username(), "Basic authentication failed");
                AuthRejection::InvalidCredentials {
                    realm: realm.name().to_string(),
                }
            })
    }
}
