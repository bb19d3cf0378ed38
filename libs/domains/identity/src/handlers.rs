use axum::{
    Json, Router,
    extract::{FromRef, Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use axum_helpers::{Caller, CredentialRealm, ErrorResponse, ValidatedJson};
use std::sync::Arc;
use std::time::Duration;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};

use crate::error::{IdentityError, IdentityResult};
use crate::models::{NewUser, Status, UserPatch, UserRecord};
use crate::service::IdentityService;
use crate::store::IdentityRepository;

const TAG: &str = "users";

/// OpenAPI documentation for the identity API
#[derive(OpenApi)]
#[openapi(
    paths(
        create_user,
        list_users,
        get_user,
        update_user,
        delete_user,
        delete_all_users,
        get_user_async,
        get_user_async_delayed,
        info,
    ),
    components(schemas(UserRecord, NewUser, UserPatch, Status, ErrorResponse)),
    modifiers(&BasicAuthScheme),
    tags(
        (name = TAG, description = "User directory endpoints")
    )
)]
pub struct ApiDoc;

struct BasicAuthScheme;

impl Modify for BasicAuthScheme {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "basic_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Basic)),
            );
        }
    }
}

/// Router state. The `Caller` extractor takes the realm from the service.
pub struct IdentityState<R: IdentityRepository> {
    pub service: Arc<IdentityService<R>>,
}

impl<R: IdentityRepository> Clone for IdentityState<R> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

impl<R: IdentityRepository + 'static> FromRef<IdentityState<R>> for CredentialRealm {
    fn from_ref(state: &IdentityState<R>) -> Self {
        state.service.realm().clone()
    }
}

/// Create the identity router with all HTTP endpoints
pub fn router<R: IdentityRepository + 'static>(service: Arc<IdentityService<R>>) -> Router {
    let state = IdentityState { service };

    Router::new()
        .route("/api/admin/user", post(create_user).delete(delete_all_users))
        .route(
            "/api/admin/user/{userName}",
            put(update_user).delete(delete_user),
        )
        .route("/api/user", get(list_users))
        .route("/api/user/{userName}", get(get_user))
        .route("/api/async/user/{userName}", get(get_user_async))
        .route(
            "/api/async/user/{userName}/{delay}",
            get(get_user_async_delayed),
        )
        .route("/wiki/info", get(info))
        .with_state(state)
}

/// Create a user
#[utoipa::path(
    post,
    path = "/api/admin/user",
    tag = TAG,
    request_body = NewUser,
    security(("basic_auth" = [])),
    responses(
        (status = 201, description = "User created", headers(("Location" = String, description = "URL of the new user"))),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Missing or invalid credentials", body = ErrorResponse),
        (status = 403, description = "ADMIN role required", body = ErrorResponse),
        (status = 409, description = "Username already exists", body = ErrorResponse)
    )
)]
async fn create_user<R: IdentityRepository + 'static>(
    State(state): State<IdentityState<R>>,
    caller: Caller,
    ValidatedJson(input): ValidatedJson<NewUser>,
) -> IdentityResult<Response> {
    let location = HeaderValue::from_str(&format!(
        "/api/user/{}",
        urlencoding::encode(&input.username)
    ))
    .map_err(|e| IdentityError::Validation(format!("userName: {e}")))?;

    state.service.create_user(&caller, input).await?;

    Ok((StatusCode::CREATED, [(header::LOCATION, location)]).into_response())
}

/// List all users
#[utoipa::path(
    get,
    path = "/api/user",
    tag = TAG,
    security(("basic_auth" = [])),
    responses(
        (status = 200, description = "Users in id order", body = Vec<UserRecord>),
        (status = 204, description = "Directory is empty"),
        (status = 401, description = "Missing or invalid credentials", body = ErrorResponse)
    )
)]
async fn list_users<R: IdentityRepository + 'static>(
    State(state): State<IdentityState<R>>,
    caller: Caller,
) -> IdentityResult<Response> {
    let users = state.service.list_users(&caller).await?;

    if users.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    Ok(Json(users).into_response())
}

/// Get a user by username
#[utoipa::path(
    get,
    path = "/api/user/{userName}",
    tag = TAG,
    params(("userName" = String, Path, description = "Username, case-insensitive")),
    security(("basic_auth" = [])),
    responses(
        (status = 200, description = "User found", body = UserRecord),
        (status = 401, description = "Missing or invalid credentials", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
async fn get_user<R: IdentityRepository + 'static>(
    State(state): State<IdentityState<R>>,
    caller: Caller,
    Path(username): Path<String>,
) -> IdentityResult<Json<UserRecord>> {
    let user = state.service.get_user(&caller, &username).await?;
    Ok(Json(user))
}

/// Partially update a user
#[utoipa::path(
    put,
    path = "/api/admin/user/{userName}",
    tag = TAG,
    params(("userName" = String, Path, description = "Username, case-insensitive")),
    request_body = UserPatch,
    security(("basic_auth" = [])),
    responses(
        (status = 200, description = "User updated", body = UserRecord),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 403, description = "ADMIN role required", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
async fn update_user<R: IdentityRepository + 'static>(
    State(state): State<IdentityState<R>>,
    caller: Caller,
    Path(username): Path<String>,
    ValidatedJson(patch): ValidatedJson<UserPatch>,
) -> IdentityResult<Json<UserRecord>> {
    let user = state.service.update_user(&caller, &username, patch).await?;
    Ok(Json(user))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/api/admin/user/{userName}",
    tag = TAG,
    params(("userName" = String, Path, description = "Username, case-insensitive")),
    security(("basic_auth" = [])),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "ADMIN role required", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
async fn delete_user<R: IdentityRepository + 'static>(
    State(state): State<IdentityState<R>>,
    caller: Caller,
    Path(username): Path<String>,
) -> IdentityResult<StatusCode> {
    state.service.delete_user(&caller, &username).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete every user
#[utoipa::path(
    delete,
    path = "/api/admin/user",
    tag = TAG,
    security(("basic_auth" = [])),
    responses(
        (status = 204, description = "Directory cleared"),
        (status = 403, description = "ADMIN role required", body = ErrorResponse)
    )
)]
async fn delete_all_users<R: IdentityRepository + 'static>(
    State(state): State<IdentityState<R>>,
    caller: Caller,
) -> IdentityResult<StatusCode> {
    state.service.delete_all_users(&caller).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Get a user through the async lookup path
#[utoipa::path(
    get,
    path = "/api/async/user/{userName}",
    tag = TAG,
    params(("userName" = String, Path, description = "Username, case-insensitive")),
    security(("basic_auth" = [])),
    responses(
        (status = 200, description = "User found", body = UserRecord),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 408, description = "Lookup interrupted, failed or timed out", body = ErrorResponse)
    )
)]
async fn get_user_async<R: IdentityRepository + 'static>(
    State(state): State<IdentityState<R>>,
    caller: Caller,
    Path(username): Path<String>,
) -> IdentityResult<Json<UserRecord>> {
    let user = state
        .service
        .get_user_async(&caller, &username, None)
        .await?;
    Ok(Json(user))
}

/// Get a user through the async lookup path after a simulated delay
#[utoipa::path(
    get,
    path = "/api/async/user/{userName}/{delay}",
    tag = TAG,
    params(
        ("userName" = String, Path, description = "Username, case-insensitive"),
        ("delay" = u64, Path, description = "Delay before the read, in milliseconds")
    ),
    security(("basic_auth" = [])),
    responses(
        (status = 200, description = "User found", body = UserRecord),
        (status = 400, description = "Delay is not a number", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 408, description = "Lookup interrupted, failed or timed out", body = ErrorResponse)
    )
)]
async fn get_user_async_delayed<R: IdentityRepository + 'static>(
    State(state): State<IdentityState<R>>,
    caller: Caller,
    Path((username, delay)): Path<(String, String)>,
) -> IdentityResult<Json<UserRecord>> {
    let delay_ms: u64 = delay
        .parse()
        .map_err(|_| IdentityError::Validation(format!("delay must be milliseconds, got '{delay}'")))?;

    let user = state
        .service
        .get_user_async(&caller, &username, Some(Duration::from_millis(delay_ms)))
        .await?;
    Ok(Json(user))
}

/// Service greeting
#[utoipa::path(
    get,
    path = "/wiki/info",
    tag = TAG,
    security(("basic_auth" = [])),
    responses(
        (status = 200, description = "Greeting for the caller", body = String, content_type = "text/plain"),
        (status = 401, description = "Missing or invalid credentials", body = ErrorResponse)
    )
)]
async fn info<R: IdentityRepository + 'static>(
    State(state): State<IdentityState<R>>,
    caller: Caller,
) -> String {
    state.service.info(&caller)
}
