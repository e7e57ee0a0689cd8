//! Auth HTTP routes.

use crate::domain::{AuthError, Credentials, Registration, UserPatch, UserView};
use crate::service::AccountService;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use shared_http::{ApiError, ApiResult, Authenticated, IdentityState, MiddlewareStack};
use shared_types::IdentityVerifier;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub middleware: MiddlewareStack,
}

impl IdentityState for AppState {
    fn identity_verifier(&self) -> &dyn IdentityVerifier {
        self.accounts.signer().as_ref()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UsernameTaken | AuthError::EmailTaken | AuthError::Validation(_) => {
                ApiError::bad_request(err.to_string())
            }
            AuthError::InvalidCredentials => ApiError::unauthorized(err.to_string()),
            AuthError::NotFound(_) => ApiError::not_found("User not found"),
            AuthError::Store(e) => {
                error!(error = %e, "User store failure");
                ApiError::from(e)
            }
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/users", get(list_users))
        .route("/auth/users/:id", put(update_user))
        .route("/status", get(status))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(registration) = payload?;
    state.accounts.register(registration).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully" })),
    ))
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(credentials) = payload?;
    let session = state.accounts.login(credentials).await?;
    Ok(Json(json!({
        "message": "Login successful",
        "access_token": session.access_token,
        "user": session.username,
    })))
}

async fn logout(Authenticated(subject): Authenticated) -> Json<Value> {
    // Tokens are stateless; they stay valid until they expire.
    info!(%subject, "User logged out");
    Json(json!({ "message": "User logged out" }))
}

async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<UserView>>> {
    Ok(Json(state.accounts.list_users().await?))
}

async fn update_user(
    State(state): State<AppState>,
    Authenticated(_): Authenticated,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UserPatch>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    state.accounts.update_user(id, patch).await?;
    Ok(Json(json!({ "message": "User updated successfully" })))
}

async fn status(State(state): State<AppState>) -> Response {
    match state.accounts.store().ping().await {
        Ok(()) => Json(json!({ "service": "auth", "status": "running" })).into_response(),
        Err(e) => {
            error!(error = %e, "Status check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "service": "auth",
                    "status": "ERROR",
                    "database": "Not connected",
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

async fn metrics(State(state): State<AppState>) -> Json<Value> {
    Json(state.middleware.snapshot())
}
