//! Flashcard HTTP routes.

use crate::domain::{FlashcardError, FlashcardSetPatch, NewFlashcardSet};
use crate::service::CacheAside;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use shared_http::{ApiError, ApiResult, Authenticated, IdentityState, MiddlewareStack};
use shared_types::IdentityVerifier;
use std::sync::Arc;
use tracing::error;

#[derive(Clone)]
pub struct AppState {
    pub flashcards: Arc<CacheAside>,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub middleware: MiddlewareStack,
}

impl IdentityState for AppState {
    fn identity_verifier(&self) -> &dyn IdentityVerifier {
        self.verifier.as_ref()
    }
}

impl From<FlashcardError> for ApiError {
    fn from(err: FlashcardError) -> Self {
        match err {
            FlashcardError::NotFound(_) => ApiError::not_found("Flashcard set not found"),
            FlashcardError::Validation(message) => ApiError::bad_request(message),
            FlashcardError::Store(e) => {
                error!(error = %e, "Flashcard store failure");
                ApiError::from(e)
            }
            FlashcardError::CacheInvalidation { set_id, message } => {
                ApiError::cache_invalidation(format!(
                    "Flashcard set {set_id} was saved, but its cached copy could not be removed \
                     and may be served until it expires: {message}"
                ))
            }
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/flashcards", get(list_sets).post(create_set))
        .route(
            "/flashcards/:id",
            get(get_set).put(update_set).delete(delete_set),
        )
        .route("/status", get(status))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn list_sets(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let sets = state.flashcards.list_sets().await?;
    Ok(Json(json!({ "flashcardSets": sets })))
}

async fn get_set(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let (projection, source) = state.flashcards.get_set(id).await?;
    Ok(Json(json!({ "data": projection, "source": source })))
}

async fn create_set(
    State(state): State<AppState>,
    Authenticated(creator): Authenticated,
    payload: Result<Json<NewFlashcardSet>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(new) = payload?;
    let set = state.flashcards.create_set(creator, new).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Flashcard set created successfully",
            "title": set.title,
            "setId": set.id,
        })),
    ))
}

async fn update_set(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<FlashcardSetPatch>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    state.flashcards.update_set(id, patch).await?;
    Ok(Json(json!({ "message": "Flashcard set updated successfully" })))
}

async fn delete_set(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    state.flashcards.delete_set(id).await?;
    Ok(Json(json!({ "message": "Flashcard set deleted successfully" })))
}

async fn status(State(state): State<AppState>) -> Response {
    match state.flashcards.store().ping().await {
        Ok(()) => Json(json!({ "service": "flashcards", "status": "running" })).into_response(),
        Err(e) => {
            error!(error = %e, "Status check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "service": "flashcards",
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
