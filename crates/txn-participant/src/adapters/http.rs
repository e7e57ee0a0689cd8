//! `/transactions/*` routes, mounted by every service that participates.

use crate::domain::ParticipantError;
use crate::ports::ParticipantApi;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use shared_http::{ApiError, ApiResult, ServiceMetrics};
use shared_types::TransactionId;
use std::sync::Arc;
use tracing::error;

#[derive(Clone)]
pub struct TransactionRoutesState {
    pub participant: Arc<dyn ParticipantApi>,
    pub metrics: Arc<ServiceMetrics>,
}

#[derive(Debug, Deserialize)]
struct PrepareRequest {
    #[serde(alias = "id")]
    transaction_id: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct FinalizeRequest {
    #[serde(alias = "id")]
    transaction_id: String,
}

pub fn routes(state: TransactionRoutesState) -> Router {
    Router::new()
        .route("/transactions/prepare", post(prepare))
        .route("/transactions/commit", post(commit))
        .route("/transactions/abort", post(abort))
        .route("/transactions/:id", get(get_transaction))
        .with_state(state)
}

/// Map a participant error to the HTTP envelope. `not_found` is the
/// operation-specific 404 message.
fn to_api_error(err: ParticipantError, not_found: &str) -> ApiError {
    match err {
        ParticipantError::NotFound(_) => ApiError::not_found(not_found),
        ParticipantError::Conflict { id, status } => {
            ApiError::conflict(format!("Transaction {id} is already {status}"))
        }
        ParticipantError::InvalidId(e) => ApiError::bad_request(e.to_string()),
        ParticipantError::Store(e) => {
            error!(error = %e, "Transaction store failure");
            ApiError::from(e)
        }
    }
}

fn parse_id(raw: String) -> ApiResult<TransactionId> {
    TransactionId::parse(raw).map_err(|e| to_api_error(e.into(), "Transaction not found"))
}

async fn prepare(
    State(state): State<TransactionRoutesState>,
    payload: Result<Json<PrepareRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = payload?;
    let id = parse_id(req.transaction_id)?;

    let record = state
        .participant
        .prepare(id, req.data)
        .await
        .map_err(|e| to_api_error(e, "Transaction not found"))?;
    state.metrics.record_prepare();

    Ok(Json(json!({
        "transaction_id": record.id,
        "status": record.status,
    })))
}

async fn commit(
    State(state): State<TransactionRoutesState>,
    payload: Result<Json<FinalizeRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = payload?;
    let id = parse_id(req.transaction_id)?;

    let outcome = state
        .participant
        .commit(&id)
        .await
        .map_err(|e| to_api_error(e, "Transaction not found or not prepared"))?;
    if !outcome.already_finalized {
        state.metrics.record_commit();
    }

    Ok(Json(json!({
        "status": "committed",
        "already_finalized": outcome.already_finalized,
    })))
}

async fn abort(
    State(state): State<TransactionRoutesState>,
    payload: Result<Json<FinalizeRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = payload?;
    let id = parse_id(req.transaction_id)?;

    state
        .participant
        .abort(&id)
        .await
        .map_err(|e| to_api_error(e, "Transaction not found"))?;
    state.metrics.record_abort();

    Ok(Json(json!({ "status": "aborted and deleted" })))
}

async fn get_transaction(
    State(state): State<TransactionRoutesState>,
    Path(raw): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(raw)?;
    let record = state
        .participant
        .get(&id)
        .await
        .map_err(|e| to_api_error(e, "Transaction not found"))?;
    Ok(Json(json!(record)))
}
