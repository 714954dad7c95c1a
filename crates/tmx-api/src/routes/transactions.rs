//! # Transactions API
//!
//! ## Endpoints
//!
//! - `POST /v1/transactions` — open a transaction (brokers and admins)
//! - `GET /v1/transactions/:id` — read a transaction
//! - `PATCH /v1/transactions/:id` — edit the property address
//! - `DELETE /v1/transactions/:id` — delete an archived transaction (admins)
//! - `POST /v1/transactions/:id/transitions` — stage and status actions
//! - `GET /v1/transactions/:id/stage` — resolved current stage

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use tmx_core::TransactionId;
use tmx_engine::{CreateTransaction, EditTransaction, TransitionTransaction, Versioned};
use tmx_state::{ResolvedStage, Transaction};

use crate::auth::Caller;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_query, parse_path, VersionQuery};
use crate::state::AppState;

// ── Response DTOs ───────────────────────────────────────────────────

/// A transaction with the version to send back as `expected_version`.
#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionResponse {
    pub version: u64,
    #[schema(value_type = Object)]
    pub transaction: Transaction,
}

impl From<Versioned<Transaction>> for TransactionResponse {
    fn from(v: Versioned<Transaction>) -> Self {
        Self {
            version: v.version,
            transaction: v.record,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResolvedStageResponse {
    /// Zero-based position in the side's sequence.
    pub index: usize,
    pub stage: String,
    pub total: usize,
    pub is_terminated: bool,
}

impl From<ResolvedStage> for ResolvedStageResponse {
    fn from(r: ResolvedStage) -> Self {
        Self {
            index: r.index,
            stage: r.stage.as_str().to_string(),
            total: r.total,
            is_terminated: r.is_terminated,
        }
    }
}

// ── Router ──────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/transactions", post(create_transaction))
        .route(
            "/v1/transactions/:id",
            get(get_transaction)
                .patch(edit_transaction)
                .delete(delete_transaction),
        )
        .route("/v1/transactions/:id/transitions", post(transition_transaction))
        .route("/v1/transactions/:id/stage", get(current_stage))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/transactions — Open a transaction.
#[utoipa::path(
    post,
    path = "/v1/transactions",
    request_body = serde_json::Value,
    responses(
        (status = 201, description = "Transaction opened", body = TransactionResponse),
        (status = 401, description = "No caller identity", body = crate::error::ErrorBody),
        (status = 403, description = "Role may not open transactions", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "transactions"
)]
pub(crate) async fn create_transaction(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<CreateTransaction>, JsonRejection>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    let cmd = extract_json(body)?;
    let created = state
        .facade
        .create_transaction(caller.actor().as_ref(), cmd)?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// GET /v1/transactions/:id — Read a transaction.
#[utoipa::path(
    get,
    path = "/v1/transactions/{id}",
    params(("id" = String, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Transaction", body = TransactionResponse),
        (status = 403, description = "Not permitted", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "transactions"
)]
pub(crate) async fn get_transaction(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<TransactionResponse>, AppError> {
    let id: TransactionId = parse_path(&id)?;
    let tx = state.facade.get_transaction(caller.scoped(id).as_ref(), id)?;
    Ok(Json(tx.into()))
}

/// PATCH /v1/transactions/:id — Edit the property address.
#[utoipa::path(
    patch,
    path = "/v1/transactions/{id}",
    params(("id" = String, Path, description = "Transaction ID")),
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Transaction edited", body = TransactionResponse),
        (status = 409, description = "Stale expected_version", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "transactions"
)]
pub(crate) async fn edit_transaction(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    body: Result<Json<EditTransaction>, JsonRejection>,
) -> Result<Json<TransactionResponse>, AppError> {
    let id: TransactionId = parse_path(&id)?;
    let cmd = extract_json(body)?;
    let tx = state
        .facade
        .edit_transaction(caller.scoped(id).as_ref(), id, cmd)?;
    Ok(Json(tx.into()))
}

/// DELETE /v1/transactions/:id — Delete an archived transaction.
#[utoipa::path(
    delete,
    path = "/v1/transactions/{id}",
    params(("id" = String, Path, description = "Transaction ID"), VersionQuery),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Admins only", body = crate::error::ErrorBody),
        (status = 409, description = "Not archived", body = crate::error::ErrorBody),
    ),
    tag = "transactions"
)]
pub(crate) async fn delete_transaction(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    query: Result<Query<VersionQuery>, QueryRejection>,
) -> Result<StatusCode, AppError> {
    let id: TransactionId = parse_path(&id)?;
    let query = extract_query(query)?;
    state
        .facade
        .delete_transaction(caller.scoped(id).as_ref(), id, query.expected_version)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/transactions/:id/transitions — Change stage, advance, close,
/// terminate, archive or unarchive.
#[utoipa::path(
    post,
    path = "/v1/transactions/{id}/transitions",
    params(("id" = String, Path, description = "Transaction ID")),
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Transition applied", body = TransactionResponse),
        (status = 403, description = "Not permitted", body = crate::error::ErrorBody),
        (status = 409, description = "Invalid transition or stale version", body = crate::error::ErrorBody),
        (status = 422, description = "Validation or stage resolution error", body = crate::error::ErrorBody),
    ),
    tag = "transactions"
)]
pub(crate) async fn transition_transaction(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    body: Result<Json<TransitionTransaction>, JsonRejection>,
) -> Result<Json<TransactionResponse>, AppError> {
    let id: TransactionId = parse_path(&id)?;
    let cmd = extract_json(body)?;
    let tx = state
        .facade
        .transition_transaction(caller.scoped(id).as_ref(), id, cmd)?;
    Ok(Json(tx.into()))
}

/// GET /v1/transactions/:id/stage — Resolved current stage.
#[utoipa::path(
    get,
    path = "/v1/transactions/{id}/stage",
    params(("id" = String, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Resolved stage", body = ResolvedStageResponse),
        (status = 422, description = "Stored stage does not resolve", body = crate::error::ErrorBody),
    ),
    tag = "transactions"
)]
pub(crate) async fn current_stage(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<ResolvedStageResponse>, AppError> {
    let id: TransactionId = parse_path(&id)?;
    let resolved = state
        .facade
        .resolve_current_stage(caller.scoped(id).as_ref(), id)?;
    Ok(Json(resolved.into()))
}
