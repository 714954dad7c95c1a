//! # Document Requests API
//!
//! ## Endpoints
//!
//! - `GET /v1/transactions/:id/documents` — requests visible to the caller
//! - `POST /v1/transactions/:id/documents` — create a DRAFT or REQUESTED request
//! - `GET /v1/transactions/:id/documents/:doc_id` — read one request
//! - `PATCH /v1/transactions/:id/documents/:doc_id` — edit fields
//! - `DELETE /v1/transactions/:id/documents/:doc_id` — delete a DRAFT
//! - `POST /v1/transactions/:id/documents/:doc_id/transitions` — attach,
//!   send, share, submit, approve, request revision
//!
//! DRAFT requests are visible to their creator only; to anyone else they
//! answer 404.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use tmx_core::{DocumentRequestId, TransactionId};
use tmx_engine::{EditDocument, TransitionDocument, Versioned};
use tmx_state::{DocumentRequest, NewDocumentRequest};

use crate::auth::Caller;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_query, parse_path, VersionQuery};
use crate::state::AppState;

/// A document request with the version to send back as `expected_version`.
#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentResponse {
    pub version: u64,
    #[schema(value_type = Object)]
    pub document: DocumentRequest,
}

impl From<Versioned<DocumentRequest>> for DocumentResponse {
    fn from(v: Versioned<DocumentRequest>) -> Self {
        Self {
            version: v.version,
            document: v.record,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/transactions/:id/documents",
            get(list_documents).post(create_document),
        )
        .route(
            "/v1/transactions/:id/documents/:doc_id",
            get(get_document).patch(edit_document).delete(delete_document),
        )
        .route(
            "/v1/transactions/:id/documents/:doc_id/transitions",
            post(transition_document),
        )
}

fn ids(raw: &(String, String)) -> Result<(TransactionId, DocumentRequestId), AppError> {
    Ok((parse_path(&raw.0)?, parse_path(&raw.1)?))
}

/// GET /v1/transactions/:id/documents — Requests visible to the caller.
#[utoipa::path(
    get,
    path = "/v1/transactions/{id}/documents",
    params(("id" = String, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Document requests, oldest first", body = Vec<DocumentResponse>),
        (status = 403, description = "Not permitted", body = crate::error::ErrorBody),
    ),
    tag = "documents"
)]
pub(crate) async fn list_documents(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Vec<DocumentResponse>>, AppError> {
    let id: TransactionId = parse_path(&id)?;
    let docs = state.facade.list_documents(caller.scoped(id).as_ref(), id)?;
    Ok(Json(docs.into_iter().map(Into::into).collect()))
}

/// POST /v1/transactions/:id/documents — Create a document request.
#[utoipa::path(
    post,
    path = "/v1/transactions/{id}/documents",
    params(("id" = String, Path, description = "Transaction ID")),
    request_body = serde_json::Value,
    responses(
        (status = 201, description = "Document request created", body = DocumentResponse),
        (status = 403, description = "Not permitted", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "documents"
)]
pub(crate) async fn create_document(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    body: Result<Json<NewDocumentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DocumentResponse>), AppError> {
    let id: TransactionId = parse_path(&id)?;
    let new = extract_json(body)?;
    let doc = state
        .facade
        .create_document(caller.scoped(id).as_ref(), id, new)?;
    Ok((StatusCode::CREATED, Json(doc.into())))
}

/// GET /v1/transactions/:id/documents/:doc_id — Read one request.
#[utoipa::path(
    get,
    path = "/v1/transactions/{id}/documents/{doc_id}",
    params(
        ("id" = String, Path, description = "Transaction ID"),
        ("doc_id" = String, Path, description = "Document request ID"),
    ),
    responses(
        (status = 200, description = "Document request", body = DocumentResponse),
        (status = 404, description = "Missing, or a draft of another user", body = crate::error::ErrorBody),
    ),
    tag = "documents"
)]
pub(crate) async fn get_document(
    State(state): State<AppState>,
    caller: Caller,
    Path(raw): Path<(String, String)>,
) -> Result<Json<DocumentResponse>, AppError> {
    let (id, doc_id) = ids(&raw)?;
    let doc = state
        .facade
        .get_document(caller.scoped(id).as_ref(), id, doc_id)?;
    Ok(Json(doc.into()))
}

/// PATCH /v1/transactions/:id/documents/:doc_id — Edit fields.
#[utoipa::path(
    patch,
    path = "/v1/transactions/{id}/documents/{doc_id}",
    params(
        ("id" = String, Path, description = "Transaction ID"),
        ("doc_id" = String, Path, description = "Document request ID"),
    ),
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Document request edited", body = DocumentResponse),
        (status = 409, description = "Not editable in its status, or stale version", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "documents"
)]
pub(crate) async fn edit_document(
    State(state): State<AppState>,
    caller: Caller,
    Path(raw): Path<(String, String)>,
    body: Result<Json<EditDocument>, JsonRejection>,
) -> Result<Json<DocumentResponse>, AppError> {
    let (id, doc_id) = ids(&raw)?;
    let cmd = extract_json(body)?;
    let doc = state
        .facade
        .edit_document(caller.scoped(id).as_ref(), id, doc_id, cmd)?;
    Ok(Json(doc.into()))
}

/// DELETE /v1/transactions/:id/documents/:doc_id — Delete a DRAFT request.
#[utoipa::path(
    delete,
    path = "/v1/transactions/{id}/documents/{doc_id}",
    params(
        ("id" = String, Path, description = "Transaction ID"),
        ("doc_id" = String, Path, description = "Document request ID"),
        VersionQuery,
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 409, description = "Only drafts can be deleted", body = crate::error::ErrorBody),
    ),
    tag = "documents"
)]
pub(crate) async fn delete_document(
    State(state): State<AppState>,
    caller: Caller,
    Path(raw): Path<(String, String)>,
    query: Result<Query<VersionQuery>, QueryRejection>,
) -> Result<StatusCode, AppError> {
    let (id, doc_id) = ids(&raw)?;
    let query = extract_query(query)?;
    state.facade.delete_document(
        caller.scoped(id).as_ref(),
        id,
        doc_id,
        query.expected_version,
    )?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/transactions/:id/documents/:doc_id/transitions — Lifecycle step.
#[utoipa::path(
    post,
    path = "/v1/transactions/{id}/documents/{doc_id}/transitions",
    params(
        ("id" = String, Path, description = "Transaction ID"),
        ("doc_id" = String, Path, description = "Document request ID"),
    ),
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Transition applied", body = DocumentResponse),
        (status = 403, description = "Not permitted", body = crate::error::ErrorBody),
        (status = 409, description = "Invalid transition or stale version", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "documents"
)]
pub(crate) async fn transition_document(
    State(state): State<AppState>,
    caller: Caller,
    Path(raw): Path<(String, String)>,
    body: Result<Json<TransitionDocument>, JsonRejection>,
) -> Result<Json<DocumentResponse>, AppError> {
    let (id, doc_id) = ids(&raw)?;
    let cmd = extract_json(body)?;
    let doc = state
        .facade
        .transition_document(caller.scoped(id).as_ref(), id, doc_id, cmd)?;
    Ok(Json(doc.into()))
}
