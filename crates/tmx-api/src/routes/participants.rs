//! # Participants & Permissions API
//!
//! ## Endpoints
//!
//! - `GET /v1/transactions/:id/participants` — participant list
//! - `POST /v1/transactions/:id/participants` — add a participant
//! - `PUT /v1/transactions/:id/participants/:user_id` — replace grants
//! - `DELETE /v1/transactions/:id/participants/:user_id` — remove
//! - `GET /v1/transactions/:id/permissions` — caller's effective permissions
//! - `GET /v1/transactions/:id/permissions/:permission` — check one

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use tmx_access::{Participant, Permission};
use tmx_core::{TransactionId, UserId};
use tmx_engine::{AddParticipant, UpdateGrants, Versioned};

use crate::auth::Caller;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_query, parse_path, VersionQuery};
use crate::state::AppState;

/// The participant list; its version guards membership changes.
#[derive(Debug, Serialize, ToSchema)]
pub struct ParticipantsResponse {
    pub version: u64,
    #[schema(value_type = Vec<Object>)]
    pub participants: Vec<Participant>,
}

impl From<Versioned<Vec<Participant>>> for ParticipantsResponse {
    fn from(v: Versioned<Vec<Participant>>) -> Self {
        Self {
            version: v.version,
            participants: v.record,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PermissionCheckResponse {
    pub permission: String,
    pub granted: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EffectivePermissionsResponse {
    pub permissions: Vec<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/transactions/:id/participants",
            get(list_participants).post(add_participant),
        )
        .route(
            "/v1/transactions/:id/participants/:user_id",
            axum::routing::put(update_grants).delete(remove_participant),
        )
        .route("/v1/transactions/:id/permissions", get(effective_permissions))
        .route(
            "/v1/transactions/:id/permissions/:permission",
            get(check_permission),
        )
}

/// GET /v1/transactions/:id/participants — Participant list.
#[utoipa::path(
    get,
    path = "/v1/transactions/{id}/participants",
    params(("id" = String, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Participants", body = ParticipantsResponse),
        (status = 403, description = "Not permitted", body = crate::error::ErrorBody),
    ),
    tag = "participants"
)]
pub(crate) async fn list_participants(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<ParticipantsResponse>, AppError> {
    let id: TransactionId = parse_path(&id)?;
    let list = state
        .facade
        .list_participants(caller.scoped(id).as_ref(), id)?;
    Ok(Json(list.into()))
}

/// POST /v1/transactions/:id/participants — Add a participant.
#[utoipa::path(
    post,
    path = "/v1/transactions/{id}/participants",
    params(("id" = String, Path, description = "Transaction ID")),
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Participant added", body = ParticipantsResponse),
        (status = 403, description = "Not permitted", body = crate::error::ErrorBody),
        (status = 422, description = "Already a participant", body = crate::error::ErrorBody),
    ),
    tag = "participants"
)]
pub(crate) async fn add_participant(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    body: Result<Json<AddParticipant>, JsonRejection>,
) -> Result<Json<ParticipantsResponse>, AppError> {
    let id: TransactionId = parse_path(&id)?;
    let cmd = extract_json(body)?;
    let list = state
        .facade
        .add_participant(caller.scoped(id).as_ref(), id, cmd)?;
    Ok(Json(list.into()))
}

/// PUT /v1/transactions/:id/participants/:user_id — Replace grants.
#[utoipa::path(
    put,
    path = "/v1/transactions/{id}/participants/{user_id}",
    params(
        ("id" = String, Path, description = "Transaction ID"),
        ("user_id" = String, Path, description = "Participant user ID"),
    ),
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Grants replaced", body = ParticipantsResponse),
        (status = 404, description = "Not a participant", body = crate::error::ErrorBody),
    ),
    tag = "participants"
)]
pub(crate) async fn update_grants(
    State(state): State<AppState>,
    caller: Caller,
    Path((id, user_id)): Path<(String, String)>,
    body: Result<Json<UpdateGrants>, JsonRejection>,
) -> Result<Json<ParticipantsResponse>, AppError> {
    let id: TransactionId = parse_path(&id)?;
    let user_id: UserId = parse_path(&user_id)?;
    let cmd = extract_json(body)?;
    let list = state.facade.update_participant_grants(
        caller.scoped(id).as_ref(),
        id,
        &user_id,
        cmd,
    )?;
    Ok(Json(list.into()))
}

/// DELETE /v1/transactions/:id/participants/:user_id — Remove a participant.
#[utoipa::path(
    delete,
    path = "/v1/transactions/{id}/participants/{user_id}",
    params(
        ("id" = String, Path, description = "Transaction ID"),
        ("user_id" = String, Path, description = "Participant user ID"),
        VersionQuery,
    ),
    responses(
        (status = 200, description = "Participant removed", body = ParticipantsResponse),
        (status = 422, description = "The owning broker cannot be removed", body = crate::error::ErrorBody),
    ),
    tag = "participants"
)]
pub(crate) async fn remove_participant(
    State(state): State<AppState>,
    caller: Caller,
    Path((id, user_id)): Path<(String, String)>,
    query: Result<Query<VersionQuery>, QueryRejection>,
) -> Result<Json<ParticipantsResponse>, AppError> {
    let id: TransactionId = parse_path(&id)?;
    let user_id: UserId = parse_path(&user_id)?;
    let query = extract_query(query)?;
    let list = state.facade.remove_participant(
        caller.scoped(id).as_ref(),
        id,
        &user_id,
        query.expected_version,
    )?;
    Ok(Json(list.into()))
}

/// GET /v1/transactions/:id/permissions — Everything the caller holds.
#[utoipa::path(
    get,
    path = "/v1/transactions/{id}/permissions",
    params(("id" = String, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Effective permissions", body = EffectivePermissionsResponse),
    ),
    tag = "participants"
)]
pub(crate) async fn effective_permissions(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<EffectivePermissionsResponse>, AppError> {
    let id: TransactionId = parse_path(&id)?;
    let perms = state
        .facade
        .effective_permissions(caller.scoped(id).as_ref(), id)?;
    Ok(Json(EffectivePermissionsResponse {
        permissions: perms.iter().map(|p| p.as_str().to_string()).collect(),
    }))
}

/// GET /v1/transactions/:id/permissions/:permission — Check one permission.
#[utoipa::path(
    get,
    path = "/v1/transactions/{id}/permissions/{permission}",
    params(
        ("id" = String, Path, description = "Transaction ID"),
        ("permission" = String, Path, description = "Permission name, e.g. EDIT_DOCUMENTS"),
    ),
    responses(
        (status = 200, description = "Check result", body = PermissionCheckResponse),
        (status = 400, description = "Unknown permission", body = crate::error::ErrorBody),
    ),
    tag = "participants"
)]
pub(crate) async fn check_permission(
    State(state): State<AppState>,
    caller: Caller,
    Path((id, permission)): Path<(String, String)>,
) -> Result<Json<PermissionCheckResponse>, AppError> {
    let id: TransactionId = parse_path(&id)?;
    let permission: Permission = parse_path(&permission)?;
    let granted = state
        .facade
        .check_permission(caller.scoped(id).as_ref(), id, permission)?;
    Ok(Json(PermissionCheckResponse {
        permission: permission.as_str().to_string(),
        granted,
    }))
}
