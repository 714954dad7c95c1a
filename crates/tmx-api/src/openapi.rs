//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes into one OpenAPI document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "TMX API — Brokerage Transaction Engine",
        version = "0.1.0",
        description = "Real-estate brokerage transactions: stage catalog, document requests, participants and permissions."
    ),
    paths(
        // Stages
        crate::routes::stages::stage_catalog,
        // Transactions
        crate::routes::transactions::create_transaction,
        crate::routes::transactions::get_transaction,
        crate::routes::transactions::edit_transaction,
        crate::routes::transactions::delete_transaction,
        crate::routes::transactions::transition_transaction,
        crate::routes::transactions::current_stage,
        // Documents
        crate::routes::documents::list_documents,
        crate::routes::documents::create_document,
        crate::routes::documents::get_document,
        crate::routes::documents::edit_document,
        crate::routes::documents::delete_document,
        crate::routes::documents::transition_document,
        // Participants
        crate::routes::participants::list_participants,
        crate::routes::participants::add_participant,
        crate::routes::participants::update_grants,
        crate::routes::participants::remove_participant,
        crate::routes::participants::effective_permissions,
        crate::routes::participants::check_permission,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::stages::StageEntry,
        crate::routes::stages::StageCatalogResponse,
        crate::routes::transactions::TransactionResponse,
        crate::routes::transactions::ResolvedStageResponse,
        crate::routes::documents::DocumentResponse,
        crate::routes::participants::ParticipantsResponse,
        crate::routes::participants::PermissionCheckResponse,
        crate::routes::participants::EffectivePermissionsResponse,
    )),
    tags(
        (name = "stages", description = "Stage catalog per transaction side"),
        (name = "transactions", description = "Transaction lifecycle"),
        (name = "documents", description = "Document request lifecycle"),
        (name = "participants", description = "Participants and permissions"),
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI JSON at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
