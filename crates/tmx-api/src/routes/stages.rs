//! # Stage Catalog API
//!
//! - `GET /v1/stages/:side` — ordered stage sequence of `BUY_SIDE` or `SELL_SIDE`

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use tmx_state::TransactionSide;

use crate::error::AppError;
use crate::extractors::parse_path;
use crate::state::AppState;

/// One stage in a side's sequence.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StageEntry {
    /// One-based position, as used by legacy ordinal stage values.
    pub position: usize,
    /// Stable stage identifier.
    pub stage: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StageCatalogResponse {
    pub side: String,
    pub stages: Vec<StageEntry>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/stages/:side", get(stage_catalog))
}

/// GET /v1/stages/:side — The authoritative stage sequence for a side.
#[utoipa::path(
    get,
    path = "/v1/stages/{side}",
    params(("side" = String, Path, description = "BUY_SIDE or SELL_SIDE")),
    responses(
        (status = 200, description = "Stage catalog", body = StageCatalogResponse),
        (status = 400, description = "Unknown side", body = crate::error::ErrorBody),
    ),
    tag = "stages"
)]
pub(crate) async fn stage_catalog(
    State(state): State<AppState>,
    Path(side): Path<String>,
) -> Result<Json<StageCatalogResponse>, AppError> {
    let side: TransactionSide = parse_path(&side)?;
    let stages = state
        .facade
        .stage_catalog(side)
        .iter()
        .enumerate()
        .map(|(i, stage)| StageEntry {
            position: i + 1,
            stage: stage.as_str().to_string(),
        })
        .collect();
    Ok(Json(StageCatalogResponse {
        side: side.as_str().to_string(),
        stages,
    }))
}
