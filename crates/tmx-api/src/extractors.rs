//! # Request Extraction Helpers
//!
//! Map axum's extractor rejections onto [`AppError`] so every failure,
//! including malformed JSON and identifiers, answers with the JSON error
//! body.

use std::str::FromStr;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::Json;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::AppError;

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract query parameters, mapping errors to [`AppError::BadRequest`].
pub fn extract_query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    result
        .map(|Query(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Parse a path segment into a typed identifier.
pub fn parse_path<T>(raw: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e: T::Err| AppError::BadRequest(format!("invalid path segment '{raw}': {e}")))
}

/// Optimistic-concurrency precondition for verbs without a body.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VersionQuery {
    /// Version the caller last read.
    pub expected_version: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tmx_core::TransactionId;

    #[test]
    fn parse_path_accepts_uuid() {
        let id = TransactionId::new();
        let parsed: TransactionId = parse_path(&id.to_string()).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_path_rejects_garbage() {
        let err = parse_path::<TransactionId>("not-a-uuid").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("not-a-uuid")));
    }
}
