//! # Authentication Middleware
//!
//! Bearer tokens name the caller's role and user id:
//!
//! ```text
//! Bearer {role}:{user_id}:{secret}   — AUTH_TOKEN set; secret must match
//! Bearer {role}:{user_id}            — AUTH_TOKEN unset (development)
//! ```
//!
//! A valid token injects a [`CallerIdentity`] into the request extensions.
//! A malformed or mismatched token is refused here with 401. A request with
//! no `Authorization` header passes through without an identity; the engine
//! then refuses any operation that needs an actor, so a missing actor is
//! never defaulted to anyone.

use std::convert::Infallible;

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use subtle::ConstantTimeEq;

use tmx_access::{ActorContext, ActorRole};
use tmx_core::{TransactionId, UserId};

use crate::error::{ErrorBody, ErrorDetail};

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Who is calling, as established by the bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub role: ActorRole,
    pub user_id: UserId,
}

impl CallerIdentity {
    /// Actor context for an operation that is not tied to one transaction.
    pub fn actor(&self) -> ActorContext {
        ActorContext::new(self.user_id.clone(), self.role)
    }

    /// Actor context scoped to `transaction_id`.
    pub fn scoped(&self, transaction_id: TransactionId) -> ActorContext {
        self.actor().for_transaction(transaction_id)
    }
}

/// The caller identity injected by [`auth_middleware`], if any.
///
/// Extraction never fails; absence is handed to the engine as a missing
/// actor context.
#[derive(Debug, Clone)]
pub struct Caller(pub Option<CallerIdentity>);

impl Caller {
    pub fn actor(&self) -> Option<ActorContext> {
        self.0.as_ref().map(CallerIdentity::actor)
    }

    pub fn scoped(&self, transaction_id: TransactionId) -> Option<ActorContext> {
        self.0.as_ref().map(|c| c.scoped(transaction_id))
    }
}

#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<CallerIdentity>().cloned()))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value.
#[derive(Clone)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison of shared secrets.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse a bearer token into a caller identity.
///
/// With `expected_secret` set the token must carry three parts and the
/// secret must match. Without it the secret part is optional and ignored.
pub fn parse_bearer_token(
    provided: &str,
    expected_secret: Option<&str>,
) -> Result<CallerIdentity, String> {
    let parts: Vec<&str> = provided.splitn(3, ':').collect();
    let (role_str, user_str) = match (parts.as_slice(), expected_secret) {
        ([role, user, secret], Some(expected)) => {
            if !constant_time_token_eq(secret, expected) {
                return Err("invalid bearer token".into());
            }
            (*role, *user)
        }
        ([role, user, _], None) | ([role, user], None) => (*role, *user),
        (_, Some(_)) => {
            return Err("invalid token format, expected {role}:{user_id}:{secret}".into())
        }
        (_, None) => return Err("invalid token format, expected {role}:{user_id}".into()),
    };

    let role: ActorRole = role_str.parse()?;
    let user_id = UserId::new(user_str).map_err(|e| format!("invalid user id: {e}"))?;
    Ok(CallerIdentity { role, user_id })
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Validate the bearer token, if one is present, and inject the caller.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let expected = request
        .extensions()
        .get::<AuthConfig>()
        .and_then(|c| c.token.clone());

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .map(|v| v.to_str().unwrap_or_default().to_string());

    match auth_header {
        None => next.run(request).await,
        Some(value) => match value.strip_prefix("Bearer ") {
            Some(provided) => match parse_bearer_token(provided.trim(), expected.as_deref()) {
                Ok(identity) => {
                    tracing::debug!(role = %identity.role, user_id = %identity.user_id, "caller authenticated");
                    request.extensions_mut().insert(identity);
                    next.run(request).await
                }
                Err(msg) => {
                    tracing::warn!(reason = %msg, "authentication failed: invalid bearer token");
                    unauthorized_response(&msg)
                }
            },
            None => {
                tracing::warn!("authentication failed: non-Bearer authorization scheme");
                unauthorized_response("authorization header must use Bearer scheme")
            }
        },
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    /// Echoes the caller, or "anonymous".
    fn test_app(token: Option<String>) -> Router {
        Router::new()
            .route(
                "/whoami",
                get(|Caller(caller): Caller| async move {
                    match caller {
                        Some(c) => format!("{}:{}", c.role, c.user_id),
                        None => "anonymous".to_string(),
                    }
                }),
            )
            .layer(from_fn(auth_middleware))
            .layer(axum::Extension(AuthConfig { token }))
    }

    async fn call(app: Router, auth: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri("/whoami");
        if let Some(value) = auth {
            builder = builder.header("Authorization", value);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn parses_three_part_token_with_secret() {
        let caller = parse_bearer_token("broker:broker-1:s3cret", Some("s3cret")).unwrap();
        assert_eq!(caller.role, ActorRole::Broker);
        assert_eq!(caller.user_id.as_str(), "broker-1");
    }

    #[test]
    fn rejects_wrong_secret_and_missing_secret() {
        assert!(parse_bearer_token("broker:broker-1:nope", Some("s3cret")).is_err());
        assert!(parse_bearer_token("broker:broker-1", Some("s3cret")).is_err());
    }

    #[test]
    fn development_mode_accepts_two_parts() {
        let caller = parse_bearer_token("CLIENT:client-1", None).unwrap();
        assert_eq!(caller.role, ActorRole::Client);
        assert!(parse_bearer_token("client-1", None).is_err());
    }

    #[test]
    fn rejects_unknown_role_and_bad_user() {
        let err = parse_bearer_token("owner:u-1", None).unwrap_err();
        assert!(err.contains("unknown role"));
        assert!(parse_bearer_token("broker:", None).is_err());
    }

    #[test]
    fn scoped_actor_carries_transaction() {
        let caller = parse_bearer_token("admin:admin-1", None).unwrap();
        let tx = TransactionId::new();
        assert_eq!(caller.scoped(tx).transaction_id, Some(tx));
        assert_eq!(caller.actor().transaction_id, None);
    }

    #[test]
    fn auth_config_debug_redacts() {
        let cfg = AuthConfig {
            token: Some("s3cret".into()),
        };
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn valid_token_injects_identity() {
        let (status, body) = call(
            test_app(Some("s3cret".into())),
            Some("Bearer broker:broker-1:s3cret"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "BROKER:broker-1");
    }

    #[tokio::test]
    async fn missing_header_passes_through_anonymous() {
        let (status, body) = call(test_app(Some("s3cret".into())), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");
    }

    #[tokio::test]
    async fn invalid_token_is_refused() {
        let (status, body) = call(
            test_app(Some("s3cret".into())),
            Some("Bearer broker:broker-1:wrong"),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let err: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(err["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_refused() {
        let (status, body) = call(test_app(None), Some("Basic dXNlcjpwYXNz")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("Bearer scheme"));
    }
}
