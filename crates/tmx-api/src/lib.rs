//! # tmx-api — Axum API for the Brokerage Transaction Engine
//!
//! HTTP surface over [`tmx_engine::TransactionMutationFacade`]. Handlers
//! translate paths and bodies into facade calls and engine rejections into
//! JSON error bodies; all rules live in the engine.
//!
//! ## API Surface
//!
//! | Prefix                                   | Module                         |
//! |------------------------------------------|--------------------------------|
//! | `/v1/stages/*`                           | [`routes::stages`]             |
//! | `/v1/transactions`, `/v1/transactions/:id[/transitions,/stage]` | [`routes::transactions`] |
//! | `/v1/transactions/:id/documents/*`       | [`routes::documents`]          |
//! | `/v1/transactions/:id/participants/*`, `/permissions/*` | [`routes::participants`] |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → AuthMiddleware → Handler
//! ```

pub mod auth;
pub mod error;
pub mod extractors;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::middleware::from_fn;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::state::AppState;

/// Assemble the application router.
///
/// Health probes (`/health/*`) are mounted outside the auth middleware.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };

    let api = Router::new()
        .merge(routes::stages::router())
        .merge(routes::transactions::router())
        .merge(routes::documents::router())
        .merge(routes::participants::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .with_state(state);

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new().merge(health).merge(api)
}

async fn liveness() -> &'static str {
    "ok"
}

async fn readiness() -> &'static str {
    "ready"
}
