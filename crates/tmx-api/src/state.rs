//! # Application State
//!
//! Shared state for the Axum application, passed to route handlers via the
//! `State` extractor. Everything that persists lives behind the engine's
//! facade; the state only holds the facade and the process configuration.

use tmx_engine::TransactionMutationFacade;

/// Process configuration, read from the environment.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Shared secret carried in bearer tokens. `None` is development mode.
    pub auth_token: Option<String>,
}

impl AppConfig {
    /// `PORT` (default 8080) and `AUTH_TOKEN`.
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let auth_token = std::env::var("AUTH_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        Self { port, auth_token }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
        }
    }
}

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub facade: TransactionMutationFacade,
    pub config: AppConfig,
}

impl AppState {
    /// In-memory engine, development auth.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self::with_facade(config, TransactionMutationFacade::in_memory())
    }

    pub fn with_facade(config: AppConfig, facade: TransactionMutationFacade) -> Self {
        Self { facade, config }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
