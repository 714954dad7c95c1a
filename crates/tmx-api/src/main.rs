//! # tmx-api — Binary Entry Point
//!
//! Starts the Axum HTTP server over an in-memory engine. Binds to `PORT`
//! (default 8080).

use tmx_api::state::{AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    if config.auth_token.is_none() {
        tracing::warn!("AUTH_TOKEN not set; bearer secrets are not checked");
    }
    tracing::info!(?config, "configuration loaded");

    let port = config.port;
    let app = tmx_api::app(AppState::with_config(config));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("TMX API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
