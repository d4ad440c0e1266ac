//! Liveness endpoint for container platforms.
//!
//! ```text
//! GET /        - plain text banner
//! GET /health  - {"status":"ok"}
//! ```

use axum::{Json, Router, response::IntoResponse, routing::get};
use serde_json::json;
use std::net::SocketAddr;

/// Banner returned by the root route
pub const BANNER: &str = "Bot is running!";

/// Create the health router
pub fn create_router() -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
}

async fn root() -> &'static str {
    BANNER
}

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Serve the health router until the task is dropped
///
/// # Errors
///
/// Returns error if the address cannot be bound or the server fails
pub async fn serve(bind: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind health endpoint to {}: {}", bind, e))?;

    tracing::info!("Health endpoint listening on http://{}", bind);

    axum::serve(listener, create_router())
        .await
        .map_err(|e| anyhow::anyhow!("Health endpoint error: {}", e))
}

/// Run [`serve`] in the background, logging why it stopped
pub fn spawn(bind: SocketAddr) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = serve(bind).await {
            tracing::error!("Health endpoint stopped: {:#}", e);
        }
    })
}
