//! Axum router assembly and server loop

use crate::{api, sse, state::AppState, ServerResult};
use axum::{
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Network configuration for the control plane server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Build the control plane router over shared state
pub fn router(state: AppState) -> Router {
    Router::new()
        // Bucket endpoints
        .route("/api/upload", post(api::upload_handler))
        .route("/api/delete", post(api::delete_handler))
        .route("/files/:name", get(api::serve_file_handler))
        // Delivery metadata
        .route("/api/manifest.json", get(api::manifest_handler))
        .route("/api/alive-cdn.json", get(api::alive_cdn_handler))
        // Live status stream
        .route("/sse", get(sse::sse_handler))
        // Health check
        .route(
            "/api/health",
            get(|| async {
                Json(serde_json::json!({
                    "status": "ok",
                    "service": "beacon-server",
                    "version": env!("CARGO_PKG_VERSION"),
                }))
            }),
        )
        // Assets are consumed cross-origin by design, so CORS is open.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the control plane server until the process exits
pub async fn run_server(config: ServerConfig, state: AppState) -> ServerResult<()> {
    let app = router(state);
    let addr = format!("{}:{}", config.host, config.port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("🛰️  Beacon control plane listening on http://{}", addr);
    tracing::info!("   Manifest: http://{}/api/manifest.json", addr);
    tracing::info!("   Failover: http://{}/api/alive-cdn.json", addr);
    tracing::info!("   Status stream: http://{}/sse", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
