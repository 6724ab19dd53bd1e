//! HTTP server for exposing Prometheus metrics.
//!
//! This module provides an Axum-based HTTP server that serves the `/metrics`
//! endpoint for Prometheus scraping and a `/health` endpoint for health checks.

use crate::collector::Collector;
use crate::error::Result;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Prometheus text exposition format content type.
const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Shared application state.
#[derive(Clone)]
struct AppState {
    collector: Arc<Collector>,
}

/// Build the exporter's router.
pub fn router(collector: Arc<Collector>) -> Router {
    let state = AppState { collector };

    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/", get(root_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
///
/// # Arguments
///
/// * `listen_address` - Address to bind to (e.g., "0.0.0.0:9150")
/// * `collector` - Collector owning the published metrics state
pub async fn start_server(listen_address: &str, collector: Arc<Collector>) -> Result<()> {
    let app = router(collector);

    info!("Starting HTTP server on {}", listen_address);

    let listener = TcpListener::bind(listen_address).await?;

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::ResticError::Server(e.to_string()))?;

    Ok(())
}

/// Handler for /metrics endpoint.
///
/// Read-only: hands out the exposition rendered by the last completed
/// refresh cycle. Never triggers a refresh itself.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    debug!("Received metrics scrape request");

    let published = state.collector.current();
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        published.body.clone(),
    )
        .into_response()
}

/// Handler for /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "OK").into_response()
}

/// Handler for root endpoint.
async fn root_handler() -> Response {
    let html = r#"
<!DOCTYPE html>
<html>
<head>
    <title>Restic Exporter</title>
    <style>
        body { font-family: Arial, sans-serif; margin: 40px; }
        h1 { color: #333; }
        a { color: #0066cc; text-decoration: none; }
        a:hover { text-decoration: underline; }
        .info { background: #f0f0f0; padding: 15px; border-radius: 5px; margin: 20px 0; }
    </style>
</head>
<body>
    <h1>Restic Exporter</h1>
    <div class="info">
        <p>Prometheus metrics exporter for restic backup repositories</p>
        <p><strong>Endpoints:</strong></p>
        <ul>
            <li><a href="/metrics">/metrics</a> - Prometheus metrics</li>
            <li><a href="/health">/health</a> - Health check</li>
        </ul>
    </div>
</body>
</html>
"#;

    (StatusCode::OK, html).into_response()
}
