use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::net::SocketAddr;

use crate::config::ServiceTarget;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub service: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub gateway: String,
    pub services: Vec<ServiceTarget>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

// Gateway liveness endpoint. Never touches the backends, so it answers even
// when every proxied service is down.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        service: crate::SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// Prometheus text exposition of every registered series.
pub async fn metrics_endpoint(State(state): State<AppState>) -> Response {
    match state.metrics.gather() {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "Error generating metrics").into_response()
        }
    }
}

// Static view of the routing table; reports configuration, not backend
// reachability.
pub async fn service_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        gateway: "healthy".to_string(),
        services: state.config.services.clone(),
        timestamp: chrono::Utc::now(),
    })
}

// Fallback handler: resolve the route table and proxy, or answer 404 with
// the known prefixes.
pub async fn proxy_fallback(State(state): State<AppState>, request: Request) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let Some(entry) = state.routes.resolve(&path) else {
        tracing::warn!(method = %method, path = %path, "No route for path");
        return (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "Endpoint not found",
                "path": path,
                "method": method.as_str(),
                "available_routes": state.routes.available_routes(),
            })),
        )
            .into_response();
    };

    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|connect_info| connect_info.0);

    match state.proxy.forward(entry, client_addr, request).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}
