use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use thiserror::Error;

/// Errors produced while forwarding a request. Client-facing bodies never
/// expose backend addresses; the full error is only logged server-side.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("timed out waiting for {service}")]
    UpstreamTimeout { service: String },

    #[error("connection to {service} refused")]
    UpstreamUnreachable { service: String },

    #[error("transport failure talking to {service}: {source}")]
    UpstreamTransport {
        service: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("internal gateway error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::UpstreamTimeout { .. }
            | GatewayError::UpstreamUnreachable { .. }
            | GatewayError::UpstreamTransport { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn service(&self) -> Option<&str> {
        match self {
            GatewayError::UpstreamTimeout { service }
            | GatewayError::UpstreamUnreachable { service }
            | GatewayError::UpstreamTransport { service, .. } => Some(service),
            GatewayError::Internal(_) => None,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            GatewayError::UpstreamTimeout { service }
            | GatewayError::UpstreamUnreachable { service }
            | GatewayError::UpstreamTransport { service, .. } => json!({
                "error": "Service temporarily unavailable",
                "service": service,
                "message": format!("Cannot connect to {}", service),
            }),
            GatewayError::Internal(message) => json!({
                "error": "Internal server error",
                "message": message,
                "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            }),
        };

        (status, Json(body)).into_response()
    }
}
