use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use venuebook_observability::{correlation, CorrelationId, LogContext, MetricsRecorder};

use crate::AppState;

// Synthesized status for requests the client abandoned before a response
// was produced.
const CLIENT_CLOSED_REQUEST: u16 = 499;

const DNS_PREFETCH_CONTROL: HeaderName = HeaderName::from_static("x-dns-prefetch-control");

/// Ensures every request carries a correlation id: inbound ids are reused,
/// otherwise one is generated. The id is stored in request extensions and
/// written into the headers so proxied backends see it too.
pub async fn correlation_middleware(mut request: Request, next: Next) -> Response {
    let correlation_id = correlation::extract_or_generate(request.headers());

    if !request.headers().contains_key(&correlation::CORRELATION_HEADER) {
        if let Ok(value) = HeaderValue::from_str(correlation_id.as_str()) {
            request
                .headers_mut()
                .insert(correlation::CORRELATION_HEADER, value);
        }
    }
    request.extensions_mut().insert(correlation_id);

    next.run(request).await
}

/// Applies the baseline security headers to every response, including error
/// and preflight responses.
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(DNS_PREFETCH_CONTROL, HeaderValue::from_static("off"));

    response
}

/// Logs and measures every request. The in-flight gauge is incremented on
/// entry and the duration histogram, request counter and gauge decrement all
/// land exactly once per request: on the normal path with the real status,
/// or from the guard's `Drop` with a synthesized 499 when the client goes
/// away mid-request.
pub async fn instrumentation_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let label = route_label(&state, &path);
    let ctx = log_context_for(&request);
    let logger = state.logger.with_context("http");

    logger.log_request(&method, &path, &ctx);

    let start = Instant::now();
    let mut guard = RequestGuard::new(state.metrics.clone(), method.clone(), label);

    let response = next.run(request).await;

    guard.complete(response.status());
    logger.log_response(
        &method,
        &path,
        response.status(),
        start.elapsed().as_millis() as u64,
        &ctx,
    );

    response
}

/// Metric label for a path: fixed endpoints use their literal path, proxied
/// paths collapse to their route prefix, everything else is `unknown` so
/// label cardinality stays bounded.
fn route_label(state: &AppState, path: &str) -> String {
    match path {
        "/health" | "/metrics" | "/api/status" => path.to_string(),
        _ => state
            .routes
            .resolve(path)
            .map(|entry| entry.prefix.clone())
            .unwrap_or_else(|| "unknown".to_string()),
    }
}

fn log_context_for(request: &Request) -> LogContext {
    let headers = request.headers();

    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|connect_info| connect_info.0.ip().to_string())
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .or_else(|| headers.get("x-real-ip"))
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.split(',').next())
                .map(|value| value.trim().to_string())
        });

    LogContext {
        correlation_id: request
            .extensions()
            .get::<CorrelationId>()
            .map(|id| id.as_str().to_string()),
        request_id: headers
            .get("x-request-id")
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned),
        ip,
        ..Default::default()
    }
}

struct RequestGuard {
    metrics: Arc<MetricsRecorder>,
    method: Method,
    route_label: String,
    start: Instant,
    completed: bool,
}

impl RequestGuard {
    fn new(metrics: Arc<MetricsRecorder>, method: Method, route_label: String) -> Self {
        metrics.increment_active_connections();
        Self {
            metrics,
            method,
            route_label,
            start: Instant::now(),
            completed: false,
        }
    }

    fn complete(&mut self, status: StatusCode) {
        self.record(status);
    }

    fn record(&mut self, status: StatusCode) {
        if self.completed {
            return;
        }
        self.completed = true;

        let duration = self.start.elapsed().as_secs_f64();
        if let Err(err) =
            self.metrics
                .record_http_request(&self.method, &self.route_label, status, duration)
        {
            tracing::debug!(error = %err, "Failed to record request metrics");
        }
        self.metrics.decrement_active_connections();
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        if !self.completed {
            let status = StatusCode::from_u16(CLIENT_CLOSED_REQUEST)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            self.record(status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GatewayConfig, ServiceTarget};

    fn state() -> AppState {
        let config = GatewayConfig {
            port: 0,
            frontend_origins: vec![],
            log_level: "info".to_string(),
            services: vec![ServiceTarget {
                name: "Booking Service".to_string(),
                route: "/api/bookings".to_string(),
                target: "http://localhost:3003".to_string(),
            }],
        };
        AppState::new(config).unwrap()
    }

    #[test]
    fn fixed_endpoints_label_as_their_path() {
        let state = state();
        assert_eq!(route_label(&state, "/health"), "/health");
        assert_eq!(route_label(&state, "/metrics"), "/metrics");
        assert_eq!(route_label(&state, "/api/status"), "/api/status");
    }

    #[test]
    fn proxied_paths_collapse_to_route_prefix() {
        let state = state();
        assert_eq!(route_label(&state, "/api/bookings/venues/42"), "/api/bookings");
        assert_eq!(route_label(&state, "/api/bookings"), "/api/bookings");
    }

    #[test]
    fn unmatched_paths_label_as_unknown() {
        let state = state();
        assert_eq!(route_label(&state, "/favicon.ico"), "unknown");
        assert_eq!(route_label(&state, "/api/unknown/thing"), "unknown");
    }

    #[test]
    fn completed_guard_records_real_status_once() {
        let metrics = Arc::new(MetricsRecorder::new("api-gateway").unwrap());
        let mut guard = RequestGuard::new(metrics.clone(), Method::GET, "/health".to_string());
        assert_eq!(metrics.active_connection_count(), 1);

        guard.complete(StatusCode::OK);
        guard.complete(StatusCode::INTERNAL_SERVER_ERROR);
        drop(guard);

        assert_eq!(metrics.active_connection_count(), 0);
        let output = metrics.gather().unwrap();
        assert!(output.contains("status_code=\"200\""));
        assert!(!output.contains("status_code=\"500\""));
        assert!(!output.contains("status_code=\"499\""));

        let count_line = output
            .lines()
            .find(|line| line.starts_with("http_requests_total{"))
            .unwrap();
        assert!(count_line.ends_with(" 1"), "unexpected line: {count_line}");
    }

    #[test]
    fn dropped_guard_synthesizes_client_closed_status() {
        let metrics = Arc::new(MetricsRecorder::new("api-gateway").unwrap());
        let guard = RequestGuard::new(metrics.clone(), Method::POST, "/api/bookings".to_string());
        assert_eq!(metrics.active_connection_count(), 1);

        drop(guard);

        assert_eq!(metrics.active_connection_count(), 0);
        let output = metrics.gather().unwrap();
        assert!(output.contains("status_code=\"499\""));
    }
}
