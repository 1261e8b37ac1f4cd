use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    response::Response,
};
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::GatewayError;
use crate::routes::RouteEntry;

pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

// End-to-end headers pass through untouched; these never do.
const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Forwards requests to backend services over a shared `reqwest` client.
#[derive(Clone)]
pub struct ProxyDispatcher {
    client: reqwest::Client,
}

impl ProxyDispatcher {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_UPSTREAM_TIMEOUT)
    }

    /// Builds a dispatcher with a custom upstream timeout. Redirects from
    /// backends are passed through to the client, never followed.
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    pub async fn forward(
        &self,
        entry: &RouteEntry,
        client_addr: Option<SocketAddr>,
        request: Request,
    ) -> Result<Response, GatewayError> {
        let path = request.uri().path().to_string();
        let query = request.uri().query().map(str::to_owned);
        let target_url = build_target_url(entry, &path, query.as_deref());

        tracing::info!(
            method = %request.method(),
            path = %path,
            service = %entry.service_name,
            target = %entry.target,
            "Proxying request"
        );

        // reqwest still speaks http 0.2 types, so method and headers cross
        // the version boundary as bytes.
        let method = reqwest::Method::from_bytes(request.method().as_str().as_bytes())
            .map_err(|_| GatewayError::Internal(format!("unsupported method {}", request.method())))?;
        let headers = request.headers().clone();
        let body = axum::body::to_bytes(request.into_body(), usize::MAX)
            .await
            .map_err(|err| GatewayError::Internal(format!("failed to read request body: {}", err)))?;

        let mut req_builder = self.client.request(method, &target_url);

        for (name, value) in headers.iter() {
            if should_skip_request_header(name.as_str()) {
                continue;
            }
            req_builder = req_builder.header(name.as_str(), value.as_bytes());
        }
        for (name, value) in forwarded_headers(&headers, client_addr) {
            req_builder = req_builder.header(name, value);
        }

        if !body.is_empty() {
            req_builder = req_builder.body(body);
        }

        match req_builder.send().await {
            Ok(upstream) => convert_response(upstream, &entry.service_name).await,
            Err(err) => Err(classify_send_error(err, &entry.service_name)),
        }
    }
}

fn build_target_url(entry: &RouteEntry, path: &str, query: Option<&str>) -> String {
    let mut url = format!("{}{}", entry.target, entry.strip_path(path));

    if let Some(query_string) = query {
        url.push('?');
        url.push_str(query_string);
    }

    url
}

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS.contains(&name)
}

// Host is rewritten by the client from the target URL, content-length is
// recomputed from the buffered body, and the forwarding headers are set
// explicitly below.
fn should_skip_request_header(name: &str) -> bool {
    is_hop_by_hop(name)
        || name == "host"
        || name == "content-length"
        || name.starts_with("x-forwarded-")
}

fn forwarded_headers(
    headers: &HeaderMap,
    client_addr: Option<SocketAddr>,
) -> Vec<(&'static str, String)> {
    let mut forwarded = Vec::new();

    let existing_chain = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok());
    match (existing_chain, client_addr) {
        (Some(chain), Some(addr)) => {
            forwarded.push(("x-forwarded-for", format!("{}, {}", chain, addr.ip())));
        }
        (Some(chain), None) => forwarded.push(("x-forwarded-for", chain.to_string())),
        (None, Some(addr)) => forwarded.push(("x-forwarded-for", addr.ip().to_string())),
        (None, None) => {}
    }

    let host = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get(header::HOST))
        .and_then(|value| value.to_str().ok());
    if let Some(host) = host {
        forwarded.push(("x-forwarded-host", host.to_string()));
    }

    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("http");
    forwarded.push(("x-forwarded-proto", proto.to_string()));

    forwarded
}

async fn convert_response(
    upstream: reqwest::Response,
    service: &str,
) -> Result<Response, GatewayError> {
    let status_u16 = upstream.status().as_u16();
    let status = StatusCode::from_u16(status_u16)
        .map_err(|_| GatewayError::Internal(format!("invalid upstream status {}", status_u16)))?;

    let mut response_builder = Response::builder().status(status);
    for (name, value) in upstream.headers().iter() {
        if is_hop_by_hop(name.as_str()) {
            continue;
        }
        response_builder = response_builder.header(name.as_str(), value.as_bytes());
    }

    let body_bytes = upstream
        .bytes()
        .await
        .map_err(|err| classify_send_error(err, service))?;

    response_builder
        .body(Body::from(body_bytes))
        .map_err(|err| GatewayError::Internal(format!("failed to rebuild upstream response: {}", err)))
}

fn classify_send_error(err: reqwest::Error, service: &str) -> GatewayError {
    tracing::error!(service = %service, error = %err, "Proxy request failed");

    if err.is_timeout() {
        GatewayError::UpstreamTimeout {
            service: service.to_string(),
        }
    } else if err.is_connect() {
        GatewayError::UpstreamUnreachable {
            service: service.to_string(),
        }
    } else {
        GatewayError::UpstreamTransport {
            service: service.to_string(),
            source: err,
        }
    }
}
