pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod proxy;
pub mod routes;

use std::sync::Arc;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware as axum_middleware,
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use venuebook_observability::{MetricsRecorder, ServiceLogger};

use crate::config::GatewayConfig;
use crate::proxy::ProxyDispatcher;
use crate::routes::RouteTable;

pub const SERVICE_NAME: &str = "api-gateway";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub routes: Arc<RouteTable>,
    pub proxy: ProxyDispatcher,
    pub metrics: Arc<MetricsRecorder>,
    pub logger: ServiceLogger,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> Result<Self, prometheus::Error> {
        Self::with_dispatcher(config, ProxyDispatcher::new())
    }

    /// Same as `new` with a caller-provided dispatcher, e.g. one with a
    /// shorter upstream timeout.
    pub fn with_dispatcher(
        config: GatewayConfig,
        proxy: ProxyDispatcher,
    ) -> Result<Self, prometheus::Error> {
        let metrics = Arc::new(MetricsRecorder::new(SERVICE_NAME)?);
        let logger = ServiceLogger::new(SERVICE_NAME);
        let routes = Arc::new(RouteTable::new(&config.services));

        Ok(Self {
            config: Arc::new(config),
            routes,
            proxy,
            metrics,
            logger,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        // Gateway-owned endpoints. Unmatched methods on these paths fall
        // through to the same catch-all as unmatched paths.
        .route(
            "/health",
            get(handlers::health_check).fallback(handlers::proxy_fallback),
        )
        .route(
            "/metrics",
            get(handlers::metrics_endpoint).fallback(handlers::proxy_fallback),
        )
        .route(
            "/api/status",
            get(handlers::service_status).fallback(handlers::proxy_fallback),
        )
        // Everything else is proxied to the backend services
        .fallback(handlers::proxy_fallback)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum_middleware::from_fn(
                    middleware::security_headers_middleware,
                ))
                .layer(cors)
                .layer(axum_middleware::from_fn(middleware::correlation_middleware))
                .layer(axum_middleware::from_fn_with_state(
                    state.clone(),
                    middleware::instrumentation_middleware,
                )),
        )
        .with_state(state)
}

fn cors_layer(config: &GatewayConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .frontend_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-correlation-id"),
            HeaderName::from_static("x-request-id"),
        ])
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}
