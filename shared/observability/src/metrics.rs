use http::{Method, StatusCode};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};

/// Latency buckets in seconds, tuned for a gateway sitting in front of
/// local-network services.
pub const DURATION_BUCKETS: [f64; 11] = [
    0.01, 0.05, 0.1, 0.3, 0.5, 0.7, 1.0, 3.0, 5.0, 7.0, 10.0,
];

/// Prometheus recorder for one service. Owns an explicit registry so tests
/// and multiple instances never collide through global state.
///
/// Every series carries a `service` label bound at construction time.
#[derive(Clone)]
pub struct MetricsRecorder {
    service: String,
    registry: Registry,
    #[cfg(target_os = "linux")]
    process_registry: Registry,
    http_request_duration: HistogramVec,
    http_requests_total: IntCounterVec,
    active_connections: IntGaugeVec,
    bookings_created: IntCounterVec,
    bookings_cancelled: IntCounterVec,
    users_registered: IntCounterVec,
    auth_attempts: IntCounterVec,
    notifications_sent: IntCounterVec,
    database_queries: IntCounterVec,
    cache_operations: IntCounterVec,
}

impl MetricsRecorder {
    pub fn new(service: &str) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Histogram: request latency by method, route, status and service
        let http_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "Duration of HTTP requests in seconds",
            )
            .buckets(DURATION_BUCKETS.to_vec()),
            &["method", "route", "status_code", "service"],
        )?;

        // Counter: total requests, same label set as the histogram
        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "route", "status_code", "service"],
        )?;

        // Gauge: requests currently in flight
        let active_connections = IntGaugeVec::new(
            Opts::new(
                "http_active_connections",
                "Number of active HTTP connections",
            ),
            &["service"],
        )?;

        let bookings_created = IntCounterVec::new(
            Opts::new("bookings_created_total", "Total number of bookings created"),
            &["venue_id", "status", "service"],
        )?;

        let bookings_cancelled = IntCounterVec::new(
            Opts::new(
                "bookings_cancelled_total",
                "Total number of bookings cancelled",
            ),
            &["venue_id", "reason", "service"],
        )?;

        let users_registered = IntCounterVec::new(
            Opts::new("users_registered_total", "Total number of users registered"),
            &["role", "provider", "service"],
        )?;

        let auth_attempts = IntCounterVec::new(
            Opts::new(
                "auth_attempts_total",
                "Total number of authentication attempts",
            ),
            &["result", "method", "service"],
        )?;

        let notifications_sent = IntCounterVec::new(
            Opts::new(
                "notifications_sent_total",
                "Total number of notifications sent",
            ),
            &["type", "status", "service"],
        )?;

        let database_queries = IntCounterVec::new(
            Opts::new(
                "database_queries_total",
                "Total number of database queries executed",
            ),
            &["operation", "table", "service"],
        )?;

        let cache_operations = IntCounterVec::new(
            Opts::new("cache_operations_total", "Total number of cache operations"),
            &["operation", "result", "service"],
        )?;

        registry.register(Box::new(http_request_duration.clone()))?;
        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(active_connections.clone()))?;
        registry.register(Box::new(bookings_created.clone()))?;
        registry.register(Box::new(bookings_cancelled.clone()))?;
        registry.register(Box::new(users_registered.clone()))?;
        registry.register(Box::new(auth_attempts.clone()))?;
        registry.register(Box::new(notifications_sent.clone()))?;
        registry.register(Box::new(database_queries.clone()))?;
        registry.register(Box::new(cache_operations.clone()))?;

        // Process metrics (CPU, memory, fds) live in their own registry so
        // their family names can carry a per-service prefix.
        #[cfg(target_os = "linux")]
        let process_registry = {
            let prefix = service.replace('-', "_");
            let registry = Registry::new_custom(Some(prefix), None)?;
            registry.register(Box::new(
                prometheus::process_collector::ProcessCollector::for_self(),
            ))?;
            registry
        };

        Ok(Self {
            service: service.to_string(),
            registry,
            #[cfg(target_os = "linux")]
            process_registry,
            http_request_duration,
            http_requests_total,
            active_connections,
            bookings_created,
            bookings_cancelled,
            users_registered,
            auth_attempts,
            notifications_sent,
            database_queries,
            cache_operations,
        })
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Records one finished request into the duration histogram and the
    /// request counter. Callers invoke this exactly once per request.
    pub fn record_http_request(
        &self,
        method: &Method,
        route: &str,
        status: StatusCode,
        duration_seconds: f64,
    ) -> Result<(), prometheus::Error> {
        if !duration_seconds.is_finite() || duration_seconds < 0.0 {
            return Err(prometheus::Error::Msg(format!(
                "request duration must be a non-negative finite number, got {}",
                duration_seconds
            )));
        }

        let method = method.as_str().to_uppercase();
        let status = status.as_u16().to_string();
        let labels = [method.as_str(), route, status.as_str(), &self.service];

        self.http_request_duration
            .get_metric_with_label_values(&labels)?
            .observe(duration_seconds);
        self.http_requests_total
            .get_metric_with_label_values(&labels)?
            .inc();
        Ok(())
    }

    pub fn increment_active_connections(&self) {
        if let Ok(gauge) = self
            .active_connections
            .get_metric_with_label_values(&[&self.service])
        {
            gauge.inc();
        }
    }

    /// Decrements the in-flight gauge. The gauge never crosses below zero
    /// even if a caller mispairs increments and decrements.
    pub fn decrement_active_connections(&self) {
        if let Ok(gauge) = self
            .active_connections
            .get_metric_with_label_values(&[&self.service])
        {
            if gauge.get() > 0 {
                gauge.dec();
            }
        }
    }

    pub fn set_active_connections(&self, count: i64) {
        if let Ok(gauge) = self
            .active_connections
            .get_metric_with_label_values(&[&self.service])
        {
            gauge.set(count.max(0));
        }
    }

    pub fn active_connection_count(&self) -> i64 {
        self.active_connections
            .get_metric_with_label_values(&[&self.service])
            .map(|gauge| gauge.get())
            .unwrap_or(0)
    }

    /// Increments a business counter by metric key, e.g.
    /// `record_business_metric("bookings_created", &[("venue_id", "v1"), ("status", "confirmed")])`.
    ///
    /// Unknown keys are a silent no-op. Missing label values default to
    /// `unknown`. The `service` label is appended automatically.
    pub fn record_business_metric(&self, name: &str, labels: &[(&str, &str)]) {
        let Some((counter, keys)) = self.business_counter(name) else {
            return;
        };

        let mut values: Vec<&str> = keys
            .iter()
            .map(|key| {
                labels
                    .iter()
                    .find(|(label_key, _)| label_key == key)
                    .map(|(_, value)| *value)
                    .unwrap_or("unknown")
            })
            .collect();
        values.push(&self.service);

        match counter.get_metric_with_label_values(&values) {
            Ok(counter) => counter.inc(),
            Err(err) => {
                tracing::debug!(metric = name, error = %err, "failed to record business metric");
            }
        }
    }

    pub fn record_booking_created(&self, venue_id: &str, status: &str) {
        self.record_business_metric(
            "bookings_created",
            &[("venue_id", venue_id), ("status", status)],
        );
    }

    pub fn record_booking_cancelled(&self, venue_id: &str, reason: &str) {
        self.record_business_metric(
            "bookings_cancelled",
            &[("venue_id", venue_id), ("reason", reason)],
        );
    }

    pub fn record_user_registered(&self, role: &str, provider: &str) {
        self.record_business_metric("users_registered", &[("role", role), ("provider", provider)]);
    }

    pub fn record_auth_attempt(&self, result: &str, method: &str) {
        self.record_business_metric("auth_attempts", &[("result", result), ("method", method)]);
    }

    pub fn record_notification_sent(&self, notification_type: &str, status: &str) {
        self.record_business_metric(
            "notifications_sent",
            &[("type", notification_type), ("status", status)],
        );
    }

    pub fn record_database_query(&self, operation: &str, table: &str) {
        self.record_business_metric(
            "database_queries",
            &[("operation", operation), ("table", table)],
        );
    }

    pub fn record_cache_operation(&self, operation: &str, result: &str) {
        self.record_business_metric(
            "cache_operations",
            &[("operation", operation), ("result", result)],
        );
    }

    fn business_counter(&self, name: &str) -> Option<(&IntCounterVec, &'static [&'static str])> {
        match name {
            "bookings_created" => Some((&self.bookings_created, &["venue_id", "status"])),
            "bookings_cancelled" => Some((&self.bookings_cancelled, &["venue_id", "reason"])),
            "users_registered" => Some((&self.users_registered, &["role", "provider"])),
            "auth_attempts" => Some((&self.auth_attempts, &["result", "method"])),
            "notifications_sent" => Some((&self.notifications_sent, &["type", "status"])),
            "database_queries" => Some((&self.database_queries, &["operation", "table"])),
            "cache_operations" => Some((&self.cache_operations, &["operation", "result"])),
            _ => None,
        }
    }

    /// Renders every registered family in Prometheus text format. Families
    /// within a registry come out sorted by name, so repeated calls with the
    /// same data produce identical output.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();

        encoder.encode(&self.registry.gather(), &mut buffer)?;
        #[cfg(target_os = "linux")]
        encoder.encode(&self.process_registry.gather(), &mut buffer)?;

        String::from_utf8(buffer)
            .map_err(|err| prometheus::Error::Msg(format!("metrics output was not UTF-8: {}", err)))
    }

    /// Drops every recorded series while keeping registration intact. Meant
    /// for test isolation.
    pub fn reset(&self) {
        self.http_request_duration.reset();
        self.http_requests_total.reset();
        self.active_connections.reset();
        self.bookings_created.reset();
        self.bookings_cancelled.reset();
        self.users_registered.reset();
        self.auth_attempts.reset();
        self.notifications_sent.reset();
        self.database_queries.reset();
        self.cache_operations.reset();
    }
}
