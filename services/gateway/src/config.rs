use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub port: u16,
    pub frontend_origins: Vec<String>,
    pub log_level: String,
    pub services: Vec<ServiceTarget>,
}

/// One proxied backend: requests whose path starts with `route` are forwarded
/// to `target` with the prefix stripped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceTarget {
    pub name: String,
    pub route: String,
    pub target: String,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        let port = std::env::var("API_GATEWAY_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .unwrap_or(3000);

        let frontend_origins = std::env::var("FRONTEND_URLS")
            .or_else(|_| std::env::var("FRONTEND_URL"))
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        // Declaration order matters: unmatched-route responses list routes in
        // this order, and prefix ties resolve to the earliest entry.
        let services = vec![
            ServiceTarget {
                name: "Auth Service".to_string(),
                route: "/api/auth".to_string(),
                target: service_target("AUTH_SERVICE_PORT", 3001),
            },
            ServiceTarget {
                name: "User Service".to_string(),
                route: "/api/users".to_string(),
                target: service_target("USER_SERVICE_PORT", 3002),
            },
            ServiceTarget {
                name: "Booking Service".to_string(),
                route: "/api/bookings".to_string(),
                target: service_target("BOOKING_SERVICE_PORT", 3003),
            },
            ServiceTarget {
                name: "Notification Service".to_string(),
                route: "/api/notifications".to_string(),
                target: service_target("NOTIFICATION_SERVICE_PORT", 3004),
            },
        ];

        Self {
            port,
            frontend_origins,
            log_level,
            services,
        }
    }

    /// Tracing directive covering the gateway's own crates. `verbose` maps to
    /// tracing's `trace` level.
    pub fn env_filter(&self) -> String {
        let level = match self.log_level.as_str() {
            "verbose" => "trace",
            other => other,
        };
        format!("venuebook_gateway={level},venuebook_observability={level},tower_http={level}")
    }
}

fn service_target(port_var: &str, default_port: u16) -> String {
    let port: u16 = std::env::var(port_var)
        .unwrap_or_else(|_| default_port.to_string())
        .parse()
        .unwrap_or(default_port);
    format!("http://localhost:{}", port)
}

#[cfg(test)]
mod tests {
    use super::*;

    // The one test that reads real environment variables. It clears every key
    // it depends on first and nothing else in the suite sets them.
    #[test]
    fn from_env_defaults() {
        for key in [
            "API_GATEWAY_PORT",
            "FRONTEND_URLS",
            "FRONTEND_URL",
            "LOG_LEVEL",
            "AUTH_SERVICE_PORT",
            "USER_SERVICE_PORT",
            "BOOKING_SERVICE_PORT",
            "NOTIFICATION_SERVICE_PORT",
        ] {
            std::env::remove_var(key);
        }

        let config = GatewayConfig::from_env();

        assert_eq!(config.port, 3000);
        assert_eq!(config.frontend_origins, vec!["http://localhost:3000"]);
        assert_eq!(config.log_level, "info");

        let routes: Vec<&str> = config.services.iter().map(|s| s.route.as_str()).collect();
        assert_eq!(
            routes,
            vec!["/api/auth", "/api/users", "/api/bookings", "/api/notifications"]
        );
        assert_eq!(config.services[0].name, "Auth Service");
        assert_eq!(config.services[0].target, "http://localhost:3001");
        assert_eq!(config.services[3].target, "http://localhost:3004");
    }

    #[test]
    fn env_filter_maps_verbose_to_trace() {
        let config = GatewayConfig {
            port: 3000,
            frontend_origins: vec![],
            log_level: "verbose".to_string(),
            services: vec![],
        };

        let filter = config.env_filter();
        assert!(filter.contains("venuebook_gateway=trace"));
        assert!(!filter.contains("verbose"));
    }
}
