use http::{Method, StatusCode};
use tracing::Level;

/// Per-request fields attached to every log record. Absent fields are logged
/// as empty strings so records keep a stable shape.
#[derive(Debug, Clone, Default)]
pub struct LogContext {
    pub correlation_id: Option<String>,
    pub request_id: Option<String>,
    pub user_id: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    Login,
    Logout,
    Register,
    FailedLogin,
}

impl AuthEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthEvent::Login => "login",
            AuthEvent::Logout => "logout",
            AuthEvent::Register => "register",
            AuthEvent::FailedLogin => "failed_login",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecuritySeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SecuritySeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecuritySeverity::Low => "low",
            SecuritySeverity::Medium => "medium",
            SecuritySeverity::High => "high",
            SecuritySeverity::Critical => "critical",
        }
    }

    pub fn level(&self) -> Level {
        match self {
            SecuritySeverity::Low | SecuritySeverity::Medium => Level::INFO,
            SecuritySeverity::High => Level::WARN,
            SecuritySeverity::Critical => Level::ERROR,
        }
    }
}

pub fn response_level(status: StatusCode) -> Level {
    if status.as_u16() >= 400 {
        Level::WARN
    } else {
        Level::INFO
    }
}

/// Structured logger bound to a service name and a context label. All methods
/// are infallible; logging must never break request handling.
#[derive(Debug, Clone)]
pub struct ServiceLogger {
    service: String,
    context: String,
}

impl ServiceLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            context: "application".to_string(),
        }
    }

    /// Returns a child logger with the same service name and a different
    /// context label, e.g. "http", "proxy", "startup".
    pub fn with_context(&self, context: impl Into<String>) -> Self {
        Self {
            service: self.service.clone(),
            context: context.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn error(&self, message: &str, ctx: &LogContext) {
        tracing::error!(
            service = %self.service,
            context = %self.context,
            correlation_id = ctx.correlation_id.as_deref().unwrap_or(""),
            request_id = ctx.request_id.as_deref().unwrap_or(""),
            user_id = ctx.user_id.as_deref().unwrap_or(""),
            ip = ctx.ip.as_deref().unwrap_or(""),
            user_agent = ctx.user_agent.as_deref().unwrap_or(""),
            metadata = %ctx.metadata.as_ref().map(|m| m.to_string()).unwrap_or_default(),
            "{}",
            message
        );
    }

    pub fn warn(&self, message: &str, ctx: &LogContext) {
        tracing::warn!(
            service = %self.service,
            context = %self.context,
            correlation_id = ctx.correlation_id.as_deref().unwrap_or(""),
            request_id = ctx.request_id.as_deref().unwrap_or(""),
            user_id = ctx.user_id.as_deref().unwrap_or(""),
            ip = ctx.ip.as_deref().unwrap_or(""),
            user_agent = ctx.user_agent.as_deref().unwrap_or(""),
            metadata = %ctx.metadata.as_ref().map(|m| m.to_string()).unwrap_or_default(),
            "{}",
            message
        );
    }

    pub fn info(&self, message: &str, ctx: &LogContext) {
        tracing::info!(
            service = %self.service,
            context = %self.context,
            correlation_id = ctx.correlation_id.as_deref().unwrap_or(""),
            request_id = ctx.request_id.as_deref().unwrap_or(""),
            user_id = ctx.user_id.as_deref().unwrap_or(""),
            ip = ctx.ip.as_deref().unwrap_or(""),
            user_agent = ctx.user_agent.as_deref().unwrap_or(""),
            metadata = %ctx.metadata.as_ref().map(|m| m.to_string()).unwrap_or_default(),
            "{}",
            message
        );
    }

    pub fn debug(&self, message: &str, ctx: &LogContext) {
        tracing::debug!(
            service = %self.service,
            context = %self.context,
            correlation_id = ctx.correlation_id.as_deref().unwrap_or(""),
            request_id = ctx.request_id.as_deref().unwrap_or(""),
            user_id = ctx.user_id.as_deref().unwrap_or(""),
            ip = ctx.ip.as_deref().unwrap_or(""),
            user_agent = ctx.user_agent.as_deref().unwrap_or(""),
            metadata = %ctx.metadata.as_ref().map(|m| m.to_string()).unwrap_or_default(),
            "{}",
            message
        );
    }

    pub fn verbose(&self, message: &str, ctx: &LogContext) {
        tracing::trace!(
            service = %self.service,
            context = %self.context,
            correlation_id = ctx.correlation_id.as_deref().unwrap_or(""),
            request_id = ctx.request_id.as_deref().unwrap_or(""),
            user_id = ctx.user_id.as_deref().unwrap_or(""),
            ip = ctx.ip.as_deref().unwrap_or(""),
            user_agent = ctx.user_agent.as_deref().unwrap_or(""),
            metadata = %ctx.metadata.as_ref().map(|m| m.to_string()).unwrap_or_default(),
            "{}",
            message
        );
    }

    pub fn log_request(&self, method: &Method, path: &str, ctx: &LogContext) {
        self.info(&format!("{} {}", method, path), ctx);
    }

    /// Responses with status >= 400 are logged at warn, everything else at
    /// info.
    pub fn log_response(
        &self,
        method: &Method,
        path: &str,
        status: StatusCode,
        duration_ms: u64,
        ctx: &LogContext,
    ) {
        let message = format!("{} {} {} {}ms", method, path, status.as_u16(), duration_ms);
        if response_level(status) == Level::WARN {
            self.warn(&message, ctx);
        } else {
            self.info(&message, ctx);
        }
    }

    pub fn log_business_event(&self, event: &str, ctx: &LogContext) {
        self.info(&format!("Business Event: {}", event), ctx);
    }

    pub fn log_auth_event(&self, event: AuthEvent, user_id: Option<&str>, ctx: &LogContext) {
        let mut ctx = ctx.clone();
        if let Some(user_id) = user_id {
            ctx.user_id = Some(user_id.to_string());
        }
        self.info(&format!("Auth Event: {}", event.as_str()), &ctx);
    }

    pub fn log_security_event(&self, event: &str, severity: SecuritySeverity, ctx: &LogContext) {
        let message = format!("Security Event: {} (severity: {})", event, severity.as_str());
        let level = severity.level();
        if level == Level::ERROR {
            self.error(&message, ctx);
        } else if level == Level::WARN {
            self.warn(&message, ctx);
        } else {
            self.info(&message, ctx);
        }
    }

    pub fn log_database_operation(
        &self,
        operation: &str,
        table: &str,
        duration_ms: Option<u64>,
        ctx: &LogContext,
    ) {
        let message = match duration_ms {
            Some(ms) => format!("Database {} on {} ({}ms)", operation, table, ms),
            None => format!("Database {} on {}", operation, table),
        };
        self.debug(&message, ctx);
    }

    pub fn log_cache_operation(
        &self,
        operation: &str,
        key: &str,
        hit: Option<bool>,
        duration_ms: Option<u64>,
        ctx: &LogContext,
    ) {
        let mut message = match hit {
            Some(true) => format!("Cache {} for {} (HIT)", operation, key),
            Some(false) => format!("Cache {} for {} (MISS)", operation, key),
            None => format!("Cache {} for {}", operation, key),
        };
        if let Some(ms) = duration_ms {
            message.push_str(&format!(" ({}ms)", ms));
        }
        self.debug(&message, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_level_warns_at_client_and_server_errors() {
        assert_eq!(response_level(StatusCode::OK), Level::INFO);
        assert_eq!(response_level(StatusCode::PERMANENT_REDIRECT), Level::INFO);
        assert_eq!(response_level(StatusCode::BAD_REQUEST), Level::WARN);
        assert_eq!(response_level(StatusCode::NOT_FOUND), Level::WARN);
        assert_eq!(response_level(StatusCode::BAD_GATEWAY), Level::WARN);
    }

    #[test]
    fn security_severity_maps_to_levels() {
        assert_eq!(SecuritySeverity::Low.level(), Level::INFO);
        assert_eq!(SecuritySeverity::Medium.level(), Level::INFO);
        assert_eq!(SecuritySeverity::High.level(), Level::WARN);
        assert_eq!(SecuritySeverity::Critical.level(), Level::ERROR);
    }

    #[test]
    fn auth_events_have_stable_names() {
        assert_eq!(AuthEvent::Login.as_str(), "login");
        assert_eq!(AuthEvent::FailedLogin.as_str(), "failed_login");
    }

    #[test]
    fn with_context_keeps_service_name() {
        let logger = ServiceLogger::new("api-gateway");
        let child = logger.with_context("proxy");
        assert_eq!(child.service(), "api-gateway");
    }

    #[test]
    fn logging_methods_accept_sparse_context() {
        let logger = ServiceLogger::new("api-gateway");
        let ctx = LogContext::default();

        logger.log_request(&Method::GET, "/health", &ctx);
        logger.log_response(&Method::GET, "/health", StatusCode::OK, 3, &ctx);
        logger.log_business_event("booking_created", &ctx);
        logger.log_auth_event(AuthEvent::Login, Some("user-1"), &ctx);
        logger.log_security_event("rate limit exceeded", SecuritySeverity::High, &ctx);
        logger.log_database_operation("SELECT", "bookings", Some(12), &ctx);
        logger.log_cache_operation("get", "venue:42", Some(true), Some(2), &ctx);
    }
}
