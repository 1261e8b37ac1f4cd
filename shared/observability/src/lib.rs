pub mod correlation;
pub mod logging;
pub mod metrics;

pub use correlation::CorrelationId;
pub use logging::{AuthEvent, LogContext, SecuritySeverity, ServiceLogger};
pub use metrics::MetricsRecorder;
