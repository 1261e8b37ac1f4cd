use http::header::{HeaderMap, HeaderName};
use uuid::Uuid;

pub const CORRELATION_HEADER: HeaderName = HeaderName::from_static("x-correlation-id");
pub const CORRELATION_HEADER_ALT: HeaderName = HeaderName::from_static("correlation-id");

/// Correlation id carried through a request, either taken from the inbound
/// headers or generated at the edge. Stored in request extensions so that
/// logging and proxying see the same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn generate() -> Self {
        Self(generate_value())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reads the correlation id from `x-correlation-id`, falling back to
/// `correlation-id`. Header name lookup is case-insensitive. Empty values are
/// treated as absent.
pub fn extract(headers: &HeaderMap) -> Option<CorrelationId> {
    headers
        .get(&CORRELATION_HEADER)
        .or_else(|| headers.get(&CORRELATION_HEADER_ALT))
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(CorrelationId::new)
}

pub fn extract_or_generate(headers: &HeaderMap) -> CorrelationId {
    extract(headers).unwrap_or_else(CorrelationId::generate)
}

// Millisecond timestamp plus a short random suffix, e.g. "1756116000123-9f86d0815".
fn generate_value() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let random = Uuid::new_v4().simple().to_string();
    format!("{}-{}", millis, &random[..9])
}
