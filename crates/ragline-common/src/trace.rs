use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Trace ID type for correlating a request across service boundaries
///
/// Uses UUID v4 for guaranteed uniqueness across distributed systems
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceId(String);

impl TraceId {
    /// Generate a new trace ID using UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TraceId {
    fn from(id: &str) -> Self {
        if id.is_empty() {
            Self::new()
        } else {
            Self(id.to_owned())
        }
    }
}

impl From<String> for TraceId {
    fn from(id: String) -> Self {
        if id.is_empty() { Self::new() } else { Self(id) }
    }
}

#[cfg(test)]
mod tests {
    use super::TraceId;

    #[test]
    fn empty_header_value_generates_fresh_id() {
        let id = TraceId::from("");
        assert!(!id.as_str().is_empty());
    }

    #[test]
    fn provided_value_is_kept_verbatim() {
        let id = TraceId::from("abc-123");
        assert_eq!(id.as_str(), "abc-123");
    }
}
