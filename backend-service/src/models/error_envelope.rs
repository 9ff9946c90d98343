use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable error codes used in envelopes produced by this system.
pub mod codes {
    /// Client input fault; no upstream call was attempted.
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    /// Local misconfiguration or unexpected server fault.
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
    /// Anything wrong with or after the call to a backend.
    pub const UPSTREAM_ERROR: &str = "UPSTREAM_ERROR";
    /// No route matched.
    pub const NOT_FOUND: &str = "NOT_FOUND";
    /// Route exists but not for this method.
    pub const METHOD_NOT_ALLOWED: &str = "METHOD_NOT_ALLOWED";
}

/// Uniform failure shape: `{ "error": { "code", "message", "details"? } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable code (e.g. `BAD_REQUEST`).
    pub code: String,
    /// Human-friendly message.
    pub message: String,
    /// Structured or opaque context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorEnvelope {
    pub fn new(code: impl Into<String>, message: impl Into<String>, details: Option<Value>) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
                details,
            },
        }
    }

    /// Decodes `value` as an envelope.
    ///
    /// Returns `None` unless `error` is an object carrying string `code` and
    /// `message`; `{}` or `{"error": "boom"}` are not envelopes.
    pub fn from_value(value: &Value) -> Option<Self> {
        let error = value.as_object()?.get("error")?;
        if !error.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    /// Whether `value` is a well-formed envelope.
    pub fn is_envelope(value: &Value) -> bool {
        Self::from_value(value).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recognizes_well_formed_envelopes() {
        assert!(ErrorEnvelope::is_envelope(&json!({
            "error": { "code": "RATE_LIMITED", "message": "slow down" }
        })));
        assert!(ErrorEnvelope::is_envelope(&json!({
            "error": { "code": "BAD_REQUEST", "message": "Validation failed", "details": "opaque" }
        })));
    }

    #[test]
    fn rejects_lookalikes() {
        for value in [
            json!({}),
            json!(null),
            json!("Internal Server Error"),
            json!({ "error": "boom" }),
            json!({ "error": { "code": "X" } }),
            json!({ "error": { "code": 500, "message": "m" } }),
            json!({ "detail": { "error": { "code": "X", "message": "m" } } }),
        ] {
            assert!(!ErrorEnvelope::is_envelope(&value), "{value} is not an envelope");
        }
    }

    #[test]
    fn details_are_omitted_when_absent() {
        let env = ErrorEnvelope::new(codes::UPSTREAM_ERROR, "m", None);
        assert_eq!(
            serde_json::to_value(&env).unwrap(),
            json!({ "error": { "code": "UPSTREAM_ERROR", "message": "m" } })
        );
    }
}
