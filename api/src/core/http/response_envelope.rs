use axum::{
    body::Bytes,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::Value;

/// A JSON body relayed with an explicit status.
///
/// Used for backend answers that are forwarded verbatim: successful RAG
/// responses and backend-provided error envelopes. The body is kept as bytes
/// so key order and number formatting survive the hop.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonReply {
    pub status: StatusCode,
    pub body: Bytes,
}

impl JsonReply {
    /// Serializes `body` compactly.
    pub fn new(status: StatusCode, body: &Value) -> Self {
        Self {
            status,
            body: Bytes::from(body.to_string()),
        }
    }

    /// Relays already-validated JSON bytes untouched. An empty body is
    /// replaced by the serialized `fallback`.
    pub fn relay(status: StatusCode, raw: Vec<u8>, fallback: &Value) -> Self {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Self::new(status, fallback);
        }
        Self {
            status,
            body: Bytes::from(raw),
        }
    }
}

impl IntoResponse for JsonReply {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            self.body,
        )
            .into_response()
    }
}
