//! Request validation and response normalization for proxied backend calls.
//!
//! Validation runs in a fixed order and stops at the first failure:
//! 1. body is JSON
//! 2. backend selector is a known key
//! 3. `query` is a non-empty string
//!
//! The base URL lookup (step 4) happens in the backend client, still before
//! any network activity.

use backend_service::{BackendKey, UpstreamError, UpstreamReply, models::ErrorEnvelope};
use serde_json::{Map, Value, json};

use crate::{core::http::response_envelope::JsonReply, error_handler::AppError};

/// Where the backend selector comes from.
#[derive(Debug, Clone, Copy)]
pub enum BackendSelector<'a> {
    /// `backend` field of the JSON body.
    Body,
    /// Path segment of the route that was invoked.
    Route(&'a str),
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedQuery {
    pub backend: BackendKey,
    /// Body to send upstream: the inbound object without `backend`.
    pub payload: Value,
}

/// Validates an inbound query body.
///
/// A JSON body that is not an object is treated as an object without fields.
/// The `backend` field is always removed from the payload, even when the
/// selector comes from the route.
pub fn validate_query(body: &[u8], selector: BackendSelector<'_>) -> Result<ValidatedQuery, AppError> {
    let parsed: Value = serde_json::from_slice(body).map_err(|e| AppError::BadRequest {
        message: "Request body must be valid JSON.".into(),
        details: Some(json!({ "reason": e.to_string() })),
    })?;

    let mut fields = match parsed {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let body_backend = fields.remove("backend");
    let raw_backend = match selector {
        BackendSelector::Body => body_backend.as_ref().and_then(Value::as_str),
        BackendSelector::Route(segment) => Some(segment),
    };
    let backend = raw_backend
        .and_then(|s| s.parse::<BackendKey>().ok())
        .ok_or_else(|| AppError::bad_field("backend is required.", "backend"))?;

    let has_query = fields
        .get("query")
        .and_then(Value::as_str)
        .is_some_and(|q| !q.trim().is_empty());
    if !has_query {
        return Err(AppError::bad_field("query is required.", "query"));
    }

    Ok(ValidatedQuery {
        backend,
        payload: Value::Object(fields),
    })
}

/// Parses a backend selector taken from a route path.
pub fn route_backend(segment: &str) -> Result<BackendKey, AppError> {
    segment
        .parse::<BackendKey>()
        .map_err(|_| AppError::bad_field("backend is required.", "backend"))
}

/// Turns a backend answer into what the client receives.
///
/// - 2xx: body bytes forwarded verbatim with the backend's status
/// - non-2xx carrying a well-formed envelope: forwarded verbatim with the backend's status
/// - any other non-2xx: `UPSTREAM_ERROR` 502 naming the backend and its status
pub fn translate_reply(reply: UpstreamReply) -> Result<JsonReply, AppError> {
    let UpstreamReply {
        backend,
        status,
        body,
        raw,
        ..
    } = reply;

    if status.is_success() || ErrorEnvelope::is_envelope(&body) {
        return Ok(JsonReply::relay(status, raw, &body));
    }

    Err(UpstreamError::Status {
        backend,
        status,
        snippet: String::new(),
    }
    .into())
}
