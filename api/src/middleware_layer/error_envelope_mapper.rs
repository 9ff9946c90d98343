use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use backend_service::models::{ErrorEnvelope, error_envelope::codes};
use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, warn};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Upper bound for an error body we are willing to buffer and rewrite.
const MAX_ERROR_BODY: usize = 64 * 1024;

async fn take_body(res: Response) -> (axum::http::response::Parts, Bytes) {
    let (parts, body) = res.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_ERROR_BODY)
        .await
        .unwrap_or_default();
    (parts, bytes)
}

fn guess_field_from_serde_msg(msg: &str) -> Option<&'static str> {
    ["backend", "query", "topK", "filters", "options", "limit"]
        .into_iter()
        .find(|key| msg.contains(key))
}

fn hint_for(msg: &str) -> Option<&'static str> {
    if msg.contains("expected a sequence") {
        Some("Expected an array for this field (e.g. [\"item1\", \"item2\"]).")
    } else if msg.contains("expected a map") || msg.contains("expected struct") {
        Some("Expected a JSON object here (e.g. { \"field\": \"value\" }).")
    } else if msg.contains("invalid digit") {
        Some("Expected a number here.")
    } else {
        None
    }
}

/// Caller-supplied request id, or a fresh `req-<nanos>` one.
fn request_id(headers: &HeaderMap) -> HeaderValue {
    if let Some(h) = headers.get(REQUEST_ID_HEADER) {
        if h.to_str().is_ok_and(|v| !v.trim().is_empty()) {
            return h.clone();
        }
    }
    let nanos = Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| Utc::now().timestamp_micros() * 1000);
    // ASCII digits only; cannot fail.
    HeaderValue::from_str(&format!("req-{nanos}")).unwrap_or(HeaderValue::from_static("req-0"))
}

fn code_for(status: StatusCode) -> &'static str {
    match status {
        StatusCode::NOT_FOUND => codes::NOT_FOUND,
        StatusCode::METHOD_NOT_ALLOWED => codes::METHOD_NOT_ALLOWED,
        s if s.is_server_error() => codes::INTERNAL_ERROR,
        _ => codes::BAD_REQUEST,
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}

/// Wraps every error response that is not already JSON into an
/// [`ErrorEnvelope`] and tags all responses with `X-Request-Id`.
///
/// JSON error bodies are left untouched: they are either our own envelope or a
/// backend envelope being relayed.
pub async fn error_envelope_mapper(req: Request<Body>, next: Next) -> Response {
    let req_id = request_id(req.headers());
    let method = req.method().clone();
    let uri = req.uri().path().to_string();

    let res = next.run(req).await;
    let status = res.status();

    if !(status.is_client_error() || status.is_server_error()) || is_json(res.headers()) {
        let mut res = res;
        res.headers_mut().insert(REQUEST_ID_HEADER, req_id);
        return res;
    }

    let (mut parts, bytes) = take_body(res).await;
    let original = String::from_utf8_lossy(&bytes);
    let original = original.trim();

    let message = if original.is_empty() {
        status.canonical_reason().unwrap_or("Request failed").to_string()
    } else {
        original.to_string()
    };

    let mut details = Map::new();
    if let Some(field) = guess_field_from_serde_msg(original) {
        details.insert("field".into(), Value::from(field));
    }
    if let Some(hint) = hint_for(original) {
        details.insert("hint".into(), Value::from(hint));
    }
    let details = (!details.is_empty()).then_some(Value::Object(details));

    if status.is_server_error() {
        warn!(%method, path = %uri, %status, "non-JSON error response wrapped");
    } else {
        debug!(%method, path = %uri, %status, "non-JSON error response wrapped");
    }

    let envelope = ErrorEnvelope::new(code_for(status), message, details);
    let body = match serde_json::to_vec(&envelope) {
        Ok(v) => v,
        Err(_) => bytes.to_vec(),
    };

    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(REQUEST_ID_HEADER, req_id);

    Response::from_parts(parts, body.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, middleware, routing::get};
    use tower::ServiceExt;

    async fn plain_failure() -> (StatusCode, &'static str) {
        (StatusCode::BAD_REQUEST, "invalid type: expected a sequence at `tags`")
    }

    async fn json_failure() -> Response {
        Response::builder()
            .status(StatusCode::SERVICE_UNAVAILABLE)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"error":{"code":"X","message":"y"}}"#))
            .unwrap()
    }

    fn app() -> Router {
        Router::new()
            .route("/plain", get(plain_failure))
            .route("/json", get(json_failure))
            .route("/ok", get(|| async { "fine" }))
            .layer(middleware::from_fn(error_envelope_mapper))
    }

    async fn call(uri: &str, req_id: Option<&str>) -> (StatusCode, HeaderMap, Value) {
        let mut req = Request::builder().uri(uri);
        if let Some(id) = req_id {
            req = req.header(REQUEST_ID_HEADER, id);
        }
        let res = app().oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
        let (parts, bytes) = take_body(res).await;
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (parts.status, parts.headers, body)
    }

    #[tokio::test]
    async fn plain_text_error_is_wrapped_with_hint() {
        let (status, headers, body) = call("/plain", None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
        assert!(body["error"]["details"]["hint"].is_string());
        assert!(headers[REQUEST_ID_HEADER].to_str().unwrap().starts_with("req-"));
    }

    #[tokio::test]
    async fn json_error_is_left_alone_and_request_id_echoed() {
        let (status, headers, body) = call("/json", Some("abc-123")).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "X");
        assert_eq!(headers[REQUEST_ID_HEADER], "abc-123");
    }

    #[tokio::test]
    async fn unmatched_route_and_method_get_envelopes() {
        let (status, _, body) = call("/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");

        let res = app()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/ok")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        let (_, bytes) = take_body(res).await;
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "METHOD_NOT_ALLOWED");
        assert_eq!(body["error"]["message"], "Method Not Allowed");
    }

    #[tokio::test]
    async fn success_only_gets_request_id() {
        let res = app()
            .oneshot(Request::builder().uri("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key(REQUEST_ID_HEADER));
    }
}
