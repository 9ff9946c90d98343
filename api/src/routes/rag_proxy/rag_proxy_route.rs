//! POST /api/rag and POST /api/{backend}/api/v1/rag/query: RAG query proxy.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
};
use tracing::{debug, info, instrument, warn};

use crate::{
    core::{
        app_state::AppState,
        http::response_envelope::JsonReply,
        proxy_translator::{BackendSelector, ValidatedQuery, translate_reply, validate_query},
    },
    error_handler::AppResult,
    middleware_layer::error_envelope_mapper::REQUEST_ID_HEADER,
};

/// Handler: POST /api/rag (backend selected by the `backend` body field)
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:3000/api/rag \
///   -H 'content-type: application/json' \
///   -d '{"backend":"python","query":"What is RAG?","topK":5,"options":{"returnCitations":true}}'
/// ```
#[instrument(name = "rag_proxy_route", skip_all)]
pub async fn rag_proxy_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<JsonReply> {
    proxy_query(&state, &headers, &body, BackendSelector::Body).await
}

/// Handler: POST /api/{backend}/api/v1/rag/query (backend selected by the route)
#[instrument(name = "backend_query_route", skip(state, headers, body))]
pub async fn backend_query_route(
    State(state): State<Arc<AppState>>,
    Path(backend): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<JsonReply> {
    proxy_query(&state, &headers, &body, BackendSelector::Route(&backend)).await
}

async fn proxy_query(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
    selector: BackendSelector<'_>,
) -> AppResult<JsonReply> {
    if let Some(id) = headers.get(REQUEST_ID_HEADER).and_then(|h| h.to_str().ok()) {
        debug!(%id, "request id attached");
    }

    let ValidatedQuery { backend, payload } = validate_query(body, selector).inspect_err(|err| {
        debug!(error = %err, "rejected invalid query request");
    })?;

    let reply = state
        .backends
        .query(backend, &payload)
        .await
        .inspect_err(|err| warn!(backend = %backend, error = %err, "backend call failed"))?;

    let (status, latency_ms) = (reply.status, reply.latency_ms);
    let out = translate_reply(reply)?;
    info!(backend = %backend, %status, latency_ms, "query proxied");
    Ok(out)
}
