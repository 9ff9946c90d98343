use serde::{Deserialize, Serialize};

use crate::config::backend_key::BackendKey;

/// Smallest `topK` the backends accept.
pub const TOP_K_MIN: u32 = 1;
/// Largest `topK` the backends accept.
pub const TOP_K_MAX: u32 = 50;
/// `topK` used when the caller does not pick one.
pub const DEFAULT_TOP_K: u32 = 5;

/// Body of `POST /api/v1/rag/query` as the backends expect it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagQueryRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<RagQueryFilters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<RagQueryOptions>,
}

/// Body accepted by the proxy: the backend query plus the backend selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagProxyRequest {
    pub backend: BackendKey,
    #[serde(flatten)]
    pub request: RagQueryRequest,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagQueryFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagQueryOptions {
    #[serde(default = "default_true")]
    pub return_citations: bool,
    #[serde(default)]
    pub return_debug: bool,
}

impl Default for RagQueryOptions {
    fn default() -> Self {
        Self {
            return_citations: true,
            return_debug: false,
        }
    }
}

impl RagQueryRequest {
    /// Builds a request with default `topK` and options.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: DEFAULT_TOP_K,
            filters: None,
            options: Some(RagQueryOptions::default()),
        }
    }
}

/// Clamps a requested `topK` into `TOP_K_MIN..=TOP_K_MAX`.
pub fn clamp_top_k(requested: i64) -> u32 {
    requested.clamp(TOP_K_MIN as i64, TOP_K_MAX as i64) as u32
}

fn default_top_k() -> u32 {
    DEFAULT_TOP_K
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn top_k_is_clamped_into_backend_range() {
        assert_eq!(clamp_top_k(0), 1);
        assert_eq!(clamp_top_k(-7), 1);
        assert_eq!(clamp_top_k(12), 12);
        assert_eq!(clamp_top_k(500), 50);
    }

    #[test]
    fn proxy_request_flattens_query_fields() {
        let req = RagProxyRequest {
            backend: BackendKey::Java,
            request: RagQueryRequest::new("what is rag?"),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({
                "backend": "java",
                "query": "what is rag?",
                "topK": 5,
                "options": { "returnCitations": true, "returnDebug": false }
            })
        );
    }

    #[test]
    fn missing_fields_take_backend_defaults() {
        let req: RagQueryRequest =
            serde_json::from_value(json!({ "query": "q", "options": {} })).unwrap();
        assert_eq!(req.top_k, DEFAULT_TOP_K);
        assert_eq!(req.options, Some(RagQueryOptions::default()));
        assert!(req.filters.is_none());
    }
}
