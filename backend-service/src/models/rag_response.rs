use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Successful answer of `POST /api/v1/rag/query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagResponse {
    pub answer: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    pub metrics: Metrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<Value>,
}

/// A retrieved source fragment attached to an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub doc_id: String,
    pub chunk_id: String,
    pub text: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

/// Latency and token accounting reported by the backend.
///
/// `backend` stays a string: backends may report labels this crate does not know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub backend: String,
    pub latency_ms: u64,
    pub retrieved_count: u64,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub prompt_tokens: Option<u64>,
    #[serde(default)]
    pub completion_tokens: Option<u64>,
    #[serde(default)]
    pub total_tokens: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_java_backend_answer() {
        let body = json!({
            "answer": "Paris",
            "citations": [{
                "docId": "demo-doc",
                "chunkId": "demo-doc#1",
                "text": "(stub) Placeholder citation.",
                "score": 0.8,
                "meta": { "source": "stub" }
            }],
            "metrics": {
                "backend": "java",
                "latencyMs": 412,
                "retrievedCount": 1,
                "model": "gpt-4o-mini",
                "promptTokens": 31,
                "completionTokens": 4,
                "totalTokens": 35
            },
            "debug": null
        });

        let resp: RagResponse = serde_json::from_value(body).unwrap();
        assert_eq!(resp.answer, "Paris");
        assert_eq!(resp.citations.len(), 1);
        assert_eq!(resp.citations[0].chunk_id, "demo-doc#1");
        assert_eq!(resp.metrics.total_tokens, Some(35));
        assert!(resp.debug.is_none());
    }

    #[test]
    fn token_counts_are_optional() {
        let resp: RagResponse = serde_json::from_value(json!({
            "answer": "42",
            "metrics": { "backend": "python", "latencyMs": 10, "retrievedCount": 5 }
        }))
        .unwrap();
        assert!(resp.citations.is_empty());
        assert_eq!(resp.metrics.model, None);
        assert_eq!(resp.metrics.prompt_tokens, None);
    }
}
