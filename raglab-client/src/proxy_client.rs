use std::time::Duration;

use anyhow::{Context, Result};
use backend_service::models::{ErrorEnvelope, RagProxyRequest, RagResponse, RecentRuns};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

pub const DEFAULT_PROXY_URL: &str = "http://127.0.0.1:3000";

/// Outcome of one `POST /api/rag` call that reached the proxy.
#[derive(Debug)]
pub enum AskOutcome {
    /// 2xx: the decoded answer plus the body exactly as received.
    Answer { response: RagResponse, raw: Value },
    /// Non-2xx, with the error envelope when the body carried one.
    Failed {
        status: StatusCode,
        envelope: Option<ErrorEnvelope>,
    },
}

/// Thin HTTP client for the proxy routes the terminal needs.
pub struct ProxyClient {
    http: reqwest::Client,
    base: String,
}

impl ProxyClient {
    pub fn new(base: &str, timeout_secs: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base: base.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Sends a query through the proxy.
    ///
    /// Transport failures are errors; HTTP failures are an [`AskOutcome::Failed`].
    pub async fn ask(&self, request: &RagProxyRequest) -> Result<AskOutcome> {
        let url = format!("{}/api/rag", self.base);
        debug!(%url, backend = %request.backend, "asking");

        let resp = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .with_context(|| format!("could not reach the proxy at {}", self.base))?;

        let status = resp.status();
        let bytes = resp.bytes().await.context("failed to read proxy response")?;
        let body: Option<Value> = serde_json::from_slice(&bytes).ok();

        if !status.is_success() {
            let envelope = body.as_ref().and_then(ErrorEnvelope::from_value);
            return Ok(AskOutcome::Failed { status, envelope });
        }

        let raw = body.context("proxy returned a non-JSON answer")?;
        let response: RagResponse =
            serde_json::from_value(raw.clone()).context("unexpected answer shape")?;
        Ok(AskOutcome::Answer { response, raw })
    }

    /// Merged recent runs of every backend.
    pub async fn recent_runs(&self, limit: usize) -> Result<RecentRuns> {
        let url = format!("{}/api/runs", self.base);
        debug!(%url, limit, "fetching recent runs");

        let resp = self
            .http
            .get(&url)
            .query(&[("limit", limit)])
            .send()
            .await
            .with_context(|| format!("could not reach the proxy at {}", self.base))?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("runs request failed: {status}");
        }
        resp.json::<RecentRuns>()
            .await
            .context("unexpected runs payload")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend_service::{BackendKey, models::RagQueryRequest};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> RagProxyRequest {
        RagProxyRequest {
            backend: BackendKey::Java,
            request: RagQueryRequest::new("what is rag?"),
        }
    }

    #[tokio::test]
    async fn answer_is_decoded_and_raw_kept() {
        let server = MockServer::start().await;
        let answer = json!({
            "answer": "retrieval augmented generation",
            "citations": [],
            "metrics": { "backend": "java", "latencyMs": 12, "retrievedCount": 0 }
        });
        Mock::given(method("POST"))
            .and(path("/api/rag"))
            .and(body_partial_json(json!({ "backend": "java", "query": "what is rag?" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(answer.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let client = ProxyClient::new(&format!("{}/", server.uri()), 5).unwrap();
        match client.ask(&request()).await.unwrap() {
            AskOutcome::Answer { response, raw } => {
                assert_eq!(response.answer, "retrieval augmented generation");
                assert_eq!(raw, answer);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_envelope_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/rag"))
            .respond_with(ResponseTemplate::new(502).set_body_json(json!({
                "error": { "code": "UPSTREAM_ERROR", "message": "Unable to reach the backend service." }
            })))
            .mount(&server)
            .await;

        let client = ProxyClient::new(&server.uri(), 5).unwrap();
        match client.ask(&request()).await.unwrap() {
            AskOutcome::Failed { status, envelope } => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert_eq!(envelope.unwrap().error.code, "UPSTREAM_ERROR");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn recent_runs_sends_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/runs"))
            .and(query_param("limit", "7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "runs": [],
                "failedBackends": [{ "backend": "python", "reason": "HTTP 500" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ProxyClient::new(&server.uri(), 5).unwrap();
        let runs = client.recent_runs(7).await.unwrap();
        assert!(runs.is_unavailable());
    }
}
