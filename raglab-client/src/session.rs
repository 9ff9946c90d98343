use anyhow::Result;
use backend_service::{
    BackendKey,
    models::{
        RagProxyRequest, RagQueryFilters, RagQueryOptions, RagQueryRequest, RagResponse,
        RecentRuns, rag_query::clamp_top_k,
    },
    runs_aggregator::clamp_runs_limit,
};
use serde_json::Value;
use tracing::warn;

use crate::{
    proxy_client::{AskOutcome, ProxyClient},
    render::{self, EMPTY_QUERY_MESSAGE},
};

/// What the user asked for on the command line.
#[derive(Debug, Clone)]
pub struct AskInput {
    pub query: String,
    pub top_k: i64,
    pub tags: Vec<String>,
    pub citations: bool,
    pub debug: bool,
}

/// State of one terminal session. The backends own the run history; this is
/// only what the last interaction produced.
pub struct Session {
    client: ProxyClient,
    pub backend: BackendKey,
    pub last_response: Option<RagResponse>,
    pub last_raw: Option<Value>,
    pub last_error: Option<String>,
    pub runs: RecentRuns,
}

/// Builds the proxy body, rejecting blank questions before any network call.
pub fn build_request(backend: BackendKey, input: &AskInput) -> Result<RagProxyRequest, &'static str> {
    if input.query.trim().is_empty() {
        return Err(EMPTY_QUERY_MESSAGE);
    }

    let tags: Vec<String> = input
        .tags
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    Ok(RagProxyRequest {
        backend,
        request: RagQueryRequest {
            query: input.query.clone(),
            top_k: clamp_top_k(input.top_k),
            filters: (!tags.is_empty()).then(|| RagQueryFilters {
                doc_ids: None,
                tags: Some(tags),
            }),
            options: Some(RagQueryOptions {
                return_citations: input.citations,
                return_debug: input.debug,
            }),
        },
    })
}

impl Session {
    pub fn new(client: ProxyClient, backend: BackendKey) -> Self {
        Self {
            client,
            backend,
            last_response: None,
            last_raw: None,
            last_error: None,
            runs: RecentRuns::default(),
        }
    }

    /// Sends one question. Returns `true` when an answer came back.
    ///
    /// Failures land in `last_error`; the previous answer is cleared either way.
    pub async fn ask(&mut self, input: &AskInput) -> Result<bool> {
        self.last_error = None;
        self.last_response = None;
        self.last_raw = None;

        let request = match build_request(self.backend, input) {
            Ok(r) => r,
            Err(msg) => {
                self.last_error = Some(msg.to_string());
                return Ok(false);
            }
        };

        match self.client.ask(&request).await {
            Ok(AskOutcome::Answer { response, raw }) => {
                self.last_response = Some(response);
                self.last_raw = Some(raw);
                Ok(true)
            }
            Ok(AskOutcome::Failed { status, envelope }) => {
                self.last_error = Some(render::render_failure(status, envelope.as_ref()));
                Ok(false)
            }
            Err(e) => {
                self.last_error = Some(format!("{e:#}"));
                Ok(false)
            }
        }
    }

    /// Re-reads the merged run history. A failing fetch leaves an empty,
    /// unavailable history rather than an error.
    pub async fn refresh_runs(&mut self, limit: Option<i64>) {
        let limit = clamp_runs_limit(limit);
        self.runs = match self.client.recent_runs(limit).await {
            Ok(runs) => runs,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "could not load recent runs");
                RecentRuns {
                    runs: Vec::new(),
                    failed_backends: BackendKey::ALL
                        .into_iter()
                        .map(|backend| backend_service::models::SourceFailure {
                            backend,
                            reason: e.to_string(),
                        })
                        .collect(),
                }
            }
        };
    }
}
