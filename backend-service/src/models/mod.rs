//! Wire contract shared by both backends, the proxy and the terminal client.
//!
//! Field names follow the backends' JSON (camelCase).

pub mod error_envelope;
pub mod query_run;
pub mod rag_query;
pub mod rag_response;

pub use error_envelope::{ErrorBody, ErrorEnvelope};
pub use query_run::{DecodedRuns, QueryRun, RecentRuns, RunStatus, SourceFailure, decode_runs};
pub use rag_query::{RagProxyRequest, RagQueryFilters, RagQueryOptions, RagQueryRequest};
pub use rag_response::{Citation, Metrics, RagResponse};
