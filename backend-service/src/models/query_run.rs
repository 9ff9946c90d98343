use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::backend_key::BackendKey;

/// Timestamp layouts accepted when `createdAt` carries no offset (read as UTC).
const NAIVE_LAYOUTS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// One past query as recorded by a backend.
///
/// Owned by the backend and read leniently: only `id` is required, values
/// are kept as sent, and fields this crate does not model are kept in
/// `extra` so re-serialization stays lossless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRun {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub backend: String,
    #[serde(default)]
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieved_count: Option<u64>,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outcome of a run as far as this crate can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Ok,
    Error,
    Unknown,
}

impl QueryRun {
    /// `createdAt` as UTC. Offset-less timestamps are read as UTC;
    /// anything unparseable is `None`.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.created_at.as_deref()?.trim();
        if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
            return Some(at.with_timezone(&Utc));
        }
        NAIVE_LAYOUTS
            .iter()
            .find_map(|layout| NaiveDateTime::parse_from_str(raw, layout).ok())
            .map(|naive| naive.and_utc())
    }

    pub fn outcome(&self) -> RunStatus {
        match self.status.to_ascii_lowercase().as_str() {
            "ok" | "success" => RunStatus::Ok,
            "error" | "failed" => RunStatus::Error,
            _ => RunStatus::Unknown,
        }
    }
}

/// Runs read from one backend answer, plus the records that were skipped.
#[derive(Debug, Default)]
pub struct DecodedRuns {
    pub runs: Vec<QueryRun>,
    /// `(index, reason)` of every element that could not be read.
    pub skipped: Vec<(usize, String)>,
}

/// Decodes a run-history body element by element.
///
/// # Errors
/// Returns a reason when the body is not a JSON array at all.
pub fn decode_runs(body: Value) -> Result<DecodedRuns, String> {
    let items = match body {
        Value::Array(items) => items,
        Value::Null => return Err("expected a JSON array of runs, got an empty body".into()),
        other => return Err(format!("expected a JSON array of runs, got {}", json_kind(&other))),
    };

    let mut decoded = DecodedRuns::default();
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<QueryRun>(item) {
            Ok(run) => decoded.runs.push(run),
            Err(e) => decoded.skipped.push((index, e.to_string())),
        }
    }
    Ok(decoded)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Merged run history across backends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentRuns {
    /// Successful runs from every reachable backend, newest first.
    pub runs: Vec<QueryRun>,
    /// Backends whose history could not be read.
    #[serde(default)]
    pub failed_backends: Vec<SourceFailure>,
}

/// A run-history source that failed, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub backend: BackendKey,
    pub reason: String,
}

impl RecentRuns {
    /// Nothing to show and at least one source failed.
    pub fn is_unavailable(&self) -> bool {
        self.runs.is_empty() && !self.failed_backends.is_empty()
    }
}
