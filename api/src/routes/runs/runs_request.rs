use serde::Deserialize;

/// Query string of the run-history routes: `?limit=N&backend=k`.
#[derive(Debug, Default, Deserialize)]
pub struct RunsParams {
    /// Maximum number of runs; defaults to 24, clamped to 1..=100.
    #[serde(default)]
    pub limit: Option<i64>,
    /// Optional backend filter, passed through to the backend as-is.
    #[serde(default)]
    pub backend: Option<String>,
}
