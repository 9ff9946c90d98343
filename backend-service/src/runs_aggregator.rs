//! Result-per-source fan-out for run-history reads.
//!
//! Every source is fetched independently and concurrently. A failed source is
//! recorded next to the successes; it never cancels or hides the others.

use std::future::Future;

use futures::future::join_all;

use crate::{
    config::backend_key::BackendKey,
    error_handler::UpstreamError,
    models::query_run::{QueryRun, RecentRuns, SourceFailure},
};

/// Run-history limit used when the caller does not pass one.
pub const DEFAULT_RUNS_LIMIT: usize = 24;
/// Upper bound the backends enforce on `limit`.
pub const MAX_RUNS_LIMIT: usize = 100;

/// Outcome of a fan-out: successes and failures, each tagged with its source.
#[derive(Debug)]
pub struct Settled<S, T, E> {
    pub fulfilled: Vec<(S, T)>,
    pub rejected: Vec<(S, E)>,
}

/// Runs `fetch` for every source concurrently and waits for all of them.
///
/// Source order is preserved inside both `fulfilled` and `rejected`.
pub async fn settle_all<S, T, E, F, Fut>(
    sources: impl IntoIterator<Item = S>,
    fetch: F,
) -> Settled<S, T, E>
where
    S: Copy,
    F: Fn(S) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let pending = sources.into_iter().map(|source| {
        let fut = fetch(source);
        async move { (source, fut.await) }
    });

    let mut settled = Settled {
        fulfilled: Vec::new(),
        rejected: Vec::new(),
    };
    for (source, outcome) in join_all(pending).await {
        match outcome {
            Ok(value) => settled.fulfilled.push((source, value)),
            Err(err) => settled.rejected.push((source, err)),
        }
    }
    settled
}

/// Merges per-backend run lists: newest first, capped at `limit`.
///
/// Runs without a readable `createdAt` sort after every dated run.
pub fn merge_recent_runs(
    settled: Settled<BackendKey, Vec<QueryRun>, UpstreamError>,
    limit: usize,
) -> RecentRuns {
    let mut runs: Vec<QueryRun> = settled
        .fulfilled
        .into_iter()
        .flat_map(|(_, runs)| runs)
        .collect();
    runs.sort_by_cached_key(|run| std::cmp::Reverse(run.timestamp()));
    runs.truncate(limit);

    let failed_backends = settled
        .rejected
        .into_iter()
        .map(|(backend, err)| SourceFailure {
            backend,
            reason: err.reason(),
        })
        .collect();

    RecentRuns {
        runs,
        failed_backends,
    }
}

/// Normalizes a requested limit into `1..=MAX_RUNS_LIMIT`.
pub fn clamp_runs_limit(requested: Option<i64>) -> usize {
    match requested {
        Some(n) => n.clamp(1, MAX_RUNS_LIMIT as i64) as usize,
        None => DEFAULT_RUNS_LIMIT,
    }
}
