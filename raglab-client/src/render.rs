//! Plain-text rendering of answers, metrics, errors and run history.
//!
//! Every function returns a `String`; printing is left to the caller.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use backend_service::models::{
    Citation, ErrorEnvelope, Metrics, QueryRun, RagResponse, RecentRuns, RunStatus,
};
use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use reqwest::StatusCode;

pub const EMPTY_QUERY_MESSAGE: &str = "Please enter a question before asking.";
pub const RUNS_UNAVAILABLE_MESSAGE: &str = "Unable to load recent runs right now.";
const NO_RUNS_MESSAGE: &str = "No recent runs yet.";
const NO_RUN_DATA_MESSAGE: &str = "No run data yet.";

/// Sparkline glyphs, lowest to highest.
const SPARKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Longest citation excerpt printed before eliding.
const EXCERPT_CHARS: usize = 160;

/// `1234567` -> `1,234,567`; missing values render as `n/a`.
pub fn format_number(value: Option<u64>) -> String {
    let Some(value) = value else {
        return "n/a".into();
    };
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Local `HH:MM` of a run timestamp.
pub fn format_short_time(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M").to_string()
}

fn excerpt(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= EXCERPT_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(EXCERPT_CHARS).collect();
    format!("{cut}…")
}

pub fn render_metrics(metrics: &Metrics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "Metrics".bold());
    let _ = writeln!(out, "  Backend    {}", metrics.backend);
    let _ = writeln!(out, "  Latency    {} ms", format_number(Some(metrics.latency_ms)));
    let _ = writeln!(out, "  Retrieved  {}", format_number(Some(metrics.retrieved_count)));
    let _ = writeln!(out, "  Model      {}", metrics.model.as_deref().unwrap_or("n/a"));
    let _ = writeln!(
        out,
        "  Tokens     {} / {} / {}",
        format_number(metrics.prompt_tokens),
        format_number(metrics.completion_tokens),
        format_number(metrics.total_tokens),
    );
    if metrics.retrieved_count == 0 {
        let _ = writeln!(out, "  {}", "No chunks were retrieved for this query.".dimmed());
    }
    out
}

fn render_citation(index: usize, citation: &Citation) -> String {
    format!(
        "  [{}] {} {} (score {:.3})\n      {}\n",
        index + 1,
        citation.doc_id.cyan(),
        citation.chunk_id.dimmed(),
        citation.score,
        excerpt(&citation.text),
    )
}

/// Answer text, metrics and, when requested, citations.
pub fn render_answer(response: &RagResponse, show_citations: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "Answer".bold());
    let _ = writeln!(out, "{}\n", response.answer);
    out.push_str(&render_metrics(&response.metrics));

    if show_citations {
        let _ = writeln!(out, "\n{}", "Citations".bold());
        if response.citations.is_empty() {
            let _ = writeln!(out, "  {}", "none".dimmed());
        }
        for (i, citation) in response.citations.iter().enumerate() {
            out.push_str(&render_citation(i, citation));
        }
    }

    if let Some(debug) = &response.debug {
        let _ = writeln!(out, "\n{}", "Debug".bold());
        let pretty = serde_json::to_string_pretty(debug).unwrap_or_else(|_| debug.to_string());
        let _ = writeln!(out, "{pretty}");
    }
    out
}

/// One-line failure for a non-2xx proxy answer.
pub fn render_failure(status: StatusCode, envelope: Option<&ErrorEnvelope>) -> String {
    let head = format!("Request failed: {}", status.as_u16());
    match envelope {
        Some(env) => format!("{head} ({}) {}", env.error.code, env.error.message)
            .red()
            .to_string(),
        None => head.red().to_string(),
    }
}

fn render_run(run: &QueryRun) -> String {
    let status = match run.outcome() {
        RunStatus::Ok => "ok".green(),
        RunStatus::Error => "error".red(),
        RunStatus::Unknown if run.status.is_empty() => "?".yellow(),
        RunStatus::Unknown => run.status.as_str().yellow(),
    };
    let when = match run.timestamp() {
        Some(at) => format_short_time(&at),
        None => run.created_at.clone().unwrap_or_else(|| "--:--".into()),
    };
    let mut line = format!(
        "  {}  {:<6} {:<5}  {:>6} ms  {:>3} retrieved  {}",
        when,
        run.backend,
        status,
        format_number(run.latency_ms),
        format_number(run.retrieved_count),
        run.query,
    );
    if let Some(code) = &run.error_code {
        let _ = write!(line, "  [{code}]");
    }
    line.push('\n');
    line
}

/// Recent-runs section: the list, or the empty/unavailable notice.
pub fn render_runs(recent: &RecentRuns) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({} runs)", "Recent runs".bold(), recent.runs.len());

    if recent.is_unavailable() {
        let _ = writeln!(out, "  {}", RUNS_UNAVAILABLE_MESSAGE.red());
        return out;
    }
    if recent.runs.is_empty() {
        let _ = writeln!(out, "  {}", NO_RUNS_MESSAGE.dimmed());
        return out;
    }

    for run in &recent.runs {
        out.push_str(&render_run(run));
    }
    for failed in &recent.failed_backends {
        let _ = writeln!(
            out,
            "  {}",
            format!("{} history unavailable: {}", failed.backend.label(), failed.reason).yellow()
        );
    }
    out
}

/// One glyph per value, scaled between the smallest and largest value.
fn sparkline(values: &[u64]) -> String {
    let (Some(&lo), Some(&hi)) = (values.iter().min(), values.iter().max()) else {
        return String::new();
    };
    let top = SPARKS.len() - 1;
    values
        .iter()
        .map(|&v| {
            let idx = if hi == lo {
                top / 2
            } else {
                ((v - lo) * top as u64 / (hi - lo)) as usize
            };
            SPARKS[idx]
        })
        .collect()
}

#[derive(Default)]
struct BackendStats {
    runs: usize,
    /// Oldest first.
    latencies: Vec<u64>,
    retrieved: u64,
}

/// Latency, retrieval and status summary over the runs in `recent`.
///
/// Runs arrive newest first; trends are drawn oldest to newest.
pub fn render_run_summary(recent: &RecentRuns) -> String {
    let mut out = String::new();
    if recent.is_unavailable() {
        return out;
    }
    let _ = writeln!(out, "{}", "Run summary".bold());
    if recent.runs.is_empty() {
        let _ = writeln!(out, "  {}", NO_RUN_DATA_MESSAGE.dimmed());
        return out;
    }

    let mut per_backend: BTreeMap<&str, BackendStats> = BTreeMap::new();
    let (mut ok, mut failed, mut other) = (0usize, 0usize, 0usize);
    for run in recent.runs.iter().rev() {
        let label = if run.backend.is_empty() {
            "unknown"
        } else {
            run.backend.as_str()
        };
        let stats = per_backend.entry(label).or_default();
        stats.runs += 1;
        stats.latencies.extend(run.latency_ms);
        stats.retrieved += run.retrieved_count.unwrap_or(0);
        match run.outcome() {
            RunStatus::Ok => ok += 1,
            RunStatus::Error => failed += 1,
            RunStatus::Unknown => other += 1,
        }
    }

    for (backend, stats) in &per_backend {
        let latency = match (stats.latencies.iter().min(), stats.latencies.iter().max()) {
            (Some(&min), Some(&max)) => {
                let avg = stats.latencies.iter().sum::<u64>() / stats.latencies.len() as u64;
                format!(
                    "latency min {} / avg {} / max {} ms  {}",
                    format_number(Some(min)),
                    format_number(Some(avg)),
                    format_number(Some(max)),
                    sparkline(&stats.latencies).cyan(),
                )
            }
            _ => "latency n/a".to_string(),
        };
        let _ = writeln!(
            out,
            "  {:<6} {:>3} runs  {}  retrieved {}",
            backend,
            stats.runs,
            latency,
            format_number(Some(stats.retrieved)),
        );
    }

    let mut split = format!(
        "  status  {} ok  {} error",
        ok.to_string().green(),
        failed.to_string().red()
    );
    if other > 0 {
        let _ = write!(split, "  {} other", other.to_string().yellow());
    }
    let _ = writeln!(out, "{split}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend_service::BackendKey;
    use backend_service::models::SourceFailure;
    use serde_json::json;

    fn plain() {
        colored::control::set_override(false);
    }

    fn metrics(retrieved: u64) -> Metrics {
        Metrics {
            backend: "python".into(),
            latency_ms: 1534,
            retrieved_count: retrieved,
            model: None,
            prompt_tokens: Some(12),
            completion_tokens: None,
            total_tokens: None,
        }
    }

    fn run(id: &str) -> QueryRun {
        serde_json::from_value(json!({
            "id": id,
            "createdAt": "2025-01-01T10:00:00Z",
            "backend": "java",
            "query": "what is rag?",
            "topK": 5,
            "latencyMs": 42,
            "retrievedCount": 3,
            "status": "ok"
        }))
        .unwrap()
    }

    fn timed_run(
        id: &str,
        backend: &str,
        minute: u32,
        latency: Option<u64>,
        status: &str,
    ) -> QueryRun {
        serde_json::from_value(json!({
            "id": id,
            "createdAt": format!("2025-01-01T10:{minute:02}:00Z"),
            "backend": backend,
            "query": "q",
            "latencyMs": latency,
            "retrievedCount": 2,
            "status": status
        }))
        .unwrap()
    }

    #[test]
    fn numbers_get_separators_and_missing_is_na() {
        assert_eq!(format_number(None), "n/a");
        assert_eq!(format_number(Some(0)), "0");
        assert_eq!(format_number(Some(999)), "999");
        assert_eq!(format_number(Some(1000)), "1,000");
        assert_eq!(format_number(Some(1234567)), "1,234,567");
    }

    #[test]
    fn short_time_is_hours_and_minutes() {
        let at: DateTime<Utc> = "2025-01-01T10:07:00Z".parse().unwrap();
        let s = format_short_time(&at);
        assert_eq!(s.len(), 5);
        assert_eq!(&s[2..3], ":");
    }

    #[test]
    fn metrics_show_na_for_missing_values() {
        plain();
        let out = render_metrics(&metrics(4));
        assert!(out.contains("1,534 ms"));
        assert!(out.contains("Model      n/a"));
        assert!(out.contains("12 / n/a / n/a"));
        assert!(!out.contains("No chunks"));

        assert!(render_metrics(&metrics(0)).contains("No chunks were retrieved"));
    }

    #[test]
    fn citations_can_be_hidden() {
        plain();
        let response = RagResponse {
            answer: "Paris".into(),
            citations: vec![Citation {
                doc_id: "geo".into(),
                chunk_id: "geo#1".into(),
                text: "Paris is\nthe capital.".into(),
                score: 0.8,
                meta: None,
            }],
            metrics: metrics(1),
            debug: None,
        };

        let shown = render_answer(&response, true);
        assert!(shown.contains("[1] geo geo#1 (score 0.800)"));
        assert!(shown.contains("Paris is the capital."));

        let hidden = render_answer(&response, false);
        assert!(!hidden.contains("Citations"));
        assert!(hidden.starts_with("Answer\nParis"));
    }

    #[test]
    fn long_citation_text_is_elided() {
        let long = "x".repeat(EXCERPT_CHARS + 10);
        let e = excerpt(&long);
        assert_eq!(e.chars().count(), EXCERPT_CHARS + 1);
        assert!(e.ends_with('…'));
    }

    #[test]
    fn failure_includes_envelope_code_and_message() {
        plain();
        let env = ErrorEnvelope::new("BAD_REQUEST", "backend is required.", None);
        assert_eq!(
            render_failure(StatusCode::BAD_REQUEST, Some(&env)),
            "Request failed: 400 (BAD_REQUEST) backend is required."
        );
        assert_eq!(render_failure(StatusCode::BAD_GATEWAY, None), "Request failed: 502");
    }

    #[test]
    fn runs_unavailable_only_when_nothing_loaded() {
        plain();
        let failure = SourceFailure {
            backend: BackendKey::Python,
            reason: "HTTP 500".into(),
        };

        let none = RecentRuns {
            runs: vec![],
            failed_backends: vec![failure.clone()],
        };
        assert!(render_runs(&none).contains(RUNS_UNAVAILABLE_MESSAGE));

        let partial = RecentRuns {
            runs: vec![run("j1")],
            failed_backends: vec![failure],
        };
        let out = render_runs(&partial);
        assert!(!out.contains(RUNS_UNAVAILABLE_MESSAGE));
        assert!(out.contains("what is rag?"));
        assert!(out.contains("Python history unavailable: HTTP 500"));

        let empty = RecentRuns::default();
        assert!(render_runs(&empty).contains(NO_RUNS_MESSAGE));
    }

    #[test]
    fn run_line_tolerates_odd_records() {
        plain();
        let odd: QueryRun = serde_json::from_value(json!({
            "id": "x",
            "createdAt": "yesterday",
            "backend": "java",
            "query": "half a record",
            "status": "pending"
        }))
        .unwrap();

        let line = render_run(&odd);
        assert!(line.contains("yesterday"));
        assert!(line.contains("pending"));
        assert!(line.contains("n/a ms"));
        assert!(line.contains("n/a retrieved"));
    }

    #[test]
    fn summary_with_no_runs_says_so() {
        plain();
        let out = render_run_summary(&RecentRuns::default());
        assert!(out.contains(NO_RUN_DATA_MESSAGE));
        assert!(!out.contains("status"));
    }

    #[test]
    fn summary_is_skipped_when_every_source_failed() {
        let none = RecentRuns {
            runs: vec![],
            failed_backends: vec![SourceFailure {
                backend: BackendKey::Java,
                reason: "HTTP 503".into(),
            }],
        };
        assert_eq!(render_run_summary(&none), "");
    }

    #[test]
    fn summary_has_per_backend_latency_and_status_split() {
        plain();
        // Newest first, the way the proxy returns them.
        let recent = RecentRuns {
            runs: vec![
                timed_run("p3", "python", 4, Some(300), "ok"),
                timed_run("j1", "java", 3, Some(50), "error"),
                timed_run("p2", "python", 2, None, "ok"),
                timed_run("p1", "python", 1, Some(100), "ok"),
                timed_run("p0", "python", 0, Some(200), "queued"),
            ],
            failed_backends: vec![],
        };

        let out = render_run_summary(&recent);
        let python = out.lines().find(|l| l.contains("python")).unwrap();
        assert!(python.contains("4 runs"));
        assert!(python.contains("min 100 / avg 200 / max 300 ms"));
        // 200, 100, 300 oldest to newest.
        assert!(python.contains("▄▁█"));
        assert!(python.contains("retrieved 8"));

        let java = out.lines().find(|l| l.contains("java")).unwrap();
        assert!(java.contains("1 runs"));
        assert!(java.contains("min 50 / avg 50 / max 50 ms"));

        assert!(out.contains("status  3 ok  1 error  1 other"));
    }

    #[test]
    fn summary_without_latency_shows_na() {
        plain();
        let recent = RecentRuns {
            runs: vec![timed_run("j1", "java", 0, None, "ok")],
            failed_backends: vec![],
        };
        let out = render_run_summary(&recent);
        assert!(out.contains("latency n/a"));
        assert!(out.contains("status  1 ok  0 error"));
        assert!(!out.contains("other"));
    }

    #[test]
    fn flat_latency_draws_a_level_line() {
        assert_eq!(sparkline(&[7, 7, 7]), "▄▄▄");
        assert_eq!(sparkline(&[0, 7]), "▁█");
        assert_eq!(sparkline(&[]), "");
    }
}
