use std::io::{self, IsTerminal};
use std::str::FromStr;

use reqwest::StatusCode;
use tracing::{Level, Span, field};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, filter, fmt};

use crate::config::backend_key::BackendKey;

/// Crate target prefix used to filter only library-originated logs.
pub const TARGET_PREFIX: &str = "backend_service";

/// RFC3339 UTC timer implemented via `chrono`.
/// Example output: `2026-10-16T10:20:30Z`
#[derive(Clone, Debug, Default)]
struct ChronoRfc3339Utc;

impl FormatTime for ChronoRfc3339Utc {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Utc::now();
        let s = now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        w.write_str(&s)
    }
}

/// Whether an event/span belongs to this crate.
pub fn is_own_target(target: &str) -> bool {
    target.starts_with(TARGET_PREFIX)
}

/// Build a **library-scoped** formatting layer that renders ONLY events emitted by this crate.
///
/// - RFC3339 UTC timestamps
/// - Compact single-line format with `file:line` and target
/// - Span close events (durations of instrumented backend calls)
/// - ANSI colors only when stdout is a terminal
///
/// Compose it in the binary together with a global layer that skips
/// [`TARGET_PREFIX`], otherwise events are printed twice.
pub fn layer<S>() -> impl Layer<S> + Send + Sync
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let use_ansi = io::stdout().is_terminal();

    let only_this_crate = filter::filter_fn(|meta| is_own_target(meta.target()));

    fmt::layer()
        .with_timer(ChronoRfc3339Utc)
        .with_level(true)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(use_ansi)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .event_format(fmt::format().compact().with_source_location(true))
        .with_filter(only_this_crate)
}

/// Span around one call to a backend.
///
/// `status` and `latency_ms` start empty and are filled by [`record_reply`]
/// once the backend answers; with span close events enabled they show up on
/// the close line of every call.
pub fn upstream_span(backend: BackendKey, endpoint: &'static str) -> Span {
    tracing::info_span!(
        "upstream",
        backend = %backend,
        endpoint,
        status = field::Empty,
        latency_ms = field::Empty,
    )
}

/// Records the backend answer on `span`.
///
/// Works on any span that declares `status` and `latency_ms`; other spans are left as they are.
pub fn record_reply(span: &Span, status: StatusCode, latency_ms: u128) {
    span.record("status", status.as_u16());
    span.record("latency_ms", u64::try_from(latency_ms).unwrap_or(u64::MAX));
}

/// Helper to build a level directive for **this** library only, e.g. `backend_service=debug`.
pub fn level_directive(level: Level) -> Directive {
    let s = format!("{TARGET_PREFIX}={}", level.as_str().to_lowercase());
    Directive::from_str(&s).unwrap_or_else(|_| filter::LevelFilter::INFO.into())
}

/// Creates an EnvFilter from `RUST_LOG` or the fallback `default`,
/// then applies a per-crate level directive for this library.
pub fn env_filter_with_level(default: &str, level: Level) -> EnvFilter {
    let base = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    base.add_directive(level_directive(level))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing::span::{Attributes, Id, Record};
    use tracing_subscriber::layer::{Context, SubscriberExt};

    type Seen = Arc<Mutex<Vec<(String, String)>>>;

    /// Collects every span field value as `(name, debug text)`.
    #[derive(Clone, Default)]
    struct SpanFields(Seen);

    struct Collect<'a>(&'a mut Vec<(String, String)>);

    impl Visit for Collect<'_> {
        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            self.0.push((field.name().to_string(), format!("{value:?}")));
        }
    }

    impl<S> Layer<S> for SpanFields
    where
        S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    {
        fn on_new_span(&self, attrs: &Attributes<'_>, _: &Id, _: Context<'_, S>) {
            attrs.record(&mut Collect(&mut self.0.lock().unwrap()));
        }

        fn on_record(&self, _: &Id, values: &Record<'_>, _: Context<'_, S>) {
            values.record(&mut Collect(&mut self.0.lock().unwrap()));
        }
    }

    fn value_of(seen: &Seen, name: &str) -> Option<String> {
        seen.lock()
            .unwrap()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    #[test]
    fn upstream_span_carries_backend_then_reply() {
        let fields = SpanFields::default();
        let seen = fields.0.clone();
        let subscriber = tracing_subscriber::registry().with(fields);

        tracing::subscriber::with_default(subscriber, || {
            let span = upstream_span(BackendKey::Java, "/api/v1/health");
            assert_eq!(value_of(&seen, "backend").as_deref(), Some("java"));
            assert_eq!(value_of(&seen, "status"), None);

            record_reply(&span, StatusCode::BAD_GATEWAY, 37);
        });

        assert_eq!(value_of(&seen, "endpoint").as_deref(), Some("\"/api/v1/health\""));
        assert_eq!(value_of(&seen, "status").as_deref(), Some("502"));
        assert_eq!(value_of(&seen, "latency_ms").as_deref(), Some("37"));
    }

    #[test]
    fn directive_targets_this_crate() {
        let d = level_directive(Level::DEBUG);
        let rendered = d.to_string();
        assert!(rendered.starts_with("backend_service"));
        assert!(rendered.ends_with("debug"));
    }

    #[test]
    fn own_targets_are_recognized() {
        assert!(is_own_target("backend_service::services::rag_backend_service"));
        assert!(!is_own_target("api::routes::rag_proxy"));
    }
}
