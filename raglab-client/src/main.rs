mod proxy_client;
mod render;
mod session;

use anyhow::{Context, Result};
use backend_service::{BackendKey, models::rag_query::DEFAULT_TOP_K};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::{
    proxy_client::{DEFAULT_PROXY_URL, ProxyClient},
    session::{AskInput, Session},
};

#[derive(Parser)]
#[command(name = "raglab-client")]
#[command(about = "Ask the RagLab backends through the proxy and inspect recent runs", long_about = None)]
struct Cli {
    /// Base URL of the RagLab proxy.
    #[arg(long, env = "RAGLAB_PROXY_URL", default_value = DEFAULT_PROXY_URL, global = true)]
    proxy_url: String,

    /// Request timeout in seconds.
    #[arg(long, default_value_t = 60, global = true)]
    timeout: u64,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Ask a question and show the answer, metrics and citations.
    Ask {
        /// Backend that answers: python or java.
        #[arg(long, short, default_value = "python", value_parser = parse_backend)]
        backend: BackendKey,
        /// Number of chunks to retrieve (clamped to 1..=50).
        #[arg(long, default_value_t = DEFAULT_TOP_K as i64, allow_negative_numbers = true)]
        top_k: i64,
        /// Restrict retrieval to documents with this tag. Repeatable.
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Leave citations out of the request and the output.
        #[arg(long)]
        no_citations: bool,
        /// Ask the backend for debug output.
        #[arg(long)]
        debug: bool,
        /// Also print the response JSON exactly as received.
        #[arg(long)]
        raw: bool,
        /// The question.
        #[arg(num_args = 0.., trailing_var_arg = true)]
        query: Vec<String>,
    },
    /// Show the merged recent runs of both backends.
    Runs {
        #[arg(long, allow_negative_numbers = true)]
        limit: Option<i64>,
    },
}

fn parse_backend(s: &str) -> Result<BackendKey, String> {
    s.parse::<BackendKey>()
        .map_err(|_| format!("unknown backend '{s}', expected python or java"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = ProxyClient::new(&cli.proxy_url, cli.timeout)
        .with_context(|| format!("invalid proxy URL {}", cli.proxy_url))?;

    match cli.cmd {
        Cmd::Ask {
            backend,
            top_k,
            tags,
            no_citations,
            debug,
            raw,
            query,
        } => {
            let mut session = Session::new(client, backend);
            let input = AskInput {
                query: query.join(" "),
                top_k,
                tags,
                citations: !no_citations,
                debug,
            };

            println!("Backend: {}", session.backend.label());
            if !session.ask(&input).await? {
                let message = session.last_error.take().unwrap_or_default();
                eprintln!("{message}");
                std::process::exit(1);
            }

            if let Some(response) = &session.last_response {
                println!("{}", render::render_answer(response, !no_citations));
            }
            if raw {
                if let Some(body) = &session.last_raw {
                    println!("{}", serde_json::to_string_pretty(body)?);
                }
            }

            session.refresh_runs(None).await;
            print!("\n{}", render::render_runs(&session.runs));
            print!("{}", render::render_run_summary(&session.runs));
        }
        Cmd::Runs { limit } => {
            let mut session = Session::new(client, BackendKey::Python);
            session.refresh_runs(limit).await;
            print!("{}", render::render_runs(&session.runs));
            print!("{}", render::render_run_summary(&session.runs));
        }
    }

    Ok(())
}
