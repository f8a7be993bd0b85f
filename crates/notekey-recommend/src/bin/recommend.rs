//! notekey-recommend: Command-line front end for keyword recommendation.
//!
//! Prints the recommendation as JSON on stdout. On failure prints the
//! `{"state": "fail", ...}` error body and exits non-zero. Logs go to
//! stderr (or `LOG_FILE`).

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notekey_db::{create_pool_with_config, log_pool_metrics, PgPageStore, PgPool, PoolConfig};
use notekey_recommend::{defaults, CandidateSource, RecommendConfig, RecommendationEngine};
use notekey_sources::{EmbeddingModelConfig, EmbeddingModelStore, TrendsClient, Word2VecSource};

#[derive(Parser)]
#[command(name = "notekey-recommend")]
#[command(author, version, about = "Keyword recommendation for note pages")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend keywords from the trend service's related topics
    Trend {
        /// Keyword to find related keywords for
        #[arg(short, long)]
        keyword: String,

        /// Page the keyword belongs to
        #[arg(short, long)]
        page_id: i64,
    },

    /// Recommend keywords from the word-embedding model
    Embedding {
        /// Keyword to find related keywords for
        #[arg(short, long)]
        keyword: String,

        /// Page the keyword belongs to
        #[arg(short, long)]
        page_id: i64,
    },

    /// Show raw nearest neighbors from the embedding model
    Similar {
        /// Keyword to look up
        #[arg(short, long)]
        keyword: String,

        /// Number of neighbors to show
        #[arg(short = 'n', long, default_value_t = defaults::EMBEDDING_TOP_N)]
        top_n: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let _file_guard = init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Trend { keyword, page_id } => {
            recommend(&keyword, page_id, CandidateSource::Trend).await
        }
        Commands::Embedding { keyword, page_id } => {
            recommend(&keyword, page_id, CandidateSource::Embedding).await
        }
        Commands::Similar { keyword, top_n } => similar(&keyword, top_n).await,
    }
}

async fn recommend(keyword: &str, page_id: i64, source: CandidateSource) -> anyhow::Result<ExitCode> {
    let (engine, pool) = build_engine().await?;

    let outcome = engine.recommend(keyword, page_id, source).await;
    log_pool_metrics(&pool);

    match outcome {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            println!("{}", serde_json::to_string_pretty(&err.to_response())?);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn similar(keyword: &str, top_n: usize) -> anyhow::Result<ExitCode> {
    let store = EmbeddingModelStore::new(EmbeddingModelConfig::from_env()?);
    let model = store.get().await?;

    let neighbors: Vec<serde_json::Value> = model
        .most_similar(keyword, top_n)?
        .into_iter()
        .map(|(word, similarity)| serde_json::json!({"keyword": word, "similarity": similarity}))
        .collect();

    println!("{}", serde_json::to_string_pretty(&neighbors)?);
    Ok(ExitCode::SUCCESS)
}

async fn build_engine() -> anyhow::Result<(RecommendationEngine, PgPool)> {
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| defaults::DATABASE_URL.to_string());
    let pool = create_pool_with_config(&database_url, PoolConfig::from_env()?).await?;

    let pages = Arc::new(PgPageStore::new(pool.clone()));
    let trends = Arc::new(TrendsClient::from_env()?);
    let store = Arc::new(EmbeddingModelStore::new(EmbeddingModelConfig::from_env()?));
    let embeddings = Arc::new(Word2VecSource::new(store));

    let config = RecommendConfig::from_env()?;
    info!(
        output_size = config.output_size,
        embedding_top_n = config.embedding_top_n,
        empty_as_error = config.empty_as_error,
        "Recommendation engine ready"
    );

    let engine = RecommendationEngine::new(pages, trends, embeddings).with_config(config);
    Ok((engine, pool))
}

/// Initialize tracing.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, enables file logging)
///   LOG_ANSI    - "true"/"false" override ANSI colors
///   RUST_LOG    - standard env filter (default: info for the notekey crates)
fn init_tracing() -> Option<WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "notekey_recommend=info,notekey_sources=info,notekey_db=info".into()
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    // stdout carries the JSON result, so console logs go to stderr
    let guard = if let Some(ref path) = log_file {
        let file_dir = Path::new(path).parent().unwrap_or(Path::new("."));
        let file_name = Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("notekey-recommend.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stderr)"),
        "Logging initialized"
    );
    guard
}
