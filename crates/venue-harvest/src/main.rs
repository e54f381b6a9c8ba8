//! Venue Harvest - Entry Point
//!
//! Searches Semantic Scholar for papers from the given venues, resolves and
//! downloads their PDFs, and appends the results to a TSV ledger.

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Parser};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use venue_harvest::{
    config::{Config, UrlPriority, fields},
    harvest::{DEFAULT_CONCURRENCY, DEFAULT_FLUSH_EVERY, HarvestOptions, Harvester},
    ledger::{self, Ledger},
    search::{RunContext, SearchFilters},
};

#[derive(Parser, Debug)]
#[command(name = "venue-harvest")]
#[command(about = "Search for and download papers from a venue via Semantic Scholar")]
#[command(version)]
struct Cli {
    /// First year included in the search
    #[arg(long = "start_year", alias = "start-year", default_value_t = 1970)]
    start_year: i32,

    /// Last year included in the search
    #[arg(long = "end_year", alias = "end-year", default_value_t = 2024)]
    end_year: i32,

    /// Comma-separated venues to search (e.g. `Interspeech,IberSPEECH`)
    #[arg(long, default_value = "Interspeech")]
    venues: String,

    /// One or more queries in Semantic Scholar bulk search syntax
    /// (e.g. `-q "ASR + English" "TTS + English"`)
    #[arg(long, short = 'q', required = true, num_args = 1..)]
    queries: Vec<String>,

    /// Comma-separated fields to request; `externalIds`, `authors` and `year` are always added
    #[arg(long, default_value_t = fields::DEFAULT.join(","))]
    fields: String,

    /// Ledger file; appended to if it already exists
    #[arg(long, default_value = "results.tsv")]
    csv: PathBuf,

    /// Download PDFs as well as writing the ledger
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    download: bool,

    /// Directory PDFs are saved to
    #[arg(long = "download_dir", alias = "download-dir", default_value = "pdfs/")]
    download_dir: PathBuf,

    /// Stop after this many distinct papers
    #[arg(long = "max_results", alias = "max-results")]
    max_results: Option<usize>,

    /// Which identifier wins when a paper has both a DOI and an ArXiv id
    #[arg(long = "url_priority", alias = "url-priority", value_enum, default_value_t)]
    url_priority: UrlPriority,

    /// Papers resolved and downloaded at once
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Flush the ledger every N rows (0 = only at the end)
    #[arg(long = "flush_every", alias = "flush-every", default_value_t = DEFAULT_FLUSH_EVERY)]
    flush_every: usize,

    /// Semantic Scholar API key (optional, enables higher rate limits)
    #[arg(long, env = "SEMANTIC_SCHOLAR_API_KEY")]
    api_key: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer().compact()).init();
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        queries = cli.queries.len(),
        venues = %cli.venues,
        "Starting venue harvest"
    );

    let terms: Vec<String> =
        cli.queries.iter().map(|q| q.trim().to_string()).filter(|q| !q.is_empty()).collect();
    anyhow::ensure!(!terms.is_empty(), "at least one non-empty query is required");

    let filters = SearchFilters::new(split_list(&cli.venues), Some(cli.start_year), Some(cli.end_year))
        .with_fields(split_list(&cli.fields));

    let download_dir = if cli.download {
        std::fs::create_dir_all(&cli.download_dir).with_context(|| {
            format!("cannot create download directory {}", cli.download_dir.display())
        })?;
        Some(cli.download_dir.clone())
    } else {
        None
    };

    let mut options = HarvestOptions::new(terms, filters).with_download_dir(download_dir);
    options.concurrency = cli.concurrency;
    options.flush_every = cli.flush_every;

    let mut ctx = RunContext::new();
    let resumed = ctx.seed(ledger::existing_keys(&cli.csv)?);
    if resumed > 0 {
        tracing::info!(path = %cli.csv.display(), keys = resumed, "resuming from existing ledger");
    }
    let mut ledger = Ledger::open(&cli.csv)?;

    let config = Config::new(cli.api_key.filter(|k| !k.is_empty()));
    if !config.has_api_key() {
        tracing::info!("no API key set; pacing requests for the shared rate limit");
    }
    let harvester = Harvester::from_config(&config, cli.url_priority, cli.max_results)?;

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received; flushing ledger");
        } else {
            std::future::pending::<()>().await;
        }
    };
    let summary = harvester.run_until(&options, &mut ctx, &mut ledger, shutdown).await?;
    println!("{summary}");

    Ok(())
}
