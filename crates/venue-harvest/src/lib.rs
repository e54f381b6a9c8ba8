//! Venue Harvest
//!
//! Collects papers published at given venues from the Semantic Scholar Graph
//! API, resolves each one to a canonical landing page and a PDF link, downloads
//! the PDFs and records everything in a tab-separated ledger.
//!
//! # Pipeline
//!
//! - **Search**: bulk search per query term, following continuation tokens
//! - **Dedup**: one record per DOI / ArXiv id / CorpusId across the whole run
//! - **Resolve**: DOI handle lookup or ArXiv abstract page, falling back to the API URL
//! - **Derive**: host-specific rules turn a landing page into a PDF link
//! - **Download**: streamed to a temp file, renamed into place on success
//! - **Ledger**: one TSV row per record, including failures
//!
//! # Example
//!
//! ```no_run
//! use venue_harvest::{
//!     config::{Config, UrlPriority},
//!     harvest::{HarvestOptions, Harvester},
//!     ledger::Ledger,
//!     search::{RunContext, SearchFilters},
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let harvester = Harvester::from_config(&config, UrlPriority::DoiFirst, None)?;
//!
//!     let filters = SearchFilters::new(vec!["Interspeech".into()], Some(2020), Some(2024));
//!     let options = HarvestOptions::new(vec!["speech recognition".into()], filters);
//!
//!     let mut ledger = Ledger::open("results.tsv")?;
//!     let mut ctx = RunContext::new();
//!     let summary = harvester.run(&options, &mut ctx, &mut ledger).await?;
//!     println!("{summary}");
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod download;
pub mod error;
pub mod harvest;
pub mod ledger;
pub mod models;
pub mod pdf;
pub mod resolve;
pub mod search;

pub use client::SemanticScholarClient;
pub use config::Config;
pub use error::{ClientError, RecordError, WriteError};
pub use harvest::{HarvestOptions, HarvestSummary, Harvester};
