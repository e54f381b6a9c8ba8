//! Pipeline driver: collect, resolve, derive, download, record.
//!
//! Per-record failures only ever land in the record's `errors` cell; the only
//! error that stops a run is a ledger write failure. A run can also be cut
//! short by a shutdown signal, after which every row already written is
//! flushed and records still in flight are dropped.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;

use crate::client::SemanticScholarClient;
use crate::config::{Config, UrlPriority};
use crate::download::PdfDownloader;
use crate::error::{RecordError, WriteError};
use crate::ledger::Ledger;
use crate::models::Record;
use crate::pdf;
use crate::resolve::{HandleApiResolver, IdentifierResolver};
use crate::search::{CollectStats, DedupCollector, PaginationWalker, RunContext, SearchFilters};

/// Default number of records resolved/downloaded concurrently.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Default ledger flush interval, in rows.
pub const DEFAULT_FLUSH_EVERY: usize = 50;

/// What one run should fetch and where the PDFs go.
#[derive(Debug, Clone)]
pub struct HarvestOptions {
    /// Query terms, processed in order.
    pub terms: Vec<String>,
    /// Venue/year/field filters shared by all terms.
    pub filters: SearchFilters,
    /// Directory for PDFs; `None` disables downloading.
    pub download_dir: Option<PathBuf>,
    /// Records in flight at once (resolution + download).
    pub concurrency: usize,
    /// Flush the ledger every this many rows; 0 flushes only at the end.
    pub flush_every: usize,
}

impl HarvestOptions {
    #[must_use]
    pub fn new(terms: Vec<String>, filters: SearchFilters) -> Self {
        Self {
            terms,
            filters,
            download_dir: None,
            concurrency: DEFAULT_CONCURRENCY,
            flush_every: DEFAULT_FLUSH_EVERY,
        }
    }

    #[must_use]
    pub fn with_download_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.download_dir = dir;
        self
    }
}

/// How the download step ended for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    /// Downloads disabled or no PDF link.
    NotAttempted,
    /// File fetched and saved.
    Saved,
    /// File was already on disk.
    AlreadyPresent,
    /// Fetch or write failed.
    Failed,
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestSummary {
    /// Rows written to the ledger.
    pub retrieved: usize,
    /// Rows without a canonical URL.
    pub unresolved_url: usize,
    /// Rows without a PDF link.
    pub unresolved_pdf: usize,
    /// PDFs fetched in this run.
    pub downloaded: usize,
    /// PDFs found on disk from an earlier run.
    pub already_present: usize,
    /// PDFs that failed to download.
    pub download_failed: usize,
    /// Search-side counters.
    pub search: CollectStats,
    /// The run stopped on a shutdown signal before the batch finished.
    pub interrupted: bool,
}

impl HarvestSummary {
    fn observe(&mut self, record: &Record, download: DownloadStatus) {
        self.retrieved += 1;
        if record.canonical_url.is_none() {
            self.unresolved_url += 1;
        }
        if record.pdf_url.is_none() {
            self.unresolved_pdf += 1;
        }
        match download {
            DownloadStatus::NotAttempted => {}
            DownloadStatus::Saved => self.downloaded += 1,
            DownloadStatus::AlreadyPresent => self.already_present += 1,
            DownloadStatus::Failed => self.download_failed += 1,
        }
    }
}

impl fmt::Display for HarvestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Retrieved {} papers ({} raw results, {} duplicates, {} without identifiers)",
            self.retrieved, self.search.raw, self.search.duplicates, self.search.missing_identifier
        )?;
        writeln!(f, "  unresolved URL:   {}", self.unresolved_url)?;
        writeln!(f, "  unresolved PDF:   {}", self.unresolved_pdf)?;
        writeln!(
            f,
            "  downloads:        {} saved, {} already present, {} failed",
            self.downloaded, self.already_present, self.download_failed
        )?;
        write!(f, "  failed queries:   {} of {} terms", self.search.query_errors, self.search.terms)?;
        if self.interrupted {
            write!(f, "\n  interrupted before the batch finished; rerun to resume")?;
        }
        Ok(())
    }
}

/// Wires the pipeline stages together.
#[derive(Debug, Clone)]
pub struct Harvester {
    collector: DedupCollector,
    resolver: IdentifierResolver,
    downloader: PdfDownloader,
}

impl Harvester {
    #[must_use]
    pub fn new(
        collector: DedupCollector,
        resolver: IdentifierResolver,
        downloader: PdfDownloader,
    ) -> Self {
        Self { collector, resolver, downloader }
    }

    /// Build every stage against the services named in `config`.
    pub fn from_config(
        config: &Config,
        priority: UrlPriority,
        max_results: Option<usize>,
    ) -> anyhow::Result<Self> {
        let client = SemanticScholarClient::new(config.clone())?;
        let walker = PaginationWalker::new(Arc::new(client));
        let collector = DedupCollector::new(walker).with_max_results(max_results);
        let resolver = IdentifierResolver::new(Arc::new(HandleApiResolver::new(config)?), priority);
        let downloader = PdfDownloader::new(config)?;
        Ok(Self::new(collector, resolver, downloader))
    }

    /// Resolve, derive and (optionally) download one record.
    ///
    /// Never fails: every problem is appended to the record's errors.
    pub async fn process(
        &self,
        mut record: Record,
        download_dir: Option<&Path>,
    ) -> (Record, DownloadStatus) {
        let ids = record.paper.ids();
        match self.resolver.resolve_url(&ids, record.paper.url.as_deref()).await {
            Some(resolved) => record.canonical_url = Some(resolved.url),
            None => record.note(RecordError::ResolutionFailure),
        }

        match record.canonical_url.as_deref().and_then(pdf::derive) {
            Some(pdf_url) => record.pdf_url = Some(pdf_url),
            None => record.note(RecordError::PdfLinkUnavailable),
        }

        let (Some(dir), Some(pdf_url)) = (download_dir, record.pdf_url.clone()) else {
            return (record, DownloadStatus::NotAttempted);
        };

        let status = match self.downloader.download(&pdf_url, dir).await {
            Ok(outcome) if outcome.skipped => DownloadStatus::AlreadyPresent,
            Ok(_) => DownloadStatus::Saved,
            Err(e) => {
                record.note(e);
                DownloadStatus::Failed
            }
        };
        (record, status)
    }

    /// Run the whole batch, appending one ledger row per distinct record.
    ///
    /// Rows keep collection order even though records are processed concurrently.
    pub async fn run(
        &self,
        options: &HarvestOptions,
        ctx: &mut RunContext,
        ledger: &mut Ledger,
    ) -> Result<HarvestSummary, WriteError> {
        self.run_until(options, ctx, ledger, std::future::pending()).await
    }

    /// Like [`run`](Self::run), but stop as soon as `shutdown` completes.
    ///
    /// Rows already appended are flushed before returning. Records still being
    /// resolved or downloaded are dropped, along with their partial downloads,
    /// and are picked up again by a resumed run.
    pub async fn run_until(
        &self,
        options: &HarvestOptions,
        ctx: &mut RunContext,
        ledger: &mut Ledger,
        shutdown: impl Future<Output = ()>,
    ) -> Result<HarvestSummary, WriteError> {
        let mut summary = HarvestSummary::default();
        let download_dir = options.download_dir.as_deref();
        futures::pin_mut!(shutdown);

        {
            let processed = self
                .collector
                .collect(&options.terms, &options.filters, ctx)
                .map(|record| self.process(record, download_dir))
                .buffered(options.concurrency.max(1));
            futures::pin_mut!(processed);

            loop {
                let next = tokio::select! {
                    biased;
                    () = &mut shutdown => {
                        tracing::warn!(rows = summary.retrieved, "shutdown requested; stopping harvest");
                        summary.interrupted = true;
                        break;
                    }
                    next = processed.next() => next,
                };
                let Some((record, download)) = next else { break };

                summary.observe(&record, download);
                ledger.append_record(&record)?;

                if options.flush_every > 0 && summary.retrieved % options.flush_every == 0 {
                    ledger.flush()?;
                    tracing::info!(rows = summary.retrieved, "ledger flushed");
                }
            }
        }

        ledger.flush()?;
        summary.search = ctx.stats().clone();
        tracing::info!(
            retrieved = summary.retrieved,
            unresolved_url = summary.unresolved_url,
            unresolved_pdf = summary.unresolved_pdf,
            download_failed = summary.download_failed,
            interrupted = summary.interrupted,
            "harvest complete"
        );
        Ok(summary)
    }
}
