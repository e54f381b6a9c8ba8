//! Identifier resolution: dedup keys and canonical URLs.
//!
//! Both priority orders are declared as data so they can be inspected and
//! tested independently of the pipeline:
//!
//! - dedup key: DOI > ArXiv > CorpusId ([`KEY_PRIORITY`])
//! - canonical URL: resolved DOI / arXiv page (order per [`UrlPriority`]) > record `url`

pub mod doi;

use std::fmt;
use std::sync::Arc;

use crate::config::UrlPriority;
use crate::error::MissingIdentifier;
use crate::models::{ExternalIds, Paper};

pub use doi::{DoiResolver, HandleApiResolver};

/// Public arXiv abstract page prefix.
pub const ARXIV_ABS_BASE: &str = "https://arxiv.org/abs/";

/// External identifier schemes usable as a dedup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdScheme {
    /// Digital Object Identifier.
    Doi,
    /// ArXiv preprint id.
    Arxiv,
    /// Semantic Scholar corpus id.
    CorpusId,
}

impl IdScheme {
    /// Scheme name as used by the API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Doi => "DOI",
            Self::Arxiv => "ArXiv",
            Self::CorpusId => "CorpusId",
        }
    }
}

type Extractor = fn(&ExternalIds) -> Option<String>;

fn non_empty(value: Option<&String>) -> Option<String> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty()).map(str::to_string)
}

fn doi_value(ids: &ExternalIds) -> Option<String> {
    non_empty(ids.doi.as_ref())
}

fn arxiv_value(ids: &ExternalIds) -> Option<String> {
    non_empty(ids.arxiv.as_ref())
}

fn corpus_value(ids: &ExternalIds) -> Option<String> {
    ids.corpus_id.map(|id| id.to_string())
}

/// Dedup key priority, evaluated top to bottom; the first non-empty value wins.
pub const KEY_PRIORITY: [(IdScheme, Extractor); 3] = [
    (IdScheme::Doi, doi_value),
    (IdScheme::Arxiv, arxiv_value),
    (IdScheme::CorpusId, corpus_value),
];

/// Identifier used to suppress duplicate papers within a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    /// Scheme the value came from.
    pub scheme: IdScheme,
    /// Identifier value as returned by the API.
    pub value: String,
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Pick the dedup key for a raw record.
pub fn resolve_key(paper: &Paper) -> Result<DedupKey, MissingIdentifier> {
    let ids = paper.ids();
    KEY_PRIORITY
        .iter()
        .find_map(|(scheme, extract)| {
            extract(&ids).map(|value| DedupKey { scheme: *scheme, value })
        })
        .ok_or_else(|| MissingIdentifier { paper_id: paper.paper_id.clone() })
}

/// Where a canonical URL came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlSource {
    /// Landing page registered for the DOI.
    ResolvedDoi,
    /// arXiv abstract page built from the arXiv id.
    ArxivPage,
    /// The `url` field of the search record.
    RecordUrl,
}

impl UrlSource {
    /// Fallback chain for a priority policy.
    #[must_use]
    pub const fn chain(priority: UrlPriority) -> [Self; 3] {
        match priority {
            UrlPriority::DoiFirst => [Self::ResolvedDoi, Self::ArxivPage, Self::RecordUrl],
            UrlPriority::ArxivFirst => [Self::ArxivPage, Self::ResolvedDoi, Self::RecordUrl],
        }
    }
}

/// Canonical URL plus the step of the chain that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
    pub url: String,
    pub source: UrlSource,
}

/// Resolves records to canonical landing-page URLs.
#[derive(Clone)]
pub struct IdentifierResolver {
    doi: Arc<dyn DoiResolver>,
    priority: UrlPriority,
}

impl IdentifierResolver {
    #[must_use]
    pub fn new(doi: Arc<dyn DoiResolver>, priority: UrlPriority) -> Self {
        Self { doi, priority }
    }

    /// Walk the fallback chain; `None` when every step came up empty.
    ///
    /// DOI service failures are logged and treated as "no resolution".
    pub async fn resolve_url(
        &self,
        ids: &ExternalIds,
        fallback_url: Option<&str>,
    ) -> Option<ResolvedUrl> {
        for source in UrlSource::chain(self.priority) {
            let url = match source {
                UrlSource::ResolvedDoi => match doi_value(ids) {
                    Some(doi) => self.resolve_doi(&doi).await,
                    None => None,
                },
                UrlSource::ArxivPage => arxiv_value(ids).map(|id| format!("{ARXIV_ABS_BASE}{id}")),
                UrlSource::RecordUrl => {
                    fallback_url.map(str::trim).filter(|u| !u.is_empty()).map(str::to_string)
                }
            };
            if let Some(url) = url {
                return Some(ResolvedUrl { url, source });
            }
        }
        None
    }

    async fn resolve_doi(&self, doi: &str) -> Option<String> {
        match self.doi.resolve(doi).await {
            Ok(Some(url)) => Some(url),
            Ok(None) => {
                tracing::debug!(doi, "DOI has no registered location");
                None
            }
            Err(e) => {
                tracing::warn!(doi, error = %e, "DOI resolution failed");
                None
            }
        }
    }
}

impl fmt::Debug for IdentifierResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentifierResolver").field("priority", &self.priority).finish()
    }
}
