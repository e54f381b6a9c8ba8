//! Cursor-following search and run-scoped deduplication.

pub mod collector;
pub mod walker;

use async_trait::async_trait;

use crate::client::SemanticScholarClient;
use crate::config::fields;
use crate::error::ClientResult;
use crate::models::BulkSearchResult;

pub use collector::{CollectStats, DedupCollector, RunContext};
pub use walker::PaginationWalker;

/// Source of bulk search pages.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Fetch one page for `term`; `token` is `None` for the first page.
    async fn fetch_page(
        &self,
        term: &str,
        token: Option<&str>,
        filters: &SearchFilters,
    ) -> ClientResult<BulkSearchResult>;
}

#[async_trait]
impl SearchBackend for SemanticScholarClient {
    async fn fetch_page(
        &self,
        term: &str,
        token: Option<&str>,
        filters: &SearchFilters,
    ) -> ClientResult<BulkSearchResult> {
        self.search_papers_bulk(term, token, &filters.fields, &filters.query_params()).await
    }
}

/// Venue, year and field constraints shared by every term of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    /// Venue allow-list; empty means any venue.
    pub venues: Vec<String>,
    /// First year included.
    pub start_year: Option<i32>,
    /// Last year included.
    pub end_year: Option<i32>,
    /// Requested paper fields.
    pub fields: Vec<String>,
}

impl SearchFilters {
    #[must_use]
    pub fn new(venues: Vec<String>, start_year: Option<i32>, end_year: Option<i32>) -> Self {
        Self {
            venues,
            start_year,
            end_year,
            fields: fields::DEFAULT.iter().map(|f| (*f).to_string()).collect(),
        }
    }

    #[must_use]
    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        self
    }

    /// Add the identifier, `authors` and `year` fields if the caller left them out.
    ///
    /// A differently-cased spelling is rewritten in place. Returns the fields
    /// that had to be appended.
    pub fn ensure_required_fields(&mut self) -> Vec<&'static str> {
        let mut added = Vec::new();
        for &required in fields::REQUIRED {
            match self.fields.iter_mut().find(|f| f.eq_ignore_ascii_case(required)) {
                Some(field) => *field = required.to_string(),
                None => {
                    self.fields.push(required.to_string());
                    added.push(required);
                }
            }
        }
        added
    }

    /// `year` filter value: `a-b`, `a-`, `-b`, or `None`.
    #[must_use]
    pub fn year_param(&self) -> Option<String> {
        match (self.start_year, self.end_year) {
            (Some(min_year), Some(max_year)) => Some(format!("{}-{}", min_year, max_year)),
            (Some(min_year), None) => Some(format!("{}-", min_year)),
            (None, Some(max_year)) => Some(format!("-{}", max_year)),
            (None, None) => None,
        }
    }

    /// Filter parameters other than `query`, `fields` and `token`.
    #[must_use]
    pub fn query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();

        let venues: Vec<&str> =
            self.venues.iter().map(|v| v.trim()).filter(|v| !v.is_empty()).collect();
        if !venues.is_empty() {
            params.push(("venue".to_string(), venues.join(",")));
        }

        if let Some(year) = self.year_param() {
            params.push(("year".to_string(), year));
        }

        params
    }
}
