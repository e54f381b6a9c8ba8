//! Lazy, cursor-following walk over one term's bulk search results.

use std::sync::Arc;

use futures::stream::BoxStream;

use super::{SearchBackend, SearchFilters};
use crate::error::{QueryError, QueryFailure};
use crate::models::{BulkSearchResult, Paper};

/// Follows continuation tokens for a single query term.
#[derive(Clone)]
pub struct PaginationWalker {
    backend: Arc<dyn SearchBackend>,
}

impl PaginationWalker {
    #[must_use]
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self { backend }
    }

    /// Stream every record for `term`, page by page.
    ///
    /// The first request carries no token; each later request carries the token
    /// of the page before it. The stream ends when a page arrives without a token.
    /// A failed page ends the stream with a single `Err`, tagged with the number
    /// of pages already received. Nothing is requested until the stream is polled,
    /// and dropping it early cancels the walk.
    pub fn walk(
        &self,
        term: &str,
        filters: &SearchFilters,
    ) -> BoxStream<'static, Result<Paper, QueryError>> {
        let backend = Arc::clone(&self.backend);
        let term = term.to_string();
        let mut filters = filters.clone();
        let added = filters.ensure_required_fields();
        if !added.is_empty() {
            tracing::debug!(term = %term, fields = ?added, "added required fields to request");
        }

        Box::pin(async_stream::stream! {
            let mut token: Option<String> = None;
            let mut depth = 0usize;

            loop {
                let page = match backend.fetch_page(&term, token.as_deref(), &filters).await {
                    Ok(page) => page,
                    Err(e) => {
                        yield Err(QueryError { term: term.clone(), depth, source: e.into() });
                        break;
                    }
                };
                depth += 1;

                let BulkSearchResult { total, token: next, data } = page;
                if depth == 1 {
                    tracing::info!(term = %term, total, "will retrieve an estimated {} documents", total);
                }
                tracing::info!(
                    term = %term,
                    page = depth,
                    records = data.len(),
                    more = next.is_some(),
                    "received page"
                );

                for paper in data {
                    yield Ok(paper);
                }

                match next {
                    None => break,
                    Some(next) if token.as_deref() == Some(next.as_str()) => {
                        yield Err(QueryError {
                            term: term.clone(),
                            depth,
                            source: QueryFailure::StalledCursor,
                        });
                        break;
                    }
                    Some(next) => token = Some(next),
                }
            }
        })
    }
}

impl std::fmt::Debug for PaginationWalker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginationWalker").finish_non_exhaustive()
    }
}
