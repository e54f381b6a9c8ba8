//! Run-wide deduplication across terms and pages.

use std::collections::HashSet;

use futures::{Stream, StreamExt};

use super::{PaginationWalker, SearchFilters};
use crate::models::Record;
use crate::resolve::{DedupKey, resolve_key};

/// Counters for one collection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectStats {
    /// Terms started.
    pub terms: usize,
    /// Raw records received from the API.
    pub raw: usize,
    /// Distinct records emitted.
    pub emitted: usize,
    /// Raw records dropped as already seen.
    pub duplicates: usize,
    /// Raw records dropped for lack of an identifier.
    pub missing_identifier: usize,
    /// Terms whose pagination ended in an error.
    pub query_errors: usize,
}

/// State owned by a single run: the seen-set and its counters.
///
/// Every mutation goes through `&mut self`, so there is exactly one writer.
#[derive(Debug, Default)]
pub struct RunContext {
    seen: HashSet<String>,
    stats: CollectStats,
}

impl RunContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark keys from an earlier run as already recorded.
    ///
    /// Returns how many keys were new to the set.
    pub fn seed<I>(&mut self, keys: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        keys.into_iter()
            .filter(|k| !k.is_empty())
            .map(|k| self.seen.insert(k))
            .filter(|inserted| *inserted)
            .count()
    }

    /// Check-and-insert in one step; true if `key` had not been seen yet.
    pub fn admit(&mut self, key: &DedupKey) -> bool {
        self.seen.insert(key.value.clone())
    }

    #[must_use]
    pub fn is_seen(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    #[must_use]
    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub const fn stats(&self) -> &CollectStats {
        &self.stats
    }
}

/// Walks every term in order and yields each distinct paper once.
#[derive(Debug, Clone)]
pub struct DedupCollector {
    walker: PaginationWalker,
    max_results: Option<usize>,
}

impl DedupCollector {
    #[must_use]
    pub fn new(walker: PaginationWalker) -> Self {
        Self { walker, max_results: None }
    }

    /// Stop after this many distinct records.
    #[must_use]
    pub fn with_max_results(mut self, max_results: Option<usize>) -> Self {
        self.max_results = max_results.filter(|m| *m > 0);
        self
    }

    /// Lazily collect distinct records for `terms`, in term order.
    ///
    /// Query failures end only the affected term. Records without any usable
    /// identifier are skipped. The seen-set in `ctx` is never reset between terms.
    pub fn collect<'a>(
        &'a self,
        terms: &'a [String],
        filters: &'a SearchFilters,
        ctx: &'a mut RunContext,
    ) -> impl Stream<Item = Record> + Send + 'a {
        async_stream::stream! {
            'terms: for term in terms {
                if self.max_results.is_some_and(|max| ctx.stats.emitted >= max) {
                    tracing::info!(max = ctx.stats.emitted, "result cap reached");
                    break 'terms;
                }

                ctx.stats.terms += 1;
                tracing::info!(term = %term, "searching");
                let mut pages = self.walker.walk(term, filters);

                while let Some(item) = pages.next().await {
                    let paper = match item {
                        Ok(paper) => paper,
                        Err(e) => {
                            ctx.stats.query_errors += 1;
                            tracing::warn!(term = %e.term, depth = e.depth, error = %e.source, "query aborted");
                            continue;
                        }
                    };
                    ctx.stats.raw += 1;

                    let key = match resolve_key(&paper) {
                        Ok(key) => key,
                        Err(e) => {
                            ctx.stats.missing_identifier += 1;
                            tracing::warn!(term = %term, error = %e, "skipping record");
                            continue;
                        }
                    };

                    if !ctx.admit(&key) {
                        ctx.stats.duplicates += 1;
                        tracing::debug!(term = %term, key = %key, "duplicate");
                        continue;
                    }

                    ctx.stats.emitted += 1;
                    yield Record::new(paper, term.as_str(), key);

                    if self.max_results.is_some_and(|max| ctx.stats.emitted >= max) {
                        tracing::info!(max = ctx.stats.emitted, "result cap reached");
                        break 'terms;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::IdScheme;

    fn key(value: &str) -> DedupKey {
        DedupKey { scheme: IdScheme::Doi, value: value.to_string() }
    }

    #[test]
    fn test_admit_is_check_and_insert() {
        let mut ctx = RunContext::new();
        assert!(ctx.admit(&key("10.1/x")));
        assert!(!ctx.admit(&key("10.1/x")));
        assert!(ctx.admit(&key("10.1/y")));
        assert_eq!(ctx.seen_len(), 2);
    }

    #[test]
    fn test_seed_blocks_keys() {
        let mut ctx = RunContext::new();
        let added = ctx.seed(vec!["10.1/x".to_string(), String::new(), "10.1/x".to_string()]);
        assert_eq!(added, 1);
        assert!(ctx.is_seen("10.1/x"));
        assert!(!ctx.admit(&key("10.1/x")));
    }

    #[test]
    fn test_seen_set_compares_values() {
        let mut ctx = RunContext::new();
        assert!(ctx.admit(&key("123")));
        assert!(!ctx.admit(&DedupKey { scheme: IdScheme::CorpusId, value: "123".into() }));
    }
}
