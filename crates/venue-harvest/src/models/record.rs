//! A deduplicated paper moving through the pipeline.

use crate::error::RecordError;
use crate::resolve::DedupKey;

use super::Paper;

/// Append-only list of problems met while processing one record.
///
/// Stages can only add notes; nothing removes or replaces earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordErrors(Vec<String>);

impl RecordErrors {
    pub fn push(&mut self, error: &RecordError) {
        self.0.push(error.to_string());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Single-cell rendering for the ledger.
    #[must_use]
    pub fn joined(&self) -> String {
        self.0.join("; ")
    }
}

/// One distinct paper of a run.
#[derive(Debug, Clone)]
pub struct Record {
    /// Raw search record.
    pub paper: Paper,
    /// Query term that first produced this paper.
    pub term: String,
    /// Identifier used for run-wide deduplication.
    pub dedup_key: DedupKey,
    /// Canonical landing page.
    pub canonical_url: Option<String>,
    /// Direct PDF link.
    pub pdf_url: Option<String>,
    errors: RecordErrors,
}

impl Record {
    #[must_use]
    pub fn new(paper: Paper, term: impl Into<String>, dedup_key: DedupKey) -> Self {
        Self {
            paper,
            term: term.into(),
            dedup_key,
            canonical_url: None,
            pdf_url: None,
            errors: RecordErrors::default(),
        }
    }

    /// Record a problem without interrupting processing.
    pub fn note(&mut self, error: impl Into<RecordError>) {
        let error = error.into();
        tracing::debug!(key = %self.dedup_key, error = %error, "record issue");
        self.errors.push(&error);
    }

    #[must_use]
    pub const fn errors(&self) -> &RecordErrors {
        &self.errors
    }
}
