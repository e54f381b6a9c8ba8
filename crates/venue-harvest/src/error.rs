//! Error types for the venue harvester.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.
//! Only [`WriteError`] is fatal for a batch; everything else is recovered per term or
//! per record.

use std::path::PathBuf;
use std::time::Duration;

/// Errors from the HTTP client layer.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// HTTP transport error (connection, DNS, TLS, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Middleware error
    #[error("Middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    /// Rate limited by Semantic Scholar API (429 response)
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Suggested wait time before retry
        retry_after: Duration,
    },

    /// Resource not found (404 response)
    #[error("Resource not found: {resource}")]
    NotFound {
        /// Description of the missing resource
        resource: String,
    },

    /// Invalid request parameters (400 response)
    #[error("Bad request: {message}")]
    BadRequest {
        /// Error message from API
        message: String,
    },

    /// JSON parsing error
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Server error (5xx response)
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Unexpected HTTP status
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body or message
        message: String,
    },
}

impl ClientError {
    /// Create a rate limited error with retry-after duration.
    #[must_use]
    pub fn rate_limited(seconds: u64) -> Self {
        Self::RateLimited { retry_after: Duration::from_secs(seconds) }
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound { resource: resource.into() }
    }

    /// Create a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into() }
    }

    /// Create a server error.
    #[must_use]
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server { status, message: message.into() }
    }
}

/// Why a term's pagination stopped early.
#[derive(thiserror::Error, Debug)]
pub enum QueryFailure {
    /// The page request or its decoding failed.
    #[error(transparent)]
    Request(#[from] ClientError),

    /// The API handed back the cursor it was just given.
    #[error("cursor did not advance")]
    StalledCursor,
}

/// A term's pagination ended before the API signalled end-of-results.
#[derive(thiserror::Error, Debug)]
#[error("query {term:?} failed after {depth} page(s): {source}")]
pub struct QueryError {
    /// Query term being walked.
    pub term: String,
    /// Pages successfully received before the failure.
    pub depth: usize,
    /// Underlying failure.
    #[source]
    pub source: QueryFailure,
}

/// A raw record carried none of the identifier schemes usable as a dedup key.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("record {paper_id:?} has no DOI, ArXiv or CorpusId identifier")]
pub struct MissingIdentifier {
    /// Semantic Scholar paper id of the offending record (may be empty).
    pub paper_id: String,
}

/// Failure while fetching or persisting a PDF.
#[derive(thiserror::Error, Debug)]
pub enum DownloadError {
    /// URL could not be parsed or has no final path segment.
    #[error("no filename derivable from {url}")]
    NoFilename {
        /// Offending URL
        url: String,
    },

    /// Network failure or timeout.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-2xx status.
    #[error("HTTP status {status}")]
    Status {
        /// HTTP status code
        status: u16,
    },

    /// Another record of this run already saved a PDF under the same name.
    #[error("{} already holds the PDF from {owner}", path.display())]
    NameTaken {
        /// Contested destination
        path: PathBuf,
        /// URL that claimed it first
        owner: String,
    },

    /// Something not written by this run sits at the destination.
    #[error("{} already exists", path.display())]
    Exists {
        /// Destination path
        path: PathBuf,
    },

    /// Writing the file failed.
    #[error("failed to write {}: {source}", path.display())]
    Io {
        /// Destination being written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Per-record problem, recorded in the record's `errors` column.
#[derive(thiserror::Error, Debug)]
pub enum RecordError {
    /// No canonical URL could be built from any identifier or the record itself.
    #[error("paper URL not found")]
    ResolutionFailure,

    /// No PDF derivation rule matched the canonical URL.
    #[error("PDF URL not found")]
    PdfLinkUnavailable,

    /// The PDF could not be downloaded.
    #[error("download failed: {0}")]
    Download(#[from] DownloadError),
}

/// Ledger write failure; fatal for the batch.
#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    /// Opening or flushing the ledger file failed.
    #[error("ledger I/O error on {}: {source}", path.display())]
    Io {
        /// Ledger path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Encoding or reading a TSV row failed.
    #[error("ledger TSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
