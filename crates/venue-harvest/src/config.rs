//! Configuration for the venue harvester.

use std::net::SocketAddr;
use std::time::Duration;

/// API configuration constants.
pub mod api {
    use std::time::Duration;

    /// Graph API endpoint.
    pub const GRAPH_API: &str = "https://api.semanticscholar.org/graph/v1";

    /// DOI handle resolution service.
    pub const DOI_RESOLVER: &str = "https://doi.org";

    /// Request timeout for search pages.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Timeout for a single DOI resolution.
    pub const RESOLVE_TIMEOUT: Duration = Duration::from_secs(15);

    /// Timeout for a single PDF download (whole body).
    pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

    /// Delay between page requests without API key (1 req/s for bulk search).
    pub const PAGE_DELAY: Duration = Duration::from_secs(1);

    /// Delay between page requests with API key.
    pub const PAGE_DELAY_WITH_KEY: Duration = Duration::from_millis(100);

    /// Retries for transient search failures (429, 5xx, connection resets).
    pub const MAX_RETRIES: u32 = 3;

    /// Maximum keepalive connections.
    pub const MAX_KEEPALIVE: usize = 10;

    /// Keepalive expiry.
    pub const KEEPALIVE_EXPIRY: Duration = Duration::from_secs(30);
}

/// Paper field sets for bulk search requests.
pub mod fields {
    /// Field carrying the external identifiers.
    pub const IDENTIFIERS: &str = "externalIds";

    /// Fields added to every request: the dedup identifiers plus the
    /// `authors` and `year` ledger columns.
    pub const REQUIRED: &[&str] = &[IDENTIFIERS, "authors", "year"];

    /// Default fields requested when the caller does not override them.
    pub const DEFAULT: &[&str] =
        &["title", "abstract", "authors", "year", "venue", "url", "externalIds"];
}

/// Which identifier scheme wins when building the canonical URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum UrlPriority {
    /// Resolved DOI landing page, then arXiv abstract page.
    #[default]
    DoiFirst,
    /// arXiv abstract page, then resolved DOI landing page.
    ArxivFirst,
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Semantic Scholar API key (optional).
    pub api_key: Option<String>,

    /// Base URL for Graph API (for testing with mock servers).
    pub graph_api_url: String,

    /// Base URL for the DOI handle service (for testing with mock servers).
    pub doi_resolver_url: String,

    /// Request timeout for search pages.
    pub request_timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Timeout for a DOI resolution.
    pub resolve_timeout: Duration,

    /// Timeout for a PDF download.
    pub download_timeout: Duration,

    /// Delay before each page request.
    pub page_delay: Duration,

    /// Retries for transient search failures.
    pub max_retries: u32,

    /// Static address for a PDF host, bypassing DNS (the URL's port still applies).
    pub host_overrides: Vec<(String, SocketAddr)>,
}

impl Config {
    /// Create a new configuration with optional API key.
    ///
    /// Page pacing is adjusted based on API key presence.
    #[must_use]
    pub fn new(api_key: Option<String>) -> Self {
        let has_key = api_key.is_some();
        Self {
            api_key,
            graph_api_url: api::GRAPH_API.to_string(),
            doi_resolver_url: api::DOI_RESOLVER.to_string(),
            request_timeout: api::REQUEST_TIMEOUT,
            connect_timeout: api::CONNECT_TIMEOUT,
            resolve_timeout: api::RESOLVE_TIMEOUT,
            download_timeout: api::DOWNLOAD_TIMEOUT,
            page_delay: if has_key { api::PAGE_DELAY_WITH_KEY } else { api::PAGE_DELAY },
            max_retries: api::MAX_RETRIES,
            host_overrides: Vec::new(),
        }
    }

    /// Create a test configuration pointing every service at one mock server.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            api_key: None,
            graph_api_url: format!("{}/graph/v1", base_url),
            doi_resolver_url: base_url.to_string(),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            resolve_timeout: Duration::from_secs(2),
            download_timeout: Duration::from_secs(5),
            page_delay: Duration::from_millis(0), // No delay in tests
            max_retries: 0,
            host_overrides: Vec::new(),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns error if environment variables are invalid.
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("SEMANTIC_SCHOLAR_API_KEY").ok().filter(|k| !k.is_empty());
        Ok(Self::new(api_key))
    }

    /// Check if an API key is configured.
    #[must_use]
    pub const fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(None)
    }
}
