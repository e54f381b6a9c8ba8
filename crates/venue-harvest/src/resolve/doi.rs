//! DOI landing-page resolution through the doi.org handle API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::config::Config;
use crate::error::{ClientError, ClientResult};

/// Resolves a DOI to its registered landing page.
#[async_trait]
pub trait DoiResolver: Send + Sync {
    /// Landing page for `doi`, or `None` when the DOI is not registered.
    async fn resolve(&self, doi: &str) -> ClientResult<Option<String>>;
}

/// Handle API record for a DOI.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HandleRecord {
    /// 1 = success, 100 = handle not found, 200 = no values.
    response_code: i32,
    #[serde(default)]
    values: Vec<HandleValue>,
}

#[derive(Debug, Deserialize)]
struct HandleValue {
    #[serde(rename = "type")]
    kind: String,
    data: HandleData,
}

#[derive(Debug, Deserialize)]
struct HandleData {
    value: serde_json::Value,
}

/// [`DoiResolver`] backed by `GET {base}/api/handles/{doi}`.
#[derive(Debug, Clone)]
pub struct HandleApiResolver {
    client: Client,
    base_url: Url,
}

impl HandleApiResolver {
    /// Build a resolver from the configured service URL and timeout.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Self::with_timeout(&config.doi_resolver_url, config.resolve_timeout, config.connect_timeout)
    }

    /// Build a resolver against an explicit base URL.
    pub fn with_timeout(
        base_url: &str,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).connect_timeout(connect_timeout).build()?;
        Ok(Self { client, base_url: Url::parse(base_url)? })
    }

    fn handle_url(&self, doi: &str) -> Option<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().ok()?;
            segments.pop_if_empty().push("api").push("handles");
            // DOI prefix and suffix stay separate path segments, as the handle API expects
            segments.extend(doi.split('/'));
        }
        Some(url)
    }
}

#[async_trait]
impl DoiResolver for HandleApiResolver {
    async fn resolve(&self, doi: &str) -> ClientResult<Option<String>> {
        let Some(url) = self.handle_url(doi) else {
            return Ok(None);
        };

        let response = self.client.get(url).send().await?;
        let status = response.status();

        // Unregistered DOIs come back as 404 with responseCode 100
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::UnexpectedStatus { status: status.as_u16(), message: text });
        }

        let record: HandleRecord = serde_json::from_slice(&response.bytes().await?)?;
        if record.response_code != 1 {
            return Ok(None);
        }

        Ok(record
            .values
            .into_iter()
            .filter(|v| v.kind.eq_ignore_ascii_case("URL"))
            .find_map(|v| v.data.value.as_str().map(str::to_string))
            .filter(|u| !u.is_empty()))
    }
}
