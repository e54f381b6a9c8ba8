//! PDF download executor.
//!
//! Each call writes at most one file. Bytes are streamed into a uniquely named
//! `.part` file in the output directory and moved into place only once the body
//! is complete, without replacing anything already there. A failed or cancelled
//! download removes its temporary file, so no partial or empty PDF is left
//! behind. No retries happen here.
//!
//! File names come from the URL's last path segment, so two different URLs can
//! map to the same name (`hep-th/9901001` and `math/9901001`). The first URL to
//! claim a name keeps it for the rest of the run; later ones fail with
//! [`DownloadError::NameTaken`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use reqwest::Client;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use url::Url;

use crate::config::Config;
use crate::error::DownloadError;

/// Suffix of in-flight downloads.
const PART_SUFFIX: &str = ".part";

/// What a successful download produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// Final file path.
    pub path: PathBuf,
    /// Bytes written (or found on disk when skipped).
    pub bytes: u64,
    /// The file already existed from an earlier run.
    pub skipped: bool,
}

/// Fetches PDFs into an output directory.
#[derive(Debug, Clone)]
pub struct PdfDownloader {
    client: Client,
    /// Destination path -> URL that claimed it in this run.
    claims: Arc<Mutex<HashMap<PathBuf, String>>>,
}

impl PdfDownloader {
    /// Build a downloader with the configured timeouts and host overrides.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut builder = Client::builder()
            .timeout(config.download_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")));
        for (host, addr) in &config.host_overrides {
            builder = builder.resolve(host, *addr);
        }
        Ok(Self { client: builder.build()?, claims: Arc::default() })
    }

    /// Download `pdf_url` into `out_dir`, named after the URL's last path segment.
    ///
    /// A non-empty file already at the destination counts as done.
    pub async fn download(
        &self,
        pdf_url: &str,
        out_dir: &Path,
    ) -> Result<DownloadOutcome, DownloadError> {
        let name = file_name(pdf_url)
            .ok_or_else(|| DownloadError::NoFilename { url: pdf_url.to_string() })?;
        let path = out_dir.join(&name);

        self.claim(&path, pdf_url).await?;

        if let Ok(meta) = fs::metadata(&path).await {
            if meta.is_file() && meta.len() > 0 {
                tracing::debug!(path = %path.display(), "already downloaded");
                return Ok(DownloadOutcome { path, bytes: meta.len(), skipped: true });
            }
        }

        match self.fetch_to(pdf_url, out_dir, &name, &path).await {
            Ok(bytes) => {
                tracing::info!(url = pdf_url, path = %path.display(), bytes, "downloaded");
                Ok(DownloadOutcome { path, bytes, skipped: false })
            }
            Err(e) => {
                self.release(&path, pdf_url).await;
                tracing::warn!(url = pdf_url, error = %e, "download failed");
                Err(e)
            }
        }
    }

    async fn claim(&self, path: &Path, pdf_url: &str) -> Result<(), DownloadError> {
        let mut claims = self.claims.lock().await;
        match claims.get(path) {
            Some(owner) if owner != pdf_url => {
                Err(DownloadError::NameTaken { path: path.to_path_buf(), owner: owner.clone() })
            }
            Some(_) => Ok(()),
            None => {
                claims.insert(path.to_path_buf(), pdf_url.to_string());
                Ok(())
            }
        }
    }

    async fn release(&self, path: &Path, pdf_url: &str) {
        let mut claims = self.claims.lock().await;
        if claims.get(path).is_some_and(|owner| owner == pdf_url) {
            claims.remove(path);
        }
    }

    async fn fetch_to(
        &self,
        url: &str,
        out_dir: &Path,
        name: &str,
        path: &Path,
    ) -> Result<u64, DownloadError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status { status: status.as_u16() });
        }

        let io_err = |at: &Path, source: std::io::Error| DownloadError::Io { path: at.to_path_buf(), source };

        // Removed on drop unless persisted
        let part = tempfile::Builder::new()
            .prefix(&format!(".{name}."))
            .suffix(PART_SUFFIX)
            .tempfile_in(out_dir)
            .map_err(|e| io_err(out_dir, e))?;
        let handle = part.as_file().try_clone().map_err(|e| io_err(part.path(), e))?;

        let mut writer = BufWriter::new(File::from_std(handle));
        let mut body = response.bytes_stream();
        let mut bytes = 0u64;

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            writer.write_all(&chunk).await.map_err(|e| io_err(part.path(), e))?;
            bytes += chunk.len() as u64;
        }

        writer.flush().await.map_err(|e| io_err(part.path(), e))?;
        writer.into_inner().sync_all().await.map_err(|e| io_err(part.path(), e))?;

        part.persist_noclobber(path).map_err(|e| {
            if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                DownloadError::Exists { path: path.to_path_buf() }
            } else {
                io_err(path, e.error)
            }
        })?;
        Ok(bytes)
    }
}

/// Final non-empty path segment of `url`, if it is a usable file name.
#[must_use]
pub fn file_name(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.next_back()?;
    let name = segment.trim();
    if name.is_empty() || name == "." || name == ".." || name.contains('\\') {
        return None;
    }
    Some(name.to_string())
}
