//! Streamed download of remote sources.

use futures::StreamExt;
use reqwest::{Client, Url};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::{MergeError, Result};

/// HTTP client used to fetch remote sources.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    timeout: Option<Duration>,
}

impl Downloader {
    /// Build a downloader from the pipeline configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let timeout = config.download_timeout();
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| MergeError::invalid_config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, timeout })
    }

    /// Check that `url` is an absolute `http` or `https` URL.
    ///
    /// # Errors
    ///
    /// Returns a download error carrying the URL otherwise.
    pub fn validate_url(url: &str) -> Result<Url> {
        let parsed = Url::parse(url).map_err(|e| MergeError::download(url, e.to_string()))?;
        match parsed.scheme() {
            "http" | "https" if parsed.host_str().is_some() => Ok(parsed),
            "http" | "https" => Err(MergeError::download(url, "missing host")),
            other => Err(MergeError::download(
                url,
                format!("unsupported scheme '{other}'"),
            )),
        }
    }

    /// Fetch `url` and stream the body into the file at `path`.
    ///
    /// The file is truncated first. Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// - Download error: invalid URL, unreachable host, non-success status,
    ///   timeout, or an interrupted transfer.
    /// - I/O error: the local file cannot be written.
    pub async fn fetch_to(&self, url: &str, path: &Path) -> Result<u64> {
        let parsed = Self::validate_url(url)?;
        info!(url, "Downloading PDF");

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| self.transport_error(url, e))?;

        if !response.status().is_success() {
            return Err(MergeError::download(
                url,
                format!("HTTP {}", response.status()),
            ));
        }

        let mut file = tokio::fs::File::create(path)
            .await
            .map_err(|e| MergeError::io_with(format!("Failed to open {}", path.display()), e))?;

        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| self.transport_error(url, e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| MergeError::io_with(format!("Failed to write {}", path.display()), e))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| MergeError::io_with(format!("Failed to write {}", path.display()), e))?;

        debug!(url, bytes = written, path = %path.display(), "Download complete");
        Ok(written)
    }

    fn transport_error(&self, url: &str, err: reqwest::Error) -> MergeError {
        match self.timeout {
            Some(timeout) if err.is_timeout() => {
                MergeError::download(url, format!("timed out after {}s", timeout.as_secs()))
            }
            _ => MergeError::download(url, err.to_string()),
        }
    }
}
