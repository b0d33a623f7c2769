//! Configuration for the merge pipeline.
//!
//! [`PipelineConfig`] holds the settings that apply to every invocation
//! served by a pipeline: where transient files go, how remote sources are
//! fetched, and how the ordering strategy treats keys it cannot read. It
//! can be loaded from a JSON file; every field has a default.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{MergeError, Result};

/// Default per-download deadline in seconds.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 120;

/// What the ordering strategy does when a sort key cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComparatorFallback {
    /// Compare the source as equal to every other source (default).
    #[default]
    TreatAsEqual,
    /// Fail the request with an I/O error.
    Abort,
}

/// Settings shared by every invocation of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    /// Directory for transient source files (system temp dir when unset).
    pub temp_dir: Option<PathBuf>,

    /// Deadline for each remote fetch, in seconds. `None` disables it.
    pub download_timeout_secs: Option<u64>,

    /// Maximum number of remote sources fetched concurrently.
    pub download_concurrency: usize,

    /// Behavior of the ordering strategy on unreadable sort keys.
    pub comparator_fallback: ComparatorFallback,

    /// Compress object streams of the merged document.
    pub compress_output: bool,

    /// User agent sent with remote fetches.
    pub user_agent: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            download_timeout_secs: Some(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
            download_concurrency: 1,
            comparator_fallback: ComparatorFallback::default(),
            compress_output: true,
            user_agent: format!("{}/{}", crate::NAME, crate::VERSION),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails [`PipelineConfig::validate`].
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            MergeError::invalid_config(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json_str(&raw)
    }

    /// Parse a configuration from a JSON string.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| MergeError::invalid_config(format!("Malformed config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `download_concurrency` is zero
    /// - `download_timeout_secs` is zero
    /// - `temp_dir` is set but is not an existing directory
    pub fn validate(&self) -> Result<()> {
        if self.download_concurrency == 0 {
            return Err(MergeError::invalid_config(
                "downloadConcurrency must be at least 1",
            ));
        }

        if let Some(0) = self.download_timeout_secs {
            return Err(MergeError::invalid_config(
                "downloadTimeoutSecs must be at least 1",
            ));
        }

        if let Some(ref dir) = self.temp_dir
            && !dir.is_dir()
        {
            return Err(MergeError::invalid_config(format!(
                "Temp directory does not exist: {}",
                dir.display()
            )));
        }

        Ok(())
    }

    /// Per-download deadline.
    pub fn download_timeout(&self) -> Option<Duration> {
        self.download_timeout_secs.map(Duration::from_secs)
    }
}
