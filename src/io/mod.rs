//! Source materialization.
//!
//! Every source of a merge request, uploaded or remote, is persisted to a
//! temp file owned by the invocation's [`ResourceScope`](crate::lifecycle::ResourceScope)
//! before it is parsed. This module holds the descriptors of those sources
//! and the collector that produces them.

pub mod collector;
pub mod download;

pub use collector::{InputCollector, Upload};
pub use download::Downloader;

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Where a source came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "url")]
pub enum SourceOrigin {
    /// Binary payload supplied with the request.
    Upload,
    /// Document fetched from a URL.
    RemoteUrl(String),
}

/// A source accepted into a merge invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDescriptor {
    /// Origin of the source.
    pub origin: SourceOrigin,

    /// Name used for ordering and in messages. For uploads the supplied
    /// file name, for remote sources the URL.
    pub display_name: String,

    /// Temp file holding the source bytes.
    pub local_path: PathBuf,

    /// Position in the input sequence: uploads first, then URLs.
    pub ordinal: usize,
}

impl SourceDescriptor {
    /// Create a descriptor.
    pub fn new(
        origin: SourceOrigin,
        display_name: impl Into<String>,
        local_path: impl Into<PathBuf>,
        ordinal: usize,
    ) -> Self {
        Self {
            origin,
            display_name: display_name.into(),
            local_path: local_path.into(),
            ordinal,
        }
    }

    /// Whether the source was fetched from a URL.
    pub fn is_remote(&self) -> bool {
        matches!(self.origin, SourceOrigin::RemoteUrl(_))
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            SourceOrigin::Upload => write!(f, "{}", self.display_name),
            SourceOrigin::RemoteUrl(url) => write!(f, "{url}"),
        }
    }
}
