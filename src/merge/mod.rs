//! Ordering, concatenation and signature stripping.

pub mod engine;
pub mod ordering;
pub mod signatures;

pub use engine::MergeEngine;
pub use ordering::OrderingMode;
pub use signatures::{StripReport, strip_signatures};

use serde::Serialize;
use std::time::Duration;

/// Statistics about a completed merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeStatistics {
    /// Number of sources merged.
    pub sources_merged: usize,

    /// Total number of pages in the merged document.
    pub total_pages: usize,

    /// Signature fields removed.
    pub signatures_removed: usize,

    /// Whether the form was detached after stripping signatures.
    pub form_detached: bool,

    /// Size of the serialized document in bytes.
    pub output_size: u64,

    /// Wall time of the whole invocation.
    pub elapsed: Duration,
}

impl MergeStatistics {
    /// Format the output size as a human-readable string.
    pub fn format_output_size(&self) -> String {
        crate::utils::format_file_size(self.output_size)
    }
}
