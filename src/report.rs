//! Outward representation of a merge invocation.
//!
//! A [`MergeOutcome`] is what a transport layer turns into a response: the
//! merged bytes with their content type and suggested file name, or a
//! plain-text failure message with a status.

use reqwest::StatusCode;

use crate::error::{FailureKind, MergeError};
use crate::merge::MergeStatistics;

/// Content type of a successful outcome.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Content type of a failed outcome.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Suggested file name of the merged document.
pub const MERGED_FILENAME: &str = "merged.pdf";

/// Result of one merge invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The sources were merged.
    Success {
        /// Serialized composite document.
        bytes: Vec<u8>,
        /// Always [`PDF_CONTENT_TYPE`].
        content_type: &'static str,
        /// Always [`MERGED_FILENAME`].
        filename: &'static str,
        /// What the merge did.
        statistics: MergeStatistics,
    },
    /// The invocation failed.
    Failure {
        /// Classification of the failure.
        kind: FailureKind,
        /// Human-readable message.
        message: String,
        /// Status for the caller.
        status: StatusCode,
    },
}

impl MergeOutcome {
    /// Build a success outcome.
    pub fn success(bytes: Vec<u8>, statistics: MergeStatistics) -> Self {
        Self::Success {
            bytes,
            content_type: PDF_CONTENT_TYPE,
            filename: MERGED_FILENAME,
            statistics,
        }
    }

    /// Build a failure outcome from an error.
    pub fn failure(err: &MergeError) -> Self {
        Self::Failure {
            kind: err.kind(),
            message: err.to_string(),
            status: err.status(),
        }
    }

    /// Whether the merge succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Status for the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Success { .. } => StatusCode::OK,
            Self::Failure { status, .. } => *status,
        }
    }

    /// Content type of [`MergeOutcome::body`].
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Success { content_type, .. } => *content_type,
            Self::Failure { .. } => TEXT_CONTENT_TYPE,
        }
    }

    /// Suggested file name, for successful outcomes.
    pub fn filename(&self) -> Option<&'static str> {
        match self {
            Self::Success { filename, .. } => Some(*filename),
            Self::Failure { .. } => None,
        }
    }

    /// Response body: the PDF bytes or the UTF-8 message.
    pub fn body(&self) -> &[u8] {
        match self {
            Self::Success { bytes, .. } => bytes,
            Self::Failure { message, .. } => message.as_bytes(),
        }
    }

    /// Consume the outcome and return the response body.
    pub fn into_body(self) -> Vec<u8> {
        match self {
            Self::Success { bytes, .. } => bytes,
            Self::Failure { message, .. } => message.into_bytes(),
        }
    }
}

impl From<crate::Result<(Vec<u8>, MergeStatistics)>> for MergeOutcome {
    fn from(result: crate::Result<(Vec<u8>, MergeStatistics)>) -> Self {
        match result {
            Ok((bytes, statistics)) => Self::success(bytes, statistics),
            Err(err) => Self::failure(&err),
        }
    }
}
