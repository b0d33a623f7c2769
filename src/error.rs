//! Error types for pdfmerge.
//!
//! Every failure of a merge invocation is a [`MergeError`]. Errors carry a
//! human-readable message and classify themselves into one of the three
//! outward [`FailureKind`]s, which decide the status reported to the caller.
//!
//! # Error Categories
//!
//! - **Validation**: the request itself is unusable (empty source, no sources)
//! - **Download**: a remote source could not be fetched
//! - **I/O**: local persistence, parsing, merging or serialization failed

use reqwest::StatusCode;
use std::fmt;
use std::io;

use crate::document::LibraryError;

/// Result type alias for pdfmerge operations.
pub type Result<T> = std::result::Result<T, MergeError>;

/// Outward classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The request was rejected before or during validation.
    Validation,
    /// A remote source could not be downloaded.
    Download,
    /// A local I/O, parse, merge or save step failed.
    Io,
}

impl FailureKind {
    /// Status reported for this kind of failure.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Download => StatusCode::BAD_REQUEST,
            Self::Io => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "ValidationError"),
            Self::Download => write!(f, "DownloadError"),
            Self::Io => write!(f, "IOError"),
        }
    }
}

/// Main error type for merge invocations.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// A source or the request as a whole failed validation.
    #[error("{message}")]
    Validation {
        /// Message naming the offending source.
        message: String,
    },

    /// A remote source could not be fetched.
    #[error("Failed to download PDF from URL: {url} ({reason})")]
    Download {
        /// URL that failed.
        url: String,
        /// Transport-level reason.
        reason: String,
    },

    /// Local persistence, load or save failed.
    #[error("I/O error: {message}")]
    Io {
        /// Description of the failed step.
        message: String,
        /// Underlying I/O error, if any.
        #[source]
        source: Option<io::Error>,
    },

    /// The document library refused to append pages or fields.
    #[error("I/O error: Merge operation failed: {reason}")]
    Merge {
        /// Description of what went wrong.
        reason: String,
    },

    /// Configuration is invalid.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },
}

impl From<io::Error> for MergeError {
    fn from(err: io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl MergeError {
    /// Create a Validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a Download error.
    pub fn download(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Download {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create an Io error without an underlying `std::io::Error`.
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an `std::io::Error` with context about the failed step.
    pub fn io_with(context: impl fmt::Display, source: io::Error) -> Self {
        Self::Io {
            message: format!("{context}: {source}"),
            source: Some(source),
        }
    }

    /// Wrap a document library failure with context.
    pub fn library(context: impl fmt::Display, err: LibraryError) -> Self {
        match err {
            LibraryError::Io(source) => Self::io_with(context, source),
            other => Self::io(format!("{context}: {other}")),
        }
    }

    /// Create a Merge error.
    pub fn merge_failed(reason: impl Into<String>) -> Self {
        Self::Merge {
            reason: reason.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Outward classification of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Validation { .. } | Self::InvalidConfig { .. } => FailureKind::Validation,
            Self::Download { .. } => FailureKind::Download,
            Self::Io { .. } | Self::Merge { .. } => FailureKind::Io,
        }
    }

    /// Status reported to the caller for this error.
    pub fn status(&self) -> StatusCode {
        self.kind().status()
    }

    /// Get the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. } => 1,
            Self::InvalidConfig { .. } => 1,
            Self::Download { .. } => 2,
            Self::Io { .. } => 5,
            Self::Merge { .. } => 6,
        }
    }
}
