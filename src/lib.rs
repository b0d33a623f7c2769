//! pdfmerge - Merge uploaded and remote PDF documents into one.
//!
//! This library implements a merge pipeline that:
//!
//! - Persists uploaded byte streams and downloaded URLs to temp files
//! - Rejects sources without pages
//! - Orders sources by input position, file name, timestamp or title
//! - Concatenates every page into a new document, carrying form fields
//! - Optionally removes digital signature fields
//! - Releases every temp file and document on every exit path
//!
//! # Examples
//!
//! ```no_run
//! use pdfmerge::config::PipelineConfig;
//! use pdfmerge::io::Upload;
//! use pdfmerge::pipeline::{MergePipeline, MergeRequest};
//!
//! # async fn example(a: Vec<u8>, b: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = MergePipeline::lopdf(PipelineConfig::default())?;
//! let request = MergeRequest::builder()
//!     .upload(Upload::from_bytes("b.pdf", b))
//!     .upload(Upload::from_bytes("a.pdf", a))
//!     .sort_type("byFileName")
//!     .strip_signatures(true)
//!     .build()?;
//!
//! let (bytes, stats) = pipeline.execute(request).await?;
//! println!("Merged {} pages into {} bytes", stats.total_pages, bytes.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod document;
pub mod error;
pub mod io;
pub mod lifecycle;
pub mod merge;
pub mod pipeline;
pub mod report;
pub mod utils;
pub mod validation;

// Re-export commonly used types
pub use config::{ComparatorFallback, PipelineConfig};
pub use error::{FailureKind, MergeError, Result};
pub use merge::{MergeStatistics, OrderingMode};
pub use pipeline::{MergePipeline, MergeRequest};
pub use report::MergeOutcome;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
