//! Source validation.
//!
//! A source that parses but has no pages cannot contribute to a merge and
//! fails the whole request. The [`Validator`] checks each loaded document
//! and records what it saw in a [`ValidationResult`]; the results of a
//! request are collected into a [`ValidationSummary`] for logging.
//!
//! # Examples
//!
//! ```no_run
//! use pdfmerge::document::{DocumentLibrary, LopdfLibrary};
//! use pdfmerge::io::{SourceDescriptor, SourceOrigin};
//! use pdfmerge::validation::Validator;
//!
//! # fn example(bytes: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
//! let document = LopdfLibrary::new().load(bytes)?;
//! let source = SourceDescriptor::new(SourceOrigin::Upload, "a.pdf", "/tmp/a.pdf", 0);
//! let result = Validator::new().validate(&source, &document, bytes.len() as u64)?;
//! println!("{} has {} pages", source.display_name, result.page_count);
//! # Ok(())
//! # }
//! ```

use serde::Serialize;

use crate::document::PdfDocument;
use crate::error::{MergeError, Result};
use crate::io::{SourceDescriptor, SourceOrigin};

/// Result of validating a single source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// Name of the validated source.
    pub display_name: String,

    /// Position of the source in the request.
    pub ordinal: usize,

    /// Whether the source was fetched from a URL.
    pub remote: bool,

    /// Number of pages in the document.
    pub page_count: usize,

    /// Number of top-level form fields.
    pub field_count: usize,

    /// Number of signature fields.
    pub signature_count: usize,

    /// Size of the source file in bytes.
    pub file_size: u64,
}

/// Summary of validation results for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    /// Individual results, in input order.
    pub results: Vec<ValidationResult>,

    /// Total number of pages across all sources.
    pub total_pages: usize,

    /// Total size of the sources in bytes.
    pub total_size: u64,

    /// Number of sources that passed validation.
    pub sources_validated: usize,

    /// Number of signature fields across all sources.
    pub signature_fields: usize,
}

impl ValidationSummary {
    /// Create a summary from validation results.
    pub fn from_results(results: Vec<ValidationResult>) -> Self {
        let total_pages = results.iter().map(|r| r.page_count).sum();
        let total_size = results.iter().map(|r| r.file_size).sum();
        let signature_fields = results.iter().map(|r| r.signature_count).sum();
        let sources_validated = results.len();

        Self {
            results,
            total_pages,
            total_size,
            sources_validated,
            signature_fields,
        }
    }

    /// Format the total source size as a human-readable string.
    pub fn format_total_size(&self) -> String {
        crate::utils::format_file_size(self.total_size)
    }
}

/// Validator for loaded sources.
#[derive(Debug, Default, Clone, Copy)]
pub struct Validator;

impl Validator {
    /// Create a new validator.
    pub fn new() -> Self {
        Self
    }

    /// Validate one loaded source.
    ///
    /// # Arguments
    ///
    /// * `source` - Descriptor of the source
    /// * `document` - The source's loaded document
    /// * `file_size` - Size of the source's bytes
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the source if the document has no
    /// pages.
    pub fn validate<D: PdfDocument>(
        &self,
        source: &SourceDescriptor,
        document: &D,
        file_size: u64,
    ) -> Result<ValidationResult> {
        let page_count = document.page_count();
        if page_count == 0 {
            return Err(Self::empty_source_error(source));
        }

        let fields = document.form_fields().unwrap_or_default();
        let signature_count = fields.iter().filter(|f| f.kind.is_signature()).count();

        Ok(ValidationResult {
            display_name: source.display_name.clone(),
            ordinal: source.ordinal,
            remote: source.is_remote(),
            page_count,
            field_count: fields.len(),
            signature_count,
            file_size,
        })
    }

    fn empty_source_error(source: &SourceDescriptor) -> MergeError {
        match &source.origin {
            SourceOrigin::Upload => MergeError::validation(format!(
                "File {} contains no pages",
                source.display_name
            )),
            SourceOrigin::RemoteUrl(url) => {
                MergeError::validation(format!("Downloaded PDF has no pages from URL: {url}"))
            }
        }
    }
}
