//! Page concatenation.

use tracing::debug;

use crate::document::PdfDocument;
use crate::error::{MergeError, Result};

/// Appends the pages of ordered sources to a composite document.
#[derive(Debug, Default, Clone, Copy)]
pub struct MergeEngine;

impl MergeEngine {
    /// Create a new merge engine.
    pub fn new() -> Self {
        Self
    }

    /// Append every page of every source to `composite`, in source order,
    /// carrying each source's form fields along after its pages.
    ///
    /// Sources are not modified. Returns the number of pages appended.
    ///
    /// # Arguments
    ///
    /// * `composite` - Document receiving the pages, normally empty
    /// * `sources` - Validated documents in merge order
    ///
    /// # Errors
    ///
    /// Returns a merge error if the document library fails to append a
    /// page or adopt a form.
    pub fn merge<D: PdfDocument>(&self, composite: &mut D, sources: &[&D]) -> Result<usize> {
        let mut appended = 0;

        for (position, source) in sources.iter().enumerate() {
            let pages = source.pages();
            for (page_number, page) in pages.iter().enumerate() {
                composite.append_page(source, page).map_err(|e| {
                    MergeError::merge_failed(format!(
                        "source {} page {}: {e}",
                        position + 1,
                        page_number + 1
                    ))
                })?;
            }

            composite.adopt_form(source).map_err(|e| {
                MergeError::merge_failed(format!(
                    "source {} form fields: {e}",
                    position + 1
                ))
            })?;

            debug!(source = position + 1, pages = pages.len(), "Appended source");
            appended += pages.len();
        }

        Ok(appended)
    }
}
