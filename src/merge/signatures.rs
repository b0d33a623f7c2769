//! Removal of signature form fields from a merged document.
//!
//! Signatures of the source documents no longer cover the merged bytes, so
//! callers may ask for the signature fields to be removed. Other fields
//! are left in place; a form left without fields is detached.

use serde::Serialize;
use tracing::debug;

use crate::document::PdfDocument;
use crate::error::{MergeError, Result};

/// Outcome of a signature-stripping pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StripReport {
    /// Signature fields removed.
    pub removed: usize,
    /// Whether the form was detached because no fields remained.
    pub form_detached: bool,
}

/// Remove every signature field from `document`.
///
/// Does nothing when the document has no form. A form without fields is
/// detached even when no signature was removed. Running it twice removes
/// nothing the second time.
///
/// # Errors
///
/// Returns an I/O error if the document library fails to remove a field.
pub fn strip_signatures<D: PdfDocument>(document: &mut D) -> Result<StripReport> {
    let Some(fields) = document.form_fields() else {
        return Ok(StripReport::default());
    };

    let mut report = StripReport::default();
    for field in fields.iter().filter(|f| f.kind.is_signature()) {
        let removed = document
            .remove_field(&field.id)
            .map_err(|e| MergeError::library("Failed to remove signature field", e))?;
        if removed {
            debug!(field = ?field.name, "Removed signature field");
            report.removed += 1;
        }
    }

    let remaining = document.form_fields().map_or(0, |f| f.len());
    if remaining == 0 {
        document.detach_form();
        report.form_detached = true;
    }

    Ok(report)
}
