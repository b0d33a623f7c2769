//! Document library capability.
//!
//! The merge pipeline never touches PDF bytes directly. It talks to a
//! [`DocumentLibrary`] that loads documents from bytes and creates empty
//! ones, and to the [`PdfDocument`]s it lends out. Every document handed
//! out by a library must be given back through [`PdfDocument::release`].
//!
//! [`lopdf_backend`] provides the implementation used by the binary.

pub mod lopdf_backend;

pub use lopdf_backend::{LopdfDocument, LopdfLibrary};

use std::fmt;
use std::io;

/// Failure reported by a document library.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    /// The bytes could not be parsed as a document.
    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    /// The document parsed but its structure does not allow the operation.
    #[error("Invalid PDF structure: {0}")]
    Structure(String),

    /// Reading or writing failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl LibraryError {
    /// Create a Parse error.
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse(reason.into())
    }

    /// Create a Structure error.
    pub fn structure(reason: impl Into<String>) -> Self {
        Self::Structure(reason.into())
    }
}

/// Classification of an interactive form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Digital signature placeholder (`/FT /Sig`).
    Signature,
    /// Text field (`/FT /Tx`).
    Text,
    /// Push button, check box or radio group (`/FT /Btn`).
    Button,
    /// List or combo box (`/FT /Ch`).
    Choice,
    /// Field that only groups child fields.
    NonTerminal,
    /// Anything else.
    Unknown,
}

impl FieldKind {
    /// Classify a field from its `/FT` name.
    pub fn from_field_type(name: &[u8]) -> Self {
        match name {
            b"Sig" => Self::Signature,
            b"Tx" => Self::Text,
            b"Btn" => Self::Button,
            b"Ch" => Self::Choice,
            _ => Self::Unknown,
        }
    }

    /// Whether this is a signature field.
    pub fn is_signature(&self) -> bool {
        matches!(self, Self::Signature)
    }
}

/// A top-level interactive form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField<Id> {
    /// Library-specific identity of the field.
    pub id: Id,
    /// Partial field name (`/T`), if any.
    pub name: Option<String>,
    /// Field classification.
    pub kind: FieldKind,
}

/// Loads documents and creates empty ones.
pub trait DocumentLibrary: Send + Sync {
    /// Document type lent by this library.
    type Document: PdfDocument;

    /// Parse a document from bytes.
    fn load(&self, bytes: &[u8]) -> Result<Self::Document, LibraryError>;

    /// Create an empty document with no pages and no form.
    fn new_empty(&self) -> Self::Document;
}

/// A loaded or newly created document.
pub trait PdfDocument: Send {
    /// Handle to one page of this document.
    type Page: Clone + fmt::Debug;

    /// Identity of a form field in this document.
    type FieldId: Clone + Eq + fmt::Debug;

    /// Number of pages.
    fn page_count(&self) -> usize;

    /// Pages in document order.
    fn pages(&self) -> Vec<Self::Page>;

    /// Append `page` of `source` to the end of this document.
    ///
    /// `source` is never modified.
    fn append_page(&mut self, source: &Self, page: &Self::Page) -> Result<(), LibraryError>;

    /// Carry the top-level form fields of `source` into this document.
    ///
    /// Called after the source's pages have been appended so widget
    /// annotations resolve to the copied pages.
    fn adopt_form(&mut self, source: &Self) -> Result<(), LibraryError>;

    /// Title metadata, if present.
    fn title(&self) -> Option<String>;

    /// Top-level form fields, or `None` when the document has no form.
    fn form_fields(&self) -> Option<Vec<FormField<Self::FieldId>>>;

    /// Remove a top-level field. Returns false if it was not present.
    fn remove_field(&mut self, id: &Self::FieldId) -> Result<bool, LibraryError>;

    /// Remove the form from the document entirely.
    fn detach_form(&mut self);

    /// Serialize the document.
    fn save(&mut self) -> Result<Vec<u8>, LibraryError>;

    /// Give the document back to the library.
    fn release(self) -> Result<(), LibraryError>
    where
        Self: Sized,
    {
        drop(self);
        Ok(())
    }
}
