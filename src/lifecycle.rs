//! Scoped ownership of transient resources.
//!
//! A [`ResourceScope`] is created at the start of every merge invocation and
//! owns each temp file and each document opened while serving it. Resources
//! are released exactly once: by [`ResourceScope::release_all`] on the
//! normal path, or by `Drop` when the invocation is abandoned early (an
//! error propagated with `?`, a panic, or a dropped future).
//!
//! Releasing is best-effort per resource. A failure is logged and counted
//! in the [`ReleaseReport`] and the remaining resources are still released.

use std::collections::HashMap;
use std::path::PathBuf;
use tempfile::TempPath;
use tracing::{debug, warn};

use crate::document::PdfDocument;
use crate::error::{MergeError, Result};

/// Handle to a document owned by a [`ResourceScope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocHandle(usize);

/// Outcome of releasing a scope's resources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseReport {
    /// Temp files removed.
    pub files_removed: usize,
    /// Documents handed back to their library.
    pub documents_released: usize,
    /// Release attempts that failed (already logged).
    pub failures: usize,
}

impl ReleaseReport {
    /// Whether every release attempt succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures == 0
    }
}

/// Owner of every temp file and document created during one invocation.
pub struct ResourceScope<D: PdfDocument> {
    temp_dir: Option<PathBuf>,
    files: Vec<Option<TempPath>>,
    documents: Vec<Option<D>>,
    released: ReleaseReport,
}

impl<D: PdfDocument> ResourceScope<D> {
    /// Create an empty scope. Temp files go to `temp_dir`, or the system
    /// temp directory when `None`.
    pub fn new(temp_dir: Option<PathBuf>) -> Self {
        Self {
            temp_dir,
            files: Vec::new(),
            documents: Vec::new(),
            released: ReleaseReport::default(),
        }
    }

    /// Create and register an empty temp file named `<prefix>*.pdf`.
    ///
    /// The file is tracked before anything is written to it.
    pub fn allocate_file(&mut self, prefix: &str) -> Result<PathBuf> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix).suffix(".pdf");

        let file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| MergeError::io_with("Failed to create temp file", e))?;

        let temp_path = file.into_temp_path();
        let path = temp_path.to_path_buf();
        self.files.push(Some(temp_path));

        debug!(path = %path.display(), "Allocated temp file");
        Ok(path)
    }

    /// Take ownership of a document.
    pub fn adopt(&mut self, document: D) -> DocHandle {
        let handle = DocHandle(self.documents.len());
        self.documents.push(Some(document));
        handle
    }

    /// Borrow a tracked document.
    pub fn document(&self, handle: DocHandle) -> Result<&D> {
        self.documents
            .get(handle.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| MergeError::io(format!("Document {handle:?} was already released")))
    }

    /// Borrow `target` mutably together with `sources` immutably, in the
    /// order given.
    pub fn split_for_merge(
        &mut self,
        target: DocHandle,
        sources: &[DocHandle],
    ) -> Result<(&mut D, Vec<&D>)> {
        if sources.contains(&target) {
            return Err(MergeError::merge_failed(
                "A document cannot be merged into itself",
            ));
        }

        let mut target_doc = None;
        let mut others: HashMap<usize, &D> = HashMap::new();
        for (idx, slot) in self.documents.iter_mut().enumerate() {
            if idx == target.0 {
                target_doc = slot.as_mut();
            } else if let Some(doc) = slot.as_ref() {
                others.insert(idx, doc);
            }
        }

        let target_doc = target_doc
            .ok_or_else(|| MergeError::io(format!("Document {target:?} was already released")))?;
        let ordered = sources
            .iter()
            .map(|handle| {
                others.get(&handle.0).copied().ok_or_else(|| {
                    MergeError::io(format!("Document {handle:?} was already released"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((target_doc, ordered))
    }

    /// Number of resources not yet released.
    pub fn outstanding(&self) -> usize {
        self.files.iter().filter(|f| f.is_some()).count()
            + self.documents.iter().filter(|d| d.is_some()).count()
    }

    /// Release every resource still tracked.
    ///
    /// Calling this more than once is harmless; each resource is released
    /// only the first time. Returns the cumulative report.
    pub fn release_all(&mut self) -> ReleaseReport {
        for slot in self.documents.iter_mut() {
            if let Some(document) = slot.take() {
                match document.release() {
                    Ok(()) => self.released.documents_released += 1,
                    Err(e) => {
                        warn!(error = %e, "Failed to release document");
                        self.released.failures += 1;
                    }
                }
            }
        }

        for slot in self.files.iter_mut() {
            if let Some(temp_path) = slot.take() {
                let path = temp_path.to_path_buf();
                match temp_path.close() {
                    Ok(()) => self.released.files_removed += 1,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Failed to remove temp file");
                        self.released.failures += 1;
                    }
                }
            }
        }

        self.released.clone()
    }
}

impl<D: PdfDocument> Drop for ResourceScope<D> {
    fn drop(&mut self) {
        if self.outstanding() > 0 {
            let report = self.release_all();
            debug!(?report, "Released resources on scope drop");
        }
    }
}
