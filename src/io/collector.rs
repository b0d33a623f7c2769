//! Persistence of request inputs into scope-owned temp files.
//!
//! Each temp file is registered with the [`ResourceScope`] before any byte
//! is written to it, so a failure part-way through collection still
//! releases everything collected so far.

use futures::stream::{self, BoxStream, StreamExt};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::debug;

use crate::document::PdfDocument;
use crate::error::{MergeError, Result};
use crate::io::download::Downloader;
use crate::io::{SourceDescriptor, SourceOrigin};
use crate::lifecycle::ResourceScope;

const UPLOAD_PREFIX: &str = "merge_";
const URL_PREFIX: &str = "url_";

/// An uploaded source: a file name plus an async byte stream.
pub struct Upload {
    /// File name supplied with the upload.
    pub display_name: String,

    /// Length announced by the transport, if known.
    pub declared_len: Option<u64>,

    reader: Box<dyn AsyncRead + Send + Unpin>,
}

impl Upload {
    /// Create an upload from a reader.
    pub fn new<R>(display_name: impl Into<String>, declared_len: Option<u64>, reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            display_name: display_name.into(),
            declared_len,
            reader: Box::new(reader),
        }
    }

    /// Create an upload from in-memory bytes.
    pub fn from_bytes(display_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        let len = bytes.len() as u64;
        Self::new(display_name, Some(len), std::io::Cursor::new(bytes))
    }

    /// Open a local file as an upload named after its file name.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| MergeError::io_with(format!("Failed to open {}", path.display()), e))?;
        let declared_len = file.metadata().await.ok().map(|m| m.len());
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self::new(display_name, declared_len, file))
    }

    /// An empty multipart part: no file name and nothing declared.
    fn is_blank(&self) -> bool {
        self.display_name.is_empty() && self.declared_len == Some(0)
    }
}

impl fmt::Debug for Upload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upload")
            .field("display_name", &self.display_name)
            .field("declared_len", &self.declared_len)
            .finish_non_exhaustive()
    }
}

/// Turns uploads and URLs into [`SourceDescriptor`]s.
#[derive(Debug, Clone, Copy)]
pub struct InputCollector<'a> {
    downloader: &'a Downloader,
    concurrency: usize,
}

impl<'a> InputCollector<'a> {
    /// Create a collector fetching at most `concurrency` URLs at a time.
    pub fn new(downloader: &'a Downloader, concurrency: usize) -> Self {
        Self {
            downloader,
            concurrency: concurrency.max(1),
        }
    }

    /// Drop inputs that carry no source: blank URL strings and empty
    /// multipart parts. URLs are trimmed.
    pub fn filter(uploads: Vec<Upload>, urls: &[String]) -> (Vec<Upload>, Vec<String>) {
        let uploads: Vec<_> = uploads
            .into_iter()
            .filter(|u| {
                let keep = !u.is_blank();
                if !keep {
                    debug!("Skipping empty upload part");
                }
                keep
            })
            .collect();
        let urls = urls
            .iter()
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
            .map(String::from)
            .collect();
        (uploads, urls)
    }

    /// Persist one upload into a fresh temp file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the upload cannot be written. The temp file
    /// stays registered with `scope` either way.
    pub async fn persist_upload<D: PdfDocument>(
        &self,
        scope: &mut ResourceScope<D>,
        mut upload: Upload,
        ordinal: usize,
    ) -> Result<SourceDescriptor> {
        let path = scope.allocate_file(UPLOAD_PREFIX)?;
        let context = || format!("Failed to persist upload {}", upload.display_name);

        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| MergeError::io_with(context(), e))?;
        let written = tokio::io::copy(&mut upload.reader, &mut file)
            .await
            .map_err(|e| MergeError::io_with(context(), e))?;
        file.flush()
            .await
            .map_err(|e| MergeError::io_with(context(), e))?;

        debug!(name = %upload.display_name, bytes = written, path = %path.display(), "Persisted upload");
        Ok(SourceDescriptor::new(
            SourceOrigin::Upload,
            upload.display_name,
            path,
            ordinal,
        ))
    }

    /// Fetch `urls` into temp files, numbering them from `first_ordinal`.
    ///
    /// A temp file is registered for every URL before the first request is
    /// sent. Up to `concurrency` fetches run at once, but descriptors are
    /// yielded in input order, so the first failure by input position is
    /// the one reported. Dropping the stream cancels fetches still running.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a temp file cannot be created. Fetch
    /// failures are yielded by the stream.
    pub fn fetch_remote<'s, D: PdfDocument>(
        &'s self,
        scope: &mut ResourceScope<D>,
        urls: &'s [String],
        first_ordinal: usize,
    ) -> Result<BoxStream<'s, Result<SourceDescriptor>>> {
        let paths = urls
            .iter()
            .map(|_| scope.allocate_file(URL_PREFIX))
            .collect::<Result<Vec<PathBuf>>>()?;

        let downloader = self.downloader;
        let fetches = urls
            .iter()
            .zip(paths)
            .enumerate()
            .map(move |(idx, (url, path))| async move {
                downloader.fetch_to(url, &path).await?;
                Ok::<_, MergeError>(SourceDescriptor::new(
                    SourceOrigin::RemoteUrl(url.clone()),
                    url.clone(),
                    path,
                    first_ordinal + idx,
                ))
            });

        Ok(stream::iter(fetches).buffered(self.concurrency).boxed())
    }
}
