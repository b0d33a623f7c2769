//! End-to-end merge invocation.
//!
//! [`MergePipeline::execute`] runs one [`MergeRequest`] through collection,
//! validation, ordering, concatenation, optional signature stripping and
//! serialization. Every temp file and document it creates is owned by a
//! [`ResourceScope`] that is released before `execute` returns, whatever
//! the outcome, or dropped with the future if the caller abandons it.
//!
//! # Examples
//!
//! ```no_run
//! use pdfmerge::config::PipelineConfig;
//! use pdfmerge::io::Upload;
//! use pdfmerge::merge::OrderingMode;
//! use pdfmerge::pipeline::{MergePipeline, MergeRequest};
//!
//! # async fn example(a: Vec<u8>, b: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = MergePipeline::lopdf(PipelineConfig::default())?;
//! let request = MergeRequest::builder()
//!     .upload(Upload::from_bytes("a.pdf", a))
//!     .upload(Upload::from_bytes("b.pdf", b))
//!     .url("https://example.com/appendix.pdf")
//!     .ordering_mode(OrderingMode::ByDisplayName)
//!     .build()?;
//!
//! let outcome = pipeline.run(request).await;
//! println!("{} ({} bytes)", outcome.status(), outcome.body().len());
//! # Ok(())
//! # }
//! ```

use futures::StreamExt;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::document::{DocumentLibrary, LopdfLibrary, PdfDocument};
use crate::error::{MergeError, Result};
use crate::io::{Downloader, InputCollector, SourceDescriptor, Upload};
use crate::lifecycle::{DocHandle, ResourceScope};
use crate::merge::{MergeEngine, MergeStatistics, OrderingMode, StripReport};
use crate::report::MergeOutcome;
use crate::validation::{ValidationResult, ValidationSummary, Validator};

/// Message of the failure reported when a request carries no sources.
pub const NO_SOURCES_MESSAGE: &str = "No valid PDF sources found to merge.";

/// One merge invocation's inputs.
#[derive(Debug)]
pub struct MergeRequest {
    uploads: Vec<Upload>,
    urls: Vec<String>,
    ordering_mode: OrderingMode,
    strip_signatures: bool,
}

impl MergeRequest {
    /// Start building a request.
    pub fn builder() -> MergeRequestBuilder {
        MergeRequestBuilder::default()
    }

    /// Ordering strategy of this request.
    pub fn ordering_mode(&self) -> OrderingMode {
        self.ordering_mode
    }

    /// Whether signature fields are removed from the merged document.
    pub fn strip_signatures(&self) -> bool {
        self.strip_signatures
    }

    /// Number of uploads, before filtering.
    pub fn upload_count(&self) -> usize {
        self.uploads.len()
    }

    /// Remote sources, before filtering.
    pub fn urls(&self) -> &[String] {
        &self.urls
    }
}

/// Builder for [`MergeRequest`].
#[derive(Debug, Default)]
pub struct MergeRequestBuilder {
    uploads: Vec<Upload>,
    urls: Vec<String>,
    ordering_mode: OrderingMode,
    sort_type: Option<String>,
    strip_signatures: bool,
}

impl MergeRequestBuilder {
    /// Add an upload.
    pub fn upload(mut self, upload: Upload) -> Self {
        self.uploads.push(upload);
        self
    }

    /// Add several uploads.
    pub fn uploads(mut self, uploads: impl IntoIterator<Item = Upload>) -> Self {
        self.uploads.extend(uploads);
        self
    }

    /// Add a remote source.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.urls.push(url.into());
        self
    }

    /// Add several remote sources.
    pub fn urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.urls.extend(urls.into_iter().map(Into::into));
        self
    }

    /// Set the ordering strategy.
    pub fn ordering_mode(mut self, mode: OrderingMode) -> Self {
        self.ordering_mode = mode;
        self.sort_type = None;
        self
    }

    /// Set the ordering strategy from its wire token. The token is parsed
    /// by [`MergeRequestBuilder::build`].
    pub fn sort_type(mut self, token: impl Into<String>) -> Self {
        self.sort_type = Some(token.into());
        self
    }

    /// Remove signature fields from the merged document.
    pub fn strip_signatures(mut self, strip: bool) -> Self {
        self.strip_signatures = strip;
        self
    }

    /// Finish the request.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the sort type token is unknown.
    pub fn build(self) -> Result<MergeRequest> {
        let ordering_mode = match self.sort_type {
            Some(token) => token.parse()?,
            None => self.ordering_mode,
        };

        Ok(MergeRequest {
            uploads: self.uploads,
            urls: self.urls,
            ordering_mode,
            strip_signatures: self.strip_signatures,
        })
    }
}

/// Serves merge requests with a document library.
///
/// A pipeline holds no per-request state and can serve concurrent
/// requests.
#[derive(Debug)]
pub struct MergePipeline<L: DocumentLibrary> {
    library: L,
    config: PipelineConfig,
    downloader: Downloader,
}

impl MergePipeline<LopdfLibrary> {
    /// Create a pipeline backed by `lopdf`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` is invalid.
    pub fn lopdf(config: PipelineConfig) -> Result<Self> {
        let library = LopdfLibrary::with_compression(config.compress_output);
        Self::new(library, config)
    }
}

impl<L: DocumentLibrary> MergePipeline<L> {
    /// Create a pipeline.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` is invalid.
    pub fn new(library: L, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let downloader = Downloader::new(&config)?;
        Ok(Self {
            library,
            config,
            downloader,
        })
    }

    /// Configuration of this pipeline.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run a request and describe the result for the caller.
    pub async fn run(&self, request: MergeRequest) -> MergeOutcome {
        let result = self.execute(request).await;
        if let Err(e) = &result {
            warn!(kind = %e.kind(), error = %e, "Merge failed");
        }
        result.into()
    }

    /// Run a request.
    ///
    /// # Errors
    ///
    /// - Validation error: no sources, or a source without pages.
    /// - Download error: a remote source could not be fetched.
    /// - I/O error: a source could not be persisted, read or parsed, the
    ///   merge failed, or the result could not be serialized.
    pub async fn execute(&self, request: MergeRequest) -> Result<(Vec<u8>, MergeStatistics)> {
        let started = Instant::now();
        let MergeRequest {
            uploads,
            urls,
            ordering_mode,
            strip_signatures,
        } = request;

        let (uploads, urls) = InputCollector::filter(uploads, &urls);
        if uploads.is_empty() && urls.is_empty() {
            return Err(MergeError::validation(NO_SOURCES_MESSAGE));
        }
        info!(
            uploads = uploads.len(),
            urls = urls.len(),
            mode = %ordering_mode,
            strip_signatures,
            "Starting merge"
        );

        let mut scope = ResourceScope::new(self.config.temp_dir.clone());
        let result = self
            .merge_in_scope(&mut scope, uploads, &urls, ordering_mode, strip_signatures)
            .await;

        let report = scope.release_all();
        if report.is_clean() {
            debug!(?report, "Released merge resources");
        } else {
            warn!(?report, "Some merge resources could not be released");
        }

        let (bytes, mut statistics) = result?;
        statistics.elapsed = started.elapsed();
        info!(
            sources = statistics.sources_merged,
            pages = statistics.total_pages,
            size = %statistics.format_output_size(),
            elapsed_ms = statistics.elapsed.as_millis() as u64,
            "Merge complete"
        );
        Ok((bytes, statistics))
    }

    async fn merge_in_scope(
        &self,
        scope: &mut ResourceScope<L::Document>,
        uploads: Vec<Upload>,
        urls: &[String],
        ordering_mode: OrderingMode,
        strip: bool,
    ) -> Result<(Vec<u8>, MergeStatistics)> {
        let (sources, handles) = self.collect_sources(scope, uploads, urls).await?;

        let mut titles: Vec<Option<Result<Option<String>>>> =
            if ordering_mode == OrderingMode::ByDocumentTitle {
                handles
                    .iter()
                    .map(|&h| Some(scope.document(h).map(|d| d.title())))
                    .collect()
            } else {
                Vec::new()
            };
        let order = ordering_mode
            .order(
                &sources,
                |i| titles.get_mut(i).and_then(Option::take).unwrap_or(Ok(None)),
                self.config.comparator_fallback,
            )
            .await?;
        debug!(
            order = ?order.iter().map(|&i| sources[i].display_name.as_str()).collect::<Vec<_>>(),
            "Merge order decided"
        );
        let ordered: Vec<DocHandle> = order.iter().map(|&i| handles[i]).collect();

        let composite = scope.adopt(self.library.new_empty());
        let (target, documents) = scope.split_for_merge(composite, &ordered)?;
        let total_pages = MergeEngine::new().merge(target, &documents)?;

        let stripped = if strip {
            let report = crate::merge::strip_signatures(target)?;
            info!(
                removed = report.removed,
                form_detached = report.form_detached,
                "Stripped signature fields"
            );
            report
        } else {
            StripReport::default()
        };

        let bytes = target
            .save()
            .map_err(|e| MergeError::library("Failed to save merged document", e))?;

        let statistics = MergeStatistics {
            sources_merged: ordered.len(),
            total_pages,
            signatures_removed: stripped.removed,
            form_detached: stripped.form_detached,
            output_size: bytes.len() as u64,
            ..MergeStatistics::default()
        };
        Ok((bytes, statistics))
    }

    /// Collect, load and validate every source in input order: uploads
    /// first, then URLs. The first source that cannot be persisted, fetched,
    /// parsed, or has no pages fails the request before any later source is
    /// collected. URLs are only fetched once every upload has passed.
    async fn collect_sources(
        &self,
        scope: &mut ResourceScope<L::Document>,
        uploads: Vec<Upload>,
        urls: &[String],
    ) -> Result<(Vec<SourceDescriptor>, Vec<DocHandle>)> {
        let collector = InputCollector::new(&self.downloader, self.config.download_concurrency);
        let validator = Validator::new();
        let capacity = uploads.len() + urls.len();
        let mut sources = Vec::with_capacity(capacity);
        let mut handles = Vec::with_capacity(capacity);
        let mut results = Vec::with_capacity(capacity);

        for upload in uploads {
            let source = collector
                .persist_upload(scope, upload, sources.len())
                .await?;
            let (handle, result) = self.load_and_validate(scope, &validator, &source).await?;
            sources.push(source);
            handles.push(handle);
            results.push(result);
        }

        let mut remote = collector.fetch_remote(scope, urls, sources.len())?;
        while let Some(source) = remote.next().await {
            let source = source?;
            let (handle, result) = self.load_and_validate(scope, &validator, &source).await?;
            sources.push(source);
            handles.push(handle);
            results.push(result);
        }
        drop(remote);

        let summary = ValidationSummary::from_results(results);
        if let Ok(json) = serde_json::to_string(&summary) {
            debug!(summary = %json, "Validation summary");
        }
        info!(
            sources = summary.sources_validated,
            pages = summary.total_pages,
            size = %summary.format_total_size(),
            "All sources validated"
        );

        Ok((sources, handles))
    }

    async fn load_and_validate(
        &self,
        scope: &mut ResourceScope<L::Document>,
        validator: &Validator,
        source: &SourceDescriptor,
    ) -> Result<(DocHandle, ValidationResult)> {
        let bytes = tokio::fs::read(&source.local_path)
            .await
            .map_err(|e| MergeError::io_with(format!("Failed to read {source}"), e))?;
        let document = self
            .library
            .load(&bytes)
            .map_err(|e| MergeError::library(format!("Failed to load {source}"), e))?;
        let handle = scope.adopt(document);

        let result = validator.validate(source, scope.document(handle)?, bytes.len() as u64)?;
        debug!(
            source = %source,
            pages = result.page_count,
            signatures = result.signature_count,
            "Validated source"
        );
        Ok((handle, result))
    }
}
