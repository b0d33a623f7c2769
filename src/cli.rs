//! CLI argument parsing for pdfmerge.
//!
//! This module defines the command-line interface structure using `clap`
//! and turns parsed arguments into a [`PipelineConfig`] and a
//! [`MergeRequest`].

use clap::Parser;
use std::path::PathBuf;

use pdfmerge::config::PipelineConfig;
use pdfmerge::error::Result;
use pdfmerge::io::Upload;
use pdfmerge::pipeline::MergeRequest;
use pdfmerge::utils::collect_paths_for_patterns;

/// Merge local and remote PDF files into a single document.
///
/// Local files are treated as uploads and merged first, followed by the
/// remote sources, unless a sort type reorders them.
#[derive(Parser, Debug)]
#[command(name = "pdfmerge")]
#[command(version)]
#[command(about = "Merge local and remote PDF files into a single document", long_about = None)]
#[command(author)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Local PDF files to merge (glob patterns allowed)
    ///
    /// Each matching file is merged under its file name.
    ///
    /// Examples:
    ///   pdfmerge -f a.pdf -f b.pdf
    ///   pdfmerge -f 'chapters/*.pdf'
    #[arg(short, long = "file", value_name = "GLOB")]
    pub files: Vec<String>,

    /// Remote PDF to download and merge (http or https)
    #[arg(short, long = "url", value_name = "URL")]
    pub urls: Vec<String>,

    /// Merge order
    ///
    /// - orderProvided: files in the order given, then URLs
    /// - byFileName: by file name (URL for remote sources)
    /// - byDateModified / byDateCreated: by timestamp of the local copy
    /// - byPDFTitle: by document title
    #[arg(short, long, value_name = "TOKEN", default_value = "orderProvided")]
    pub sort_type: String,

    /// Remove digital signature fields from the merged document
    #[arg(long)]
    pub remove_cert_sign: bool,

    /// Output PDF file path
    #[arg(short, long, value_name = "FILE", default_value = "merged.pdf")]
    pub output: PathBuf,

    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Deadline for each download in seconds
    #[arg(long, value_name = "SECS")]
    pub download_timeout: Option<u64>,

    /// Number of downloads run concurrently
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Directory for temporary files
    #[arg(long, value_name = "DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Write the merged document without compressing streams
    #[arg(long)]
    pub no_compress: bool,

    /// Verbose output - log every source and the merge order
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Build the pipeline configuration.
    ///
    /// Starts from `--config` when given, otherwise from defaults, then
    /// applies the command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be loaded or the
    /// resulting configuration is invalid.
    pub fn to_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(secs) = self.download_timeout {
            config.download_timeout_secs = Some(secs);
        }
        if let Some(jobs) = self.jobs {
            config.download_concurrency = jobs;
        }
        if let Some(ref dir) = self.temp_dir {
            config.temp_dir = Some(dir.clone());
        }
        if self.no_compress {
            config.compress_output = false;
        }

        config.validate()?;
        Ok(config)
    }

    /// Build the merge request, expanding file patterns.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern is malformed, a file cannot be
    /// opened, or the sort type is unknown.
    pub async fn to_request(&self) -> Result<MergeRequest> {
        let paths = collect_paths_for_patterns(&self.files)?;

        let mut uploads = Vec::with_capacity(paths.len());
        for path in &paths {
            uploads.push(Upload::from_path(path).await?);
        }

        MergeRequest::builder()
            .uploads(uploads)
            .urls(self.urls.iter().cloned())
            .sort_type(self.sort_type.clone())
            .strip_signatures(self.remove_cert_sign)
            .build()
    }

    /// Default log filter for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "pdfmerge=debug,info"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}
