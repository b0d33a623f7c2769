//! pdfmerge - Merge local and remote PDF files into a single document.

mod cli;

use anyhow::Context;
use clap::Parser;
use std::process;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use pdfmerge::error::MergeError;
use pdfmerge::pipeline::MergePipeline;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:#}");
        let code = err
            .downcast_ref::<MergeError>()
            .map_or(1, MergeError::exit_code);
        process::exit(code);
    }
}

/// Main application logic.
async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.to_config()?;
    let request = cli.to_request().await?;
    let pipeline = MergePipeline::lopdf(config)?;

    let (bytes, statistics) = pipeline.execute(request).await?;

    tokio::fs::write(&cli.output, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;

    if !cli.quiet {
        println!(
            "Merged {} source(s) into {} pages: {} ({})",
            statistics.sources_merged,
            statistics.total_pages,
            cli.output.display(),
            statistics.format_output_size()
        );
        if statistics.signatures_removed > 0 {
            println!(
                "Removed {} signature field(s)",
                statistics.signatures_removed
            );
        }
    }

    Ok(())
}
