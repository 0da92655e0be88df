//! Index-folder command - index every record below a folder

use crate::cli::commands::index::{build_job, build_pipeline};
use crate::cli::output::{colors, format_duration, print_json, print_outcome, print_warning};
use crate::cli::OutputFormat;
use crate::core::indexer::RecordWalker;
use crate::core::services::Services;
use crate::core::types::IndexOutcome;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Arguments for the index-folder command
#[derive(Args, Debug)]
pub struct IndexFolderArgs {
    /// Folder to scan for record files
    pub path: PathBuf,

    /// Read every record with this variant instead of detecting it
    #[arg(long, short = 'v')]
    pub variant: Option<String>,

    /// Glob patterns of record files (can be specified multiple times)
    #[arg(long, short = 'i')]
    pub include: Vec<String>,

    /// Download externally hosted page images into the media folders
    #[arg(long)]
    pub download_images: bool,

    /// Only print failed records and the summary
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

/// Folder indexing summary
#[derive(Debug, Serialize)]
pub struct IndexFolderResponse {
    pub path: String,
    pub records_found: usize,
    pub records_indexed: usize,
    pub records_failed: usize,
    pub documents_written: usize,
    pub warnings: usize,
    pub duration_secs: f64,
    pub outcomes: Vec<IndexOutcome>,
}

/// Execute the index-folder command
pub async fn execute(
    args: IndexFolderArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    let path = args.path.canonicalize().map_err(|e| {
        format!(
            "Invalid path '{}': {}. Make sure the folder exists and is accessible.",
            args.path.display(),
            e
        )
    })?;

    let include_patterns = if args.include.is_empty() {
        services.config.indexing.include_patterns.clone()
    } else {
        args.include
    };
    let walker = RecordWalker::new(&include_patterns, services.config.indexing.max_file_size_mb)?;
    let files = walker.collect_records(&path)?;
    if files.is_empty() && format == OutputFormat::Human {
        print_warning(&format!(
            "No record files matching {:?} found in '{}'",
            include_patterns,
            path.display()
        ));
    }

    if format == OutputFormat::Human {
        eprintln!(
            "Indexing {} records from {}...",
            colors::number(&files.len().to_string()),
            colors::file_path(&path.display().to_string())
        );
    }

    let jobs = files
        .iter()
        .map(|file| build_job(file, services, 1, args.download_images))
        .collect::<Result<Vec<_>, _>>()?;

    let runner = services.runner(build_pipeline(services, args.variant.as_deref())?);
    let outcomes = runner.run_all(jobs).await;

    let elapsed = start.elapsed();
    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    let response = IndexFolderResponse {
        path: path.to_string_lossy().into_owned(),
        records_found: files.len(),
        records_indexed: outcomes.len() - failed,
        records_failed: failed,
        documents_written: outcomes.iter().map(|o| o.identifiers.len()).sum(),
        warnings: outcomes.iter().map(|o| o.warnings.len()).sum(),
        duration_secs: elapsed.as_secs_f64(),
        outcomes,
    };

    match format {
        OutputFormat::Human => {
            for outcome in &response.outcomes {
                if !args.quiet || !outcome.is_success() {
                    print_outcome(outcome);
                }
            }
            println!(
                "{} {} records ({} documents, {} warnings, {} failed) in {}",
                colors::success("Indexed"),
                colors::number(&response.records_indexed.to_string()),
                colors::number(&response.documents_written.to_string()),
                colors::number(&response.warnings.to_string()),
                colors::number(&response.records_failed.to_string()),
                colors::number(&format_duration(elapsed))
            );
        }
        OutputFormat::Json => print_json(&response)?,
    }

    Ok(())
}
