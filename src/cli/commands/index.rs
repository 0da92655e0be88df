//! Index command - index a single record file

use crate::cli::output::{colors, print_json, print_outcome};
use crate::cli::OutputFormat;
use crate::core::indexer::{data_folders_for, IndexerPipeline};
use crate::core::services::Services;
use crate::core::types::IndexJob;
use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Arguments for the index command
#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Path to the record file
    pub path: PathBuf,

    /// Read the record with this variant instead of detecting it
    #[arg(long, short = 'v')]
    pub variant: Option<String>,

    /// Order number of the first page
    #[arg(long, default_value = "1")]
    pub page_start: u32,

    /// Download externally hosted page images into the media folder
    #[arg(long)]
    pub download_images: bool,

    /// Mark the job as coming from the re-index queue
    #[arg(long)]
    pub reindex: bool,
}

/// Build a job for `path`, attaching its data folders
///
/// When images are to be downloaded and the record has no media folder
/// of its own, one is created under the configured media directory.
pub(crate) fn build_job(
    path: &Path,
    services: &Services,
    page_start: u32,
    download_images: bool,
) -> Result<IndexJob, Box<dyn std::error::Error>> {
    let mut job = IndexJob::new(path)
        .with_page_count_start(page_start)
        .with_external_images(download_images);
    job.data_folders = data_folders_for(path);

    if download_images && !job.data_folders.contains_key("media") {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| format!("Record path '{}' has no file name", path.display()))?;
        let media = services.config.storage.media_dir.join(stem);
        std::fs::create_dir_all(&media)?;
        job = job.with_data_folder("media", media);
    }
    Ok(job)
}

/// Pipeline for the command, optionally pinned to one variant
pub(crate) fn build_pipeline(
    services: &Services,
    variant: Option<&str>,
) -> Result<IndexerPipeline, Box<dyn std::error::Error>> {
    let pipeline = services.pipeline();
    match variant {
        Some(name) => Ok(pipeline.with_variant(name).map_err(|e| {
            format!(
                "{e}. Run 'strata list-formats' to see available variants."
            )
        })?),
        None => Ok(pipeline),
    }
}

/// Execute the index command
pub async fn execute(
    args: IndexArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    // Validate path
    let path = args.path.canonicalize().map_err(|e| {
        format!(
            "Invalid path '{}': {}. Make sure the file exists and is accessible.",
            args.path.display(),
            e
        )
    })?;
    if !path.is_file() {
        return Err(format!(
            "Path '{}' is not a file. Use 'strata index-folder' to index a folder.",
            path.display()
        )
        .into());
    }

    let mut job = build_job(&path, services, args.page_start, args.download_images)?;
    job.from_reindex_queue = args.reindex;

    if format == OutputFormat::Human {
        eprintln!(
            "Indexing {}...",
            colors::file_path(&path.display().to_string())
        );
    }

    let runner = services.runner(build_pipeline(services, args.variant.as_deref())?);
    let outcome = runner.run(job).await;

    match format {
        OutputFormat::Human => print_outcome(&outcome),
        OutputFormat::Json => print_json(&outcome)?,
    }

    match &outcome.error {
        Some(error) => Err(error.clone().into()),
        None => Ok(()),
    }
}
