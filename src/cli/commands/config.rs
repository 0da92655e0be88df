//! Config command - show current configuration

use crate::cli::output::{print_header, print_json};
use crate::cli::OutputFormat;
use crate::core::config::Config;
use crate::core::xdg::XdgDirs;
use clap::Args;
use serde::Serialize;

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Show the full namespace table, not only configured overrides
    #[arg(long, short = 'a')]
    pub all: bool,
}

/// Configuration response
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub config_file: String,
    pub cache_dir: String,
    #[serde(flatten)]
    pub config: Config,
}

/// Execute the config command
pub fn execute(
    args: ConfigArgs,
    config: &Config,
    xdg: &XdgDirs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut shown = config.clone();
    if args.all {
        shown.namespaces = config.namespace_table();
    }

    let response = ConfigResponse {
        config_file: xdg.config_file().to_string_lossy().into_owned(),
        cache_dir: xdg.cache_dir.to_string_lossy().into_owned(),
        config: shown,
    };

    match format {
        OutputFormat::Human => {
            let c = &response.config;
            print_header("Configuration:");
            println!("  config_file: {}", response.config_file);
            println!("  cache_dir: {}", response.cache_dir);
            println!("  indexing:");
            println!("    default_variant: {}", c.indexing.default_variant);
            println!("    default_collection: {}", c.indexing.default_collection);
            println!("    collection_separator: {:?}", c.indexing.collection_separator);
            println!("    max_file_size_mb: {}", c.indexing.max_file_size_mb);
            println!("    include_patterns: {:?}", c.indexing.include_patterns);
            println!("  write:");
            println!("    disk_threshold_bytes: {}", c.write.disk_threshold_bytes);
            match &c.write.temp_dir {
                Some(dir) => println!("    temp_dir: {}", dir.display()),
                None => println!("    temp_dir: (system default)"),
            }
            println!("  storage:");
            println!("    index_dir: {}", c.storage.index_dir.display());
            println!("    media_dir: {}", c.storage.media_dir.display());
            println!("  limits:");
            println!("    max_concurrent_jobs: {}", c.limits.max_concurrent_jobs);
            println!("    fetch_timeout_sec: {}", c.limits.fetch_timeout_sec);
            println!("  namespaces:");
            for (prefix, uri) in c.namespaces.iter() {
                println!("    {prefix}: {uri}");
            }
        }
        OutputFormat::Json => print_json(&response)?,
    }

    Ok(())
}
