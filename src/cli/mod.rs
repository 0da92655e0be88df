//! CLI adapter for Strata
//!
//! Provides the command-line interface for indexing metadata records
//! and inspecting the resulting index. Depends on `core/` only.
//!
//! # Architecture
//!
//! ```text
//!              +------------------+
//!              |     core/        |
//!              |  (domain logic)  |
//!              +--------+---------+
//!                       |
//!                       v
//!              +------------------+
//!              |      cli/        |
//!              | (clap adapter)   |
//!              +------------------+
//! ```

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

/// Strata - Format-Polymorphic Metadata Indexer
///
/// Index METS/MODS, METS/MARC, EAD, EAD3, LIDO and Dublin Core records
/// into a search index, one document per work, section and page.
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(author = "Strata Developers")]
#[command(version)]
#[command(about = "Metadata record indexer", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub format: OutputFormat,

    /// Write logs as JSON lines to stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON output for scripting
    Json,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index a single record file
    Index(commands::IndexArgs),

    /// Index every record below a folder
    #[command(name = "index-folder")]
    IndexFolder(commands::IndexFolderArgs),

    /// Show an indexed record and its structure
    #[command(name = "show-record")]
    ShowRecord(commands::record::ShowArgs),

    /// Delete a record and all its sections and pages from the index
    #[command(name = "delete-record")]
    DeleteRecord(commands::record::DeleteArgs),

    /// List the available format variants
    #[command(name = "list-formats")]
    ListFormats(commands::FormatsArgs),

    /// Show current configuration
    #[command(name = "show-config")]
    ShowConfig(commands::ConfigArgs),

    /// Generate shell completion scripts
    ///
    /// Output completion script to stdout. To install:
    ///
    ///   bash:  strata completions bash > ~/.local/share/bash-completion/completions/strata
    ///   zsh:   strata completions zsh > ~/.zfunc/_strata
    ///   fish:  strata completions fish > ~/.config/fish/completions/strata.fish
    Completions(commands::CompletionsArgs),
}

/// Run the CLI with the provided arguments
pub async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    use crate::core::config::Config;
    use crate::core::services::Services;
    use crate::core::xdg::XdgDirs;
    use std::sync::Arc;

    // Handle completions command early (doesn't need services)
    let command = match cli.command {
        Commands::Completions(args) => return commands::completions::execute(args),
        command => command,
    };

    // Initialize XDG directories
    let xdg = XdgDirs::new();
    xdg.ensure_dirs_exist()?;
    xdg.log_paths();

    // Load configuration
    let config = Config::load_with_xdg(&xdg)?;
    config.log_config();

    // list-formats and show-config do not open the index
    match command {
        Commands::ListFormats(args) => {
            return commands::formats::execute(args, &config, cli.format)
        }
        Commands::ShowConfig(args) => {
            return commands::config::execute(args, &config, &xdg, cli.format)
        }
        command => {
            let services = Arc::new(Services::new(config)?);
            match command {
                Commands::Index(args) => commands::index::execute(args, &services, cli.format).await,
                Commands::IndexFolder(args) => {
                    commands::index_folder::execute(args, &services, cli.format).await
                }
                Commands::ShowRecord(args) => {
                    commands::record::execute_show(args, &services, cli.format).await
                }
                Commands::DeleteRecord(args) => {
                    commands::record::execute_delete(args, &services, cli.format).await
                }
                Commands::ListFormats(_) | Commands::ShowConfig(_) | Commands::Completions(_) => {
                    unreachable!() // Handled above
                }
            }
        }
    }
}
