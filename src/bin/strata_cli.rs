//! Strata CLI - index metadata records from the command line
//!
//! # Examples
//!
//! ```bash
//! # Index one record, detecting its format
//! strata index /data/PPN123456789.xml
//!
//! # Index a folder of records with a fixed variant
//! strata index-folder /data/hotfolder --variant mets-marc
//!
//! # Inspect a record and its structure
//! strata show-record PPN123456789 --tree
//!
//! # Show configuration
//! strata show-config
//! ```

use clap::Parser;
use strata::cli::output::print_error;
use strata::cli::{run, Cli};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "strata=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so stdout stays clean for command output
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    if let Err(e) = run(cli).await {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}
