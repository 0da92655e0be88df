//! List-formats command - show the available format variants

use crate::cli::output::{colors, print_header, print_json};
use crate::cli::OutputFormat;
use crate::core::config::Config;
use crate::core::variant::{FormatRegistry, RootPathRule};
use clap::Args;
use serde::Serialize;

/// Arguments for the list-formats command
#[derive(Args, Debug)]
pub struct FormatsArgs {
    /// Also list anchor candidates and namespace bindings
    #[arg(long, short = 'a')]
    pub all: bool,
}

/// One variant in the listing
#[derive(Debug, Serialize)]
pub struct FormatInfo {
    pub name: String,
    pub schema_kind: String,
    pub root_elements: Vec<String>,
    pub anchor_candidates: Vec<String>,
    pub root_path: bool,
    pub namespaces: Vec<(String, String)>,
}

/// List-formats response
#[derive(Debug, Serialize)]
pub struct FormatsResponse {
    pub default_variant: String,
    pub formats: Vec<FormatInfo>,
}

/// Execute the list-formats command
pub fn execute(
    args: FormatsArgs,
    config: &Config,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = FormatRegistry::new(&config.namespace_table())?;

    let response = FormatsResponse {
        default_variant: config.indexing.default_variant.clone(),
        formats: registry
            .iter()
            .map(|variant| {
                let definition = variant.definition();
                FormatInfo {
                    name: variant.name().to_string(),
                    schema_kind: variant.kind().as_str().to_string(),
                    root_elements: definition.root_elements.clone(),
                    anchor_candidates: definition
                        .anchor_candidates
                        .iter()
                        .map(|c| c.name.clone())
                        .collect(),
                    root_path: variant.root_path_rule() == RootPathRule::Collection,
                    namespaces: variant
                        .namespaces()
                        .iter()
                        .map(|(prefix, uri)| (prefix.to_string(), uri.to_string()))
                        .collect(),
                }
            })
            .collect(),
    };

    match format {
        OutputFormat::Human => {
            print_header(&format!("Formats ({}):", response.formats.len()));
            for info in &response.formats {
                let marker = if info.name == response.default_variant {
                    colors::dim(" (default)")
                } else {
                    colors::dim("")
                };
                println!(
                    "  {:<12} {:<12} {}{}",
                    colors::identifier(&info.name),
                    colors::kind(&info.schema_kind),
                    info.root_elements.join(", "),
                    marker
                );
                if args.all {
                    if !info.anchor_candidates.is_empty() {
                        println!(
                            "    {}: {}",
                            colors::label("anchors"),
                            info.anchor_candidates.join(" > ")
                        );
                    }
                    if !info.root_path {
                        println!("    {}: {}", colors::label("root path"), colors::dim("none"));
                    }
                    for (prefix, uri) in &info.namespaces {
                        println!("    {}: {}", colors::dim(prefix), uri);
                    }
                }
            }
        }
        OutputFormat::Json => print_json(&response)?,
    }

    Ok(())
}
