//! Record commands - show and delete indexed records
//!
//! - `show-record`: one record, optionally with its full structure
//! - `delete-record`: a record with all its sections and pages

use crate::cli::output::{colors, print_json};
use crate::cli::OutputFormat;
use crate::core::services::Services;
use crate::core::storage::TantivyIndex;
use crate::core::types::{field, IndexDocument, StructuralDocument};
use clap::Args;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::{Arc, MutexGuard};

/// Arguments for show-record
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Record identifier
    pub pi: String,

    /// Print the full section and page tree
    #[arg(long, short = 't')]
    pub tree: bool,
}

/// Arguments for delete-record
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Record identifier
    pub pi: String,

    /// Skip confirmation prompt
    #[arg(long, short = 'f')]
    pub force: bool,
}

/// Show-record response
#[derive(Debug, Serialize)]
pub struct ShowRecordResponse {
    pub record: IndexDocument,
    /// Volumes of this record, when it is an anchor
    pub volumes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree: Option<StructuralDocument>,
}

fn lock_index(services: &Services) -> Result<MutexGuard<'_, TantivyIndex>, Box<dyn std::error::Error>> {
    services
        .index
        .lock()
        .map_err(|e| format!("Search index is unavailable: {e}").into())
}

fn not_found(pi: &str) -> Box<dyn std::error::Error> {
    format!("Record '{pi}' not found. Index it with 'strata index <file>' first.").into()
}

/// Execute show-record command
pub async fn execute_show(
    args: ShowArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let response = {
        let index = lock_index(services)?;
        let record = index.get(&args.pi)?.ok_or_else(|| not_found(&args.pi))?;
        let volumes = index
            .volumes_of(&args.pi)?
            .into_iter()
            .map(|v| v.identifier)
            .collect();
        let tree = if args.tree {
            Some(index.load_tree(&args.pi)?)
        } else {
            None
        };
        ShowRecordResponse {
            record,
            volumes,
            tree,
        }
    };

    match format {
        OutputFormat::Human => {
            let record = &response.record;
            println!(
                "{}: {}",
                colors::label("Record"),
                colors::identifier(&record.identifier)
            );
            println!("  {}: {}", colors::label("Kind"), colors::kind(record.kind.as_str()));
            if let Some(schema_kind) = record.field(field::SCHEMA_KIND) {
                println!("  {}: {}", colors::label("Schema"), colors::kind(schema_kind));
            }
            if let Some(parent) = &record.parent {
                println!("  {}: {}", colors::label("Parent"), colors::identifier(parent));
            }
            if let Some(anchor) = &record.anchor_identifier {
                println!("  {}: {}", colors::label("Anchor"), colors::identifier(anchor));
            }
            for (name, values) in &record.fields {
                if name == field::SCHEMA_KIND {
                    continue;
                }
                println!("  {}: {}", colors::label(name), values.join(" | "));
            }
            if !response.volumes.is_empty() {
                println!(
                    "  {} ({}):",
                    colors::label("Volumes"),
                    colors::number(&response.volumes.len().to_string())
                );
                for volume in &response.volumes {
                    println!("    {}", colors::identifier(volume));
                }
            }
            if let Some(tree) = &response.tree {
                println!("  {}:", colors::label("Structure"));
                print_tree(tree, 2);
            }
        }
        OutputFormat::Json => print_json(&response)?,
    }

    Ok(())
}

fn print_tree(node: &StructuralDocument, depth: usize) {
    let label = node
        .field(field::LABEL)
        .or_else(|| node.field(field::TITLE))
        .unwrap_or("");
    println!(
        "{}{} {} {}",
        "  ".repeat(depth),
        colors::identifier(&node.identifier),
        colors::dim(node.kind.as_str()),
        label
    );
    for child in &node.children {
        print_tree(child, depth + 1);
    }
}

/// Execute delete-record command
pub async fn execute_delete(
    args: DeleteArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    if lock_index(services)?.get(&args.pi)?.is_none() {
        return Err(not_found(&args.pi));
    }

    // Confirmation prompt unless --force
    if !args.force {
        print!(
            "Delete record '{}' with all sections and pages? [y/N] ",
            colors::identifier(&args.pi)
        );
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("{}", colors::dim("Cancelled."));
            return Ok(());
        }
    }

    let deleted = match lock_index(services)?.delete_record(&args.pi) {
        Ok(deleted) => deleted,
        Err(e) if e.is_not_found() => return Err(not_found(&args.pi)),
        Err(e) => return Err(e.into()),
    };

    match format {
        OutputFormat::Human => {
            println!(
                "{} record '{}' ({} documents)",
                colors::success("Deleted"),
                colors::identifier(&args.pi),
                colors::number(&deleted.to_string())
            );
        }
        OutputFormat::Json => {
            let response = serde_json::json!({
                "deleted": true,
                "pi": args.pi,
                "documents": deleted
            });
            print_json(&response)?;
        }
    }

    Ok(())
}
