//! Tests for CLI output formatting helpers
//!
//! Tests the output formatting utilities:
//! - Duration formatting (ms, s, m)
//! - Outcome printing for successful and failed jobs
//! - Shell completion scripts

use clap_complete::Shell;
use std::path::PathBuf;
use std::time::Duration;
use strata::cli::commands::completions::write_completions;
use strata::cli::output::{format_duration, print_outcome};
use strata::core::types::{AnchorLink, IndexOutcome, IndexWarning, WarningKind};

// =============================================================================
// format_duration tests
// =============================================================================

/// Test duration formatting with various times
#[test]
fn test_format_duration_various_times() {
    // Milliseconds (under 1 second)
    assert_eq!(format_duration(Duration::from_millis(100)), "100ms");
    assert_eq!(format_duration(Duration::from_micros(999_400)), "999ms");

    // Seconds
    assert_eq!(format_duration(Duration::from_secs(1)), "1.00s");
    assert_eq!(format_duration(Duration::from_millis(30_250)), "30.25s");

    // Minutes
    assert_eq!(format_duration(Duration::from_secs(60)), "1m 0.0s");
    assert_eq!(format_duration(Duration::from_secs(150)), "2m 30.0s");
}

/// Test duration formatting at the unit boundaries
#[test]
fn test_format_duration_boundaries() {
    assert_eq!(format_duration(Duration::ZERO), "0ms");
    assert!(format_duration(Duration::from_millis(999)).ends_with("ms"));
    assert!(!format_duration(Duration::from_millis(59_900)).contains('m'));
    assert!(format_duration(Duration::from_secs(60)).contains('m'));
}

// =============================================================================
// print_outcome tests
// =============================================================================

/// Printing never panics, whatever the outcome holds
#[test]
fn test_print_outcome_variants() {
    let mut indexed = IndexOutcome::new(PathBuf::from("/records/PPN100_V1.xml"));
    indexed.identifiers = vec!["PPN100_V1".to_string(), "PPN100_V1_PAGE_1".to_string()];
    indexed.schema_kind = Some("METS".to_string());
    indexed.anchor = Some(AnchorLink {
        child_identifier: "PPN100_V1".to_string(),
        anchor_identifier: "PPN100".to_string(),
        source: "mods:relatedItem[@type='host']".to_string(),
    });
    indexed.warnings.push(IndexWarning::new(
        WarningKind::Structure,
        Some("LOG_9".to_string()),
        "section without identifier, node skipped",
    ));
    print_outcome(&indexed);

    let mut failed = IndexOutcome::new(PathBuf::from("/records/broken.xml"));
    failed.error = Some("Malformed XML".to_string());
    assert!(!failed.is_success());
    print_outcome(&failed);

    // An outcome with no identifiers still prints
    print_outcome(&IndexOutcome::new(PathBuf::from("/records/empty.xml")));
}

// =============================================================================
// completions tests
// =============================================================================

/// Test completion scripts list the subcommands
#[test]
fn test_completions_list_subcommands() {
    for shell in [Shell::Bash, Shell::Zsh, Shell::Fish] {
        let mut out = Vec::new();
        write_completions(shell, &mut out).unwrap();

        let script = String::from_utf8(out).unwrap();
        assert!(script.contains("strata"), "{shell:?}");
        assert!(script.contains("index-folder"), "{shell:?}");
        assert!(script.contains("show-record"), "{shell:?}");
    }
}
