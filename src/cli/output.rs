//! Terminal output for CLI commands
//!
//! Human output is colored through `colored`, which honours NO_COLOR.
//! JSON output is pretty-printed to stdout; warnings and errors go to
//! stderr so they never mix with it.

use crate::core::types::IndexOutcome;
use serde::Serialize;
use std::time::Duration;

/// Styles shared by all commands
pub mod colors {
    use colored::{ColoredString, Colorize};

    pub fn label(s: &str) -> ColoredString {
        s.bold()
    }

    /// Persistent identifiers
    pub fn identifier(s: &str) -> ColoredString {
        s.cyan()
    }

    pub fn file_path(s: &str) -> ColoredString {
        s.blue()
    }

    /// Counts and timings
    pub fn number(s: &str) -> ColoredString {
        s.yellow()
    }

    pub fn success(s: &str) -> ColoredString {
        s.green()
    }

    pub fn warning(s: &str) -> ColoredString {
        s.yellow().italic()
    }

    pub fn error(s: &str) -> ColoredString {
        s.red().bold()
    }

    pub fn dim(s: &str) -> ColoredString {
        s.dimmed()
    }

    /// Schema kinds and document kinds
    pub fn kind(s: &str) -> ColoredString {
        s.magenta()
    }
}

/// Short human form of a duration: `850ms`, `3.20s`, `2m 5.0s`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 1.0 {
        return format!("{}ms", duration.as_millis());
    }
    if secs < 60.0 {
        return format!("{secs:.2}s");
    }
    let mins = duration.as_secs() / 60;
    format!("{mins}m {:.1}s", secs - (mins * 60) as f64)
}

/// Pretty-print `data` as JSON on stdout
pub fn print_json<T: Serialize>(data: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

/// One line per job, plus its anchor link and warnings
pub fn print_outcome(outcome: &IndexOutcome) {
    let file = outcome.file_path.display().to_string();
    if let Some(error) = &outcome.error {
        println!(
            "{} {}: {}",
            colors::error("Failed"),
            colors::file_path(&file),
            error
        );
        return;
    }

    let root = outcome.identifiers.first().map(String::as_str).unwrap_or("-");
    println!(
        "{} {} as {} ({}, {} documents, {})",
        colors::success("Indexed"),
        colors::file_path(&file),
        colors::identifier(root),
        colors::kind(outcome.schema_kind.as_deref().unwrap_or("?")),
        colors::number(&outcome.identifiers.len().to_string()),
        colors::dim(&format_duration(Duration::from_millis(outcome.duration_ms)))
    );
    if let Some(anchor) = &outcome.anchor {
        println!(
            "  {} {} (via {})",
            colors::label("Volume of"),
            colors::identifier(&anchor.anchor_identifier),
            colors::dim(&anchor.source)
        );
    }
    for warning in &outcome.warnings {
        println!("  {}: {}", colors::warning("Warning"), warning);
    }
}

pub fn print_warning(message: &str) {
    eprintln!("{}: {}", colors::warning("Warning"), message);
}

pub fn print_error(message: &str) {
    eprintln!("{}: {}", colors::error("Error"), message);
}

pub fn print_header(title: &str) {
    println!("{}", colors::label(title));
}
