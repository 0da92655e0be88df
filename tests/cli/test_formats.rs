//! Tests for list-formats and show-config CLI commands
//!
//! Neither command opens the index, so they take the configuration
//! directly.

use strata::cli::commands::config::{self as config_cmd, ConfigArgs};
use strata::cli::commands::formats::{self, FormatsArgs};
use strata::cli::OutputFormat;
use strata::core::config::Config;
use strata::core::xdg::XdgDirs;
use tempfile::TempDir;

fn test_xdg(temp: &TempDir) -> XdgDirs {
    XdgDirs {
        config_dir: temp.path().join("config"),
        data_dir: temp.path().join("data"),
        cache_dir: temp.path().join("cache"),
    }
}

/// Test listing formats in both output formats
#[test]
fn test_list_formats() {
    let config = Config::default();

    for format in [OutputFormat::Human, OutputFormat::Json] {
        for all in [false, true] {
            let result = formats::execute(FormatsArgs { all }, &config, format);
            assert!(result.is_ok(), "list-formats failed: {:?}", result.err());
        }
    }
}

/// Test configured namespace bindings feed the listed variants
#[test]
fn test_list_formats_with_custom_namespaces() {
    let mut config = Config::default();
    config.namespaces.bind("mods", "http://www.loc.gov/mods/v3");

    assert!(formats::execute(FormatsArgs { all: true }, &config, OutputFormat::Json).is_ok());
}

/// Test showing the configuration
#[test]
fn test_show_config() {
    let temp = TempDir::new().unwrap();
    let xdg = test_xdg(&temp);
    let mut config = Config::default();
    config.storage.index_dir = xdg.index_dir();

    for format in [OutputFormat::Human, OutputFormat::Json] {
        for all in [false, true] {
            let result = config_cmd::execute(ConfigArgs { all }, &config, &xdg, format);
            assert!(result.is_ok(), "show-config failed: {:?}", result.err());
        }
    }

    // Showing the configuration creates nothing
    assert!(!xdg.index_dir().exists());
}
