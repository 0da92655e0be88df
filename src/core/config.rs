//! Configuration management for the Strata indexer.
//!
//! This module handles loading configuration from TOML files and
//! environment variables, with sensible defaults for all settings.

use crate::core::error::{Result, StrataError};
use crate::core::source::NamespaceTable;
use crate::core::xdg::XdgDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub write: WriteConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Base namespace table; bindings here override the built-in ones
    #[serde(default)]
    pub namespaces: NamespaceTable,
}

/// Indexing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexingConfig {
    /// Variant used when a record's format cannot be detected
    #[serde(default = "default_variant")]
    pub default_variant: String,

    /// Collection assigned to records without one
    #[serde(default = "default_collection")]
    pub default_collection: String,

    /// Separator between collection path levels
    #[serde(default = "default_collection_separator")]
    pub collection_separator: String,

    /// Maximum record file size in MB (skip larger files)
    #[serde(default = "default_max_file_size")]
    pub max_file_size_mb: usize,

    /// Record file patterns for folder scans (glob syntax)
    #[serde(default = "default_include_patterns")]
    pub include_patterns: Vec<String>,
}

/// Write buffer configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WriteConfig {
    /// Estimated tree size at which buffers move to disk
    #[serde(default = "default_disk_threshold")]
    pub disk_threshold_bytes: usize,

    /// Directory for disk-backed buffers (system temp dir when unset)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory of the search index
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,

    /// Folder for downloaded page images
    #[serde(default = "default_media_dir")]
    pub media_dir: PathBuf,
}

/// Limits configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    /// Maximum indexing jobs running at once
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Timeout for remote fetches in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_sec: u64,
}

// Default value functions
fn default_variant() -> String {
    "mets".to_string()
}

fn default_collection() -> String {
    "unsorted".to_string()
}

fn default_collection_separator() -> String {
    ".".to_string()
}

fn default_max_file_size() -> usize {
    200
}

fn default_include_patterns() -> Vec<String> {
    vec!["*.xml".to_string()]
}

fn default_disk_threshold() -> usize {
    // 8 MiB of estimated document content
    8 * 1024 * 1024
}

fn default_index_dir() -> PathBuf {
    PathBuf::from("./data/index")
}

fn default_media_dir() -> PathBuf {
    PathBuf::from("./data/media")
}

fn default_max_concurrent_jobs() -> usize {
    4
}

fn default_fetch_timeout() -> u64 {
    30
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            default_variant: default_variant(),
            default_collection: default_collection(),
            collection_separator: default_collection_separator(),
            max_file_size_mb: default_max_file_size(),
            include_patterns: default_include_patterns(),
        }
    }
}

impl Default for WriteConfig {
    fn default() -> Self {
        Self {
            disk_threshold_bytes: default_disk_threshold(),
            temp_dir: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            index_dir: default_index_dir(),
            media_dir: default_media_dir(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_concurrent_jobs(),
            fetch_timeout_sec: default_fetch_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| StrataError::ConfigError(format!("Failed to read config file: {e}")))?;

        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load config with priority: env vars > TOML > defaults
    pub fn load() -> Result<Self> {
        let xdg = XdgDirs::new();
        Self::load_with_xdg(&xdg)
    }

    /// Load config with explicit XDG directories
    ///
    /// Priority order:
    /// 1. STRATA_CONFIG env var
    /// 2. XDG config file (~/.config/strata/config.toml)
    /// 3. ./strata.toml
    /// 4. Defaults
    pub fn load_with_xdg(xdg: &XdgDirs) -> Result<Self> {
        let mut config = if let Ok(config_path) = env::var("STRATA_CONFIG") {
            Self::from_file(config_path)?
        } else {
            let xdg_config = xdg.config_file();
            if xdg_config.exists() {
                Self::from_file(xdg_config)?
            } else if Path::new("strata.toml").exists() {
                Self::from_file("strata.toml")?
            } else {
                Self::default()
            }
        };

        // Default locations move under the XDG data directory
        if config.storage.index_dir == default_index_dir() {
            config.storage.index_dir = xdg.index_dir();
        }
        if config.storage.media_dir == default_media_dir() {
            config.storage.media_dir = xdg.media_dir();
        }
        if config.write.temp_dir.is_none() {
            config.write.temp_dir = Some(xdg.batch_dir());
        }

        config.merge_env();
        config.validate()?;

        Ok(config)
    }

    /// Merge configuration with environment variables
    pub fn merge_env(&mut self) {
        // Indexing configuration
        if let Ok(variant) = env::var("STRATA_DEFAULT_VARIANT") {
            self.indexing.default_variant = variant;
        }
        if let Ok(collection) = env::var("STRATA_DEFAULT_COLLECTION") {
            self.indexing.default_collection = collection;
        }
        if let Ok(max_size) = env::var("STRATA_MAX_FILE_SIZE_MB") {
            if let Ok(size) = max_size.parse() {
                self.indexing.max_file_size_mb = size;
            }
        }

        // Write configuration
        if let Ok(threshold) = env::var("STRATA_DISK_THRESHOLD_BYTES") {
            if let Ok(t) = threshold.parse() {
                self.write.disk_threshold_bytes = t;
            }
        }
        if let Ok(dir) = env::var("STRATA_TEMP_DIR") {
            self.write.temp_dir = Some(PathBuf::from(dir));
        }

        // Storage configuration
        if let Ok(dir) = env::var("STRATA_INDEX_DIR") {
            self.storage.index_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = env::var("STRATA_MEDIA_DIR") {
            self.storage.media_dir = PathBuf::from(dir);
        }

        // Limits configuration
        if let Ok(max_jobs) = env::var("STRATA_MAX_CONCURRENT_JOBS") {
            if let Ok(max) = max_jobs.parse() {
                self.limits.max_concurrent_jobs = max;
            }
        }
        if let Ok(timeout) = env::var("STRATA_FETCH_TIMEOUT_SEC") {
            if let Ok(t) = timeout.parse() {
                self.limits.fetch_timeout_sec = t;
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.indexing.default_variant.trim().is_empty() {
            return Err(StrataError::ConfigError(
                "Default variant must be set".to_string(),
            ));
        }

        if self.indexing.max_file_size_mb == 0 {
            return Err(StrataError::ConfigError(
                "Max file size must be non-zero".to_string(),
            ));
        }

        if self.indexing.include_patterns.is_empty() {
            return Err(StrataError::ConfigError(
                "At least one include pattern is required".to_string(),
            ));
        }

        if self.write.disk_threshold_bytes == 0 {
            return Err(StrataError::ConfigError(
                "Disk threshold must be non-zero".to_string(),
            ));
        }

        if self.limits.max_concurrent_jobs == 0 {
            return Err(StrataError::ConfigError(
                "Max concurrent jobs must be non-zero".to_string(),
            ));
        }

        if self.limits.fetch_timeout_sec == 0 {
            return Err(StrataError::ConfigError(
                "Fetch timeout must be non-zero".to_string(),
            ));
        }

        if let Some((prefix, _)) = self.namespaces.iter().find(|(_, uri)| uri.trim().is_empty()) {
            return Err(StrataError::ConfigError(format!(
                "Namespace prefix '{prefix}' is bound to an empty URI"
            )));
        }

        Ok(())
    }

    /// Base namespace table: built-in bindings overlaid with `[namespaces]`
    pub fn namespace_table(&self) -> NamespaceTable {
        NamespaceTable::standard().overlay(&self.namespaces)
    }

    /// Log configuration
    pub fn log_config(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Default variant: {}", self.indexing.default_variant);
        tracing::info!("  Default collection: {}", self.indexing.default_collection);
        tracing::info!("  Max file size: {} MB", self.indexing.max_file_size_mb);
        tracing::info!(
            "  Disk threshold: {} bytes",
            self.write.disk_threshold_bytes
        );
        tracing::info!("  Index dir: {:?}", self.storage.index_dir);
        tracing::info!("  Media dir: {:?}", self.storage.media_dir);
        tracing::info!("  Max concurrent jobs: {}", self.limits.max_concurrent_jobs);
        tracing::info!("  Fetch timeout: {}s", self.limits.fetch_timeout_sec);
        tracing::info!("  Namespace overrides: {}", self.namespaces.len());
    }
}
