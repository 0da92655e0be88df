//! XDG Base Directory Support
//!
//! Resolves where Strata keeps its configuration, index and write
//! buffers on Linux/Unix systems.

use std::env;
use std::fs;
use std::path::PathBuf;

/// XDG directory structure for Strata
#[derive(Debug, Clone)]
pub struct XdgDirs {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl Default for XdgDirs {
    fn default() -> Self {
        Self::new()
    }
}

impl XdgDirs {
    /// Resolve directories
    ///
    /// Priority order (highest to lowest):
    /// 1. Explicit STRATA_*_DIR env vars
    /// 2. XDG_* environment variables
    /// 3. XDG defaults (~/.config, ~/.local/share, ~/.cache)
    pub fn new() -> Self {
        Self {
            config_dir: resolve("STRATA_CONFIG_DIR", "XDG_CONFIG_HOME", &[".config"]),
            data_dir: resolve("STRATA_DATA_DIR", "XDG_DATA_HOME", &[".local", "share"]),
            cache_dir: resolve("STRATA_CACHE_DIR", "XDG_CACHE_HOME", &[".cache"]),
        }
    }

    /// Get config file path
    pub fn config_file(&self) -> PathBuf {
        if let Ok(file) = env::var("STRATA_CONFIG_FILE") {
            return PathBuf::from(file);
        }
        self.config_dir.join("config.toml")
    }

    /// Default search index directory
    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.join("index")
    }

    /// Default media folder for downloaded page images
    pub fn media_dir(&self) -> PathBuf {
        self.data_dir.join("media")
    }

    /// Default directory for disk-backed write buffers
    pub fn batch_dir(&self) -> PathBuf {
        self.cache_dir.join("batches")
    }

    /// Ensure all directories exist
    pub fn ensure_dirs_exist(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.config_dir)?;
        fs::create_dir_all(self.index_dir())?;
        fs::create_dir_all(self.batch_dir())?;
        Ok(())
    }

    /// Log resolved paths
    pub fn log_paths(&self) {
        tracing::debug!("XDG directories:");
        tracing::debug!("  Config: {}", self.config_dir.display());
        tracing::debug!("  Data:   {}", self.data_dir.display());
        tracing::debug!("  Cache:  {}", self.cache_dir.display());
    }
}

fn resolve(strata_var: &str, xdg_var: &str, default: &[&str]) -> PathBuf {
    if let Ok(dir) = env::var(strata_var) {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = env::var(xdg_var) {
        return PathBuf::from(xdg).join("strata");
    }
    let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    for segment in default {
        path.push(segment);
    }
    path.join("strata")
}
