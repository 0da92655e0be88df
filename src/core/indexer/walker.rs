//! Record folder scanning.
//!
//! Collects record files from a folder tree for a one-shot indexing
//! run. Data folders that sit next to a record (`{name}_media`,
//! `{name}_fulltext`, ...) belong to that record and are not scanned
//! for records themselves.

use glob::Pattern;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::core::error::{Result, StrataError};

/// Suffixes of per-record data folders
pub const DATA_FOLDER_KINDS: &[&str] = &["media", "fulltext", "alto", "pdf"];

/// Folder walker selecting record files by pattern
pub struct RecordWalker {
    /// Patterns to include (e.g., "*.xml")
    include_patterns: Vec<Pattern>,

    /// Maximum file size in bytes (skip larger files)
    max_file_size_bytes: u64,
}

impl RecordWalker {
    pub fn new(include_patterns: &[String], max_file_size_mb: usize) -> Result<Self> {
        let include = include_patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| {
                    StrataError::ConfigError(format!("Invalid include pattern '{p}': {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            include_patterns: include,
            max_file_size_bytes: (max_file_size_mb as u64) * 1024 * 1024,
        })
    }

    /// Collect matching record files below `root`, sorted by path
    pub fn collect_records(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(StrataError::InvalidPath(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| Self::should_descend(e, root))
        {
            match entry {
                Ok(entry) => {
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    let path = entry.path();

                    if let Ok(metadata) = entry.metadata() {
                        if metadata.len() > self.max_file_size_bytes {
                            tracing::warn!(
                                "Skipping oversized record {:?} ({} bytes)",
                                path,
                                metadata.len()
                            );
                            continue;
                        }
                    }

                    if self.matches(path) {
                        files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    tracing::warn!("Walk error: {}", e);
                }
            }
        }

        files.sort();
        Ok(files)
    }

    /// Skip hidden directories and per-record data folders
    fn should_descend(entry: &DirEntry, root: &Path) -> bool {
        let path = entry.path();
        if path == root || !entry.file_type().is_dir() {
            return true;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return true;
        };
        if name.starts_with('.') {
            return false;
        }
        !DATA_FOLDER_KINDS
            .iter()
            .any(|kind| name.ends_with(&format!("_{kind}")))
    }

    fn matches(&self, path: &Path) -> bool {
        if self.include_patterns.is_empty() {
            return true;
        }
        let Some(name) = path.file_name().and_then(|f| f.to_str()) else {
            return false;
        };
        self.include_patterns.iter().any(|p| p.matches(name))
    }
}

/// Data folders present next to `record` (`{stem}_{kind}`)
pub fn data_folders_for(record: &Path) -> HashMap<String, PathBuf> {
    let mut folders = HashMap::new();
    let (Some(parent), Some(stem)) = (record.parent(), record.file_stem().and_then(|s| s.to_str()))
    else {
        return folders;
    };

    for kind in DATA_FOLDER_KINDS {
        let candidate = parent.join(format!("{stem}_{kind}"));
        if candidate.is_dir() {
            folders.insert((*kind).to_string(), candidate);
        }
    }
    folders
}
