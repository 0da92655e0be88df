//! Buffered write strategies.
//!
//! A strategy holds the documents produced for one job and commits them
//! to an [`IndexClient`] in one batch. Small trees stay in memory;
//! trees at or above the configured threshold are spooled to a
//! temporary JSON-lines file and streamed back on commit.
//!
//! Both strategies keep parent-before-children order, release their
//! buffers on `discard()` and on drop, and commit all-or-nothing: any
//! failure rolls the client back and is reported as one
//! [`StrataError::CommitError`].

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::core::error::{Result, StrataError};
use crate::core::types::{IndexDocument, StructuralDocument};

/// Search index operations needed to commit a batch
pub trait IndexClient: Send {
    /// Insert or replace the document with the same identifier
    fn upsert(&mut self, doc: &IndexDocument) -> Result<()>;

    /// Remove one document by identifier
    fn delete(&mut self, identifier: &str) -> Result<()>;

    /// Remove every document of the record rooted at `root`
    fn delete_tree(&mut self, root: &str) -> Result<()> {
        self.delete(root)
    }

    /// Make staged operations visible
    fn commit(&mut self) -> Result<()>;

    /// Drop staged operations
    fn rollback(&mut self) -> Result<()>;
}

/// Backing storage of a write buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    Memory,
    Disk,
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteMode::Memory => f.write_str("memory"),
            WriteMode::Disk => f.write_str("disk"),
        }
    }
}

/// Buffers one job's documents and commits them as a batch
pub trait WriteStrategy: Send {
    /// Queue a tree; parents are queued before their children
    fn add(&mut self, tree: StructuralDocument) -> Result<()>;

    /// Write every queued document, returning the number written
    ///
    /// The buffer is released whether or not the commit succeeds.
    fn commit(&mut self, client: &mut dyn IndexClient) -> Result<usize>;

    /// Release all buffered documents and temporary files
    fn discard(&mut self);

    fn mode(&self) -> WriteMode;

    /// Number of queued documents
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pick a strategy from the estimated size of a tree
pub fn select_strategy(
    estimated_size: usize,
    threshold: usize,
    temp_dir: Option<&Path>,
) -> Result<Box<dyn WriteStrategy>> {
    if estimated_size >= threshold {
        debug!(
            "Estimated size {} >= threshold {}, buffering on disk",
            estimated_size, threshold
        );
        Ok(Box::new(DiskWriteStrategy::new(temp_dir)?))
    } else {
        Ok(Box::new(MemoryWriteStrategy::new()))
    }
}

/// Upsert `docs` in order and commit, rolling back on any failure
fn commit_batch<I>(client: &mut dyn IndexClient, docs: I) -> Result<usize>
where
    I: IntoIterator<Item = Result<IndexDocument>>,
{
    let mut written = 0;
    let result = (|| -> Result<()> {
        for doc in docs {
            let doc = doc?;
            if doc.parent.is_none() {
                client.delete_tree(&doc.identifier)?;
            }
            client.upsert(&doc)?;
            written += 1;
        }
        client.commit()
    })();

    match result {
        Ok(()) => Ok(written),
        Err(e) => {
            if let Err(rollback) = client.rollback() {
                warn!("Rollback after failed commit also failed: {}", rollback);
            }
            Err(StrataError::CommitError(format!(
                "batch aborted after {written} documents: {e}"
            )))
        }
    }
}

fn check_unique(seen: &mut HashSet<String>, identifier: &str) -> Result<()> {
    if !seen.insert(identifier.to_string()) {
        return Err(StrataError::StorageError(format!(
            "duplicate identifier '{identifier}' in write batch"
        )));
    }
    Ok(())
}

/// Keeps the batch in memory
#[derive(Debug, Default)]
pub struct MemoryWriteStrategy {
    docs: Vec<IndexDocument>,
    seen: HashSet<String>,
}

impl MemoryWriteStrategy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WriteStrategy for MemoryWriteStrategy {
    fn add(&mut self, tree: StructuralDocument) -> Result<()> {
        for doc in tree.flatten() {
            check_unique(&mut self.seen, &doc.identifier)?;
            self.docs.push(doc);
        }
        Ok(())
    }

    fn commit(&mut self, client: &mut dyn IndexClient) -> Result<usize> {
        let docs = std::mem::take(&mut self.docs);
        self.discard();
        commit_batch(client, docs.into_iter().map(Ok))
    }

    fn discard(&mut self) {
        self.docs = Vec::new();
        self.seen.clear();
    }

    fn mode(&self) -> WriteMode {
        WriteMode::Memory
    }

    fn len(&self) -> usize {
        self.docs.len()
    }
}

/// Spools the batch to a temporary JSON-lines file
///
/// The file is created with `tempfile` and removed when the strategy
/// is committed, discarded or dropped.
#[derive(Debug)]
pub struct DiskWriteStrategy {
    writer: Option<BufWriter<NamedTempFile>>,
    seen: HashSet<String>,
    count: usize,
}

impl DiskWriteStrategy {
    /// Create a buffer file in `dir`, or the system temp dir
    pub fn new(dir: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("strata-batch-").suffix(".jsonl");
        let file = match dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                builder.tempfile_in(dir)?
            }
            None => builder.tempfile()?,
        };
        debug!("Spooling write batch to {}", file.path().display());

        Ok(Self {
            writer: Some(BufWriter::new(file)),
            seen: HashSet::new(),
            count: 0,
        })
    }

    /// Path of the buffer file while one exists
    pub fn path(&self) -> Option<PathBuf> {
        self.writer.as_ref().map(|w| w.get_ref().path().to_path_buf())
    }

    fn take_file(&mut self) -> Result<NamedTempFile> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| StrataError::StorageError("write buffer already released".to_string()))?;
        writer
            .into_inner()
            .map_err(|e| StrataError::StorageError(format!("Failed to flush write buffer: {e}")))
    }
}

impl WriteStrategy for DiskWriteStrategy {
    fn add(&mut self, tree: StructuralDocument) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| StrataError::StorageError("write buffer already released".to_string()))?;

        for doc in tree.flatten() {
            check_unique(&mut self.seen, &doc.identifier)?;
            serde_json::to_writer(&mut *writer, &doc)?;
            writer.write_all(b"\n")?;
            self.count += 1;
        }
        Ok(())
    }

    fn commit(&mut self, client: &mut dyn IndexClient) -> Result<usize> {
        let file = match self.take_file() {
            Ok(file) => file,
            Err(e) => {
                self.discard();
                return Err(StrataError::CommitError(e.to_string()));
            }
        };
        self.discard();

        let reader = match file.reopen() {
            Ok(handle) => BufReader::new(handle),
            Err(e) => {
                return Err(StrataError::CommitError(format!(
                    "write buffer unreadable: {e}"
                )))
            }
        };
        let docs = reader.lines().map(|line| {
            let line = line?;
            Ok(serde_json::from_str::<IndexDocument>(&line)?)
        });
        let result = commit_batch(client, docs);

        // Dropping the handle removes the file
        drop(file);
        result
    }

    fn discard(&mut self) {
        if let Some(writer) = self.writer.take() {
            // Unflushed content is irrelevant; the file is deleted on drop
            let (file, _) = writer.into_parts();
            if let Err(e) = file.close() {
                warn!("Failed to remove write buffer file: {}", e);
            }
        }
        self.seen.clear();
        self.count = 0;
    }

    fn mode(&self) -> WriteMode {
        WriteMode::Disk
    }

    fn len(&self) -> usize {
        self.count
    }
}

impl Drop for DiskWriteStrategy {
    fn drop(&mut self) {
        self.discard();
    }
}
