//! Storage layer: write buffering and the Tantivy-backed index.
//!
//! # Architecture
//!
//! - **WriteStrategy**: buffers one job's documents (memory or a
//!   temporary file) and commits them as a single batch
//! - **IndexClient**: the operations a batch needs from an index
//! - **TantivyIndex**: the search index, one Tantivy document per
//!   structural node
//!
//! # Index Directory Structure
//!
//! ```text
//! {index_dir}/
//! ├── meta.json           # Tantivy metadata
//! ├── .managed.json
//! └── [segment files]
//! ```

pub mod strategy;
mod tantivy;

pub use strategy::{
    select_strategy, DiskWriteStrategy, IndexClient, MemoryWriteStrategy, WriteMode,
    WriteStrategy,
};
pub use tantivy::{create_schema, TantivyIndex, SCHEMA_VERSION};
