//! Strata - Format-Polymorphic Metadata Indexer
//!
//! Indexes digitized-collection metadata records (METS/MODS,
//! METS/MARC, EAD 2002, EAD3, LIDO and Dublin Core) into a Tantivy
//! search index. Every record becomes a tree of structural documents:
//! the work, its nested sections and its pages. Multi-volume works are
//! linked to their anchor record by identifier.
//!
//! # Architecture
//!
//! - **core**: Indexing logic (front-end agnostic)
//!   - config, error, types, xdg
//!   - source (XML records, path queries, namespace tables)
//!   - variant (format variants, detection)
//!   - resolver, connector (anchor linking, remote fetches)
//!   - storage (write strategies, Tantivy index)
//!   - indexer (folder scan, pipeline, job runner)
//!   - services (unified service container)
//!
//! - **cli**: Command-line adapter (depends on core)
//!
//! # Key Features
//!
//! - One variant per format, derived from each other as data
//! - Per-variant namespace tables, no process-wide state
//! - Ordered anchor candidates with ambiguity warnings
//! - All-or-nothing batch commits, in memory or spooled to disk

// Core domain logic
pub mod core;

// Command-line adapter
pub mod cli;

// Re-export commonly used types for convenience
pub use core::config::Config;
pub use core::error::{Result, StrataError};
pub use core::indexer::{IndexerPipeline, JobRunner};
pub use core::services::Services;
pub use core::storage::TantivyIndex;
pub use core::types::*;
pub use core::variant::{FormatRegistry, FormatVariant, SchemaKind};
