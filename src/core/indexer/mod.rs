//! Record indexing module.
//!
//! Turns metadata record files into document trees and commits them
//! to the search index:
//!
//! - Folder scanning with pattern matching and data-folder discovery
//! - Structural decomposition driven by the record's format variant
//! - The per-job pipeline (validate, classify, structure, resolve,
//!   root path, emit, report)
//! - Concurrent execution of many jobs against one index

pub mod pipeline;
pub mod runner;
pub mod structure;
pub mod walker;

pub use pipeline::{IndexerPipeline, PipelineSettings, Prepared};
pub use runner::JobRunner;
pub use walker::{data_folders_for, RecordWalker};
