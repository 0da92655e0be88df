//! Core domain logic (front-end agnostic)
//!
//! This module contains all indexing logic that is independent of
//! the command-line front end.
//!
//! # Architecture
//!
//! - **config**: Configuration loading (TOML + environment)
//! - **error**: Error types and Result alias
//! - **types**: Document tree, jobs and outcomes
//! - **xdg**: XDG directory handling
//! - **source**: Parsed records and the path query engine
//! - **variant**: Format variants and their registry
//! - **resolver**: Anchor/volume resolution
//! - **connector**: Remote resource fetching
//! - **storage**: Write strategies and the Tantivy index
//! - **indexer**: Folder scanning, pipeline and job runner
//! - **services**: Unified service container

pub mod config;
pub mod connector;
pub mod error;
pub mod indexer;
pub mod resolver;
pub mod services;
pub mod source;
pub mod storage;
pub mod types;
pub mod variant;
pub mod xdg;

// Re-export key types for convenience
pub use config::Config;
pub use error::{Result, StrataError};
pub use services::Services;
