//! CLI command implementations
//!
//! Each command module handles argument parsing and execution for a specific CLI command.

pub mod completions;
pub mod config;
pub mod formats;
pub mod index;
pub mod index_folder;
pub mod record;

// Re-export argument types for use in mod.rs
pub use completions::CompletionsArgs;
pub use config::ConfigArgs;
pub use formats::FormatsArgs;
pub use index::IndexArgs;
pub use index_folder::IndexFolderArgs;
