//! Error types and error handling for the Strata indexer.
//!
//! Fatal job errors are variants of [`StrataError`]. Non-fatal
//! findings (skipped sub-nodes, ambiguous anchors, unavailable remote
//! resources) are not errors; they travel as
//! [`IndexWarning`](crate::core::types::IndexWarning) values next to a
//! successful result.

use thiserror::Error;

/// Result type alias for Strata operations
pub type Result<T> = std::result::Result<T, StrataError>;

/// Main error type for the Strata indexer
#[derive(Error, Debug)]
pub enum StrataError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid query '{query}': {message}")]
    QueryError { query: String, message: String },

    #[error("Classification failed: {0}")]
    ClassificationFailed(String),

    #[error("Missing identifier: {0}")]
    MissingIdentifier(String),

    #[error("Commit failed: {0}")]
    CommitError(String),

    #[error("Remote fetch failed for {url}: {message}")]
    RemoteFetchError { url: String, message: String },

    #[error("Unknown format variant: {0}")]
    UnknownVariant(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl From<quick_xml::Error> for StrataError {
    fn from(e: quick_xml::Error) -> Self {
        StrataError::ParseError(e.to_string())
    }
}

impl StrataError {
    /// Check if the error stems from the input record itself
    /// (malformed XML, malformed query, wrong schema, no identifier)
    pub fn is_fatal_input(&self) -> bool {
        matches!(
            self,
            StrataError::ParseError(_)
                | StrataError::QueryError { .. }
                | StrataError::ClassificationFailed(_)
                | StrataError::MissingIdentifier(_)
        )
    }

    /// Check if this is a remote resource failure
    pub fn is_remote(&self) -> bool {
        matches!(self, StrataError::RemoteFetchError { .. })
    }

    /// Check if this is a "not found" type error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StrataError::RecordNotFound(_)
                | StrataError::InvalidPath(_)
                | StrataError::UnknownVariant(_)
        )
    }
}
