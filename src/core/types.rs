//! Core data types for the Strata indexer.
//!
//! This module defines the output document tree, its flattened
//! write form, job input, warnings, and the per-job outcome.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::core::storage::WriteMode;

/// Reserved field names
pub mod field {
    pub const SCHEMA_KIND: &str = "schema_kind";
    pub const ROOT_PATH: &str = "root_path";
    pub const LABEL: &str = "label";
    pub const TITLE: &str = "title";
    pub const ORDER: &str = "order";
    pub const IMAGE: &str = "image";
    pub const IMAGE_LOCAL: &str = "image_local";
    pub const COLLECTION: &str = "collection";
    pub const ANCHOR_SOURCE: &str = "anchor_source";
    pub const SOURCE_FILE: &str = "source_file";
}

/// Characters never allowed in a persistent identifier: whitespace and
/// path or shell metacharacters, since identifiers name media folders.
static IDENTIFIER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^[^\s/\\:*?"<>|]+$"#).expect("identifier pattern is a valid regex")
});

/// Check whether `identifier` can be used as a persistent identifier
pub fn is_valid_identifier(identifier: &str) -> bool {
    IDENTIFIER_PATTERN.is_match(identifier)
}

/// Kind of a node in the output hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocKind {
    /// A standalone work
    TopLevel,
    /// Parent record of a multi-part work
    Anchor,
    /// Child record of an anchor
    Volume,
    /// Logical section inside a work
    SubStructure,
    Page,
}

impl DocKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocKind::TopLevel => "top_level",
            DocKind::Anchor => "anchor",
            DocKind::Volume => "volume",
            DocKind::SubStructure => "sub_structure",
            DocKind::Page => "page",
        }
    }
}

impl fmt::Display for DocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top_level" => Ok(DocKind::TopLevel),
            "anchor" => Ok(DocKind::Anchor),
            "volume" => Ok(DocKind::Volume),
            "sub_structure" => Ok(DocKind::SubStructure),
            "page" => Ok(DocKind::Page),
            other => Err(format!("unknown document kind '{other}'")),
        }
    }
}

/// A node of the output hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralDocument {
    pub kind: DocKind,

    /// Persistent identifier, unique within one commit batch
    pub identifier: String,

    /// Field name to ordered values
    pub fields: BTreeMap<String, Vec<String>>,

    /// Ordered child nodes
    pub children: Vec<StructuralDocument>,

    /// Lookup key of the anchor record (never an ownership link)
    pub anchor_identifier: Option<String>,
}

impl StructuralDocument {
    pub fn new(kind: DocKind, identifier: impl Into<String>) -> Self {
        Self {
            kind,
            identifier: identifier.into(),
            fields: BTreeMap::new(),
            children: Vec::new(),
            anchor_identifier: None,
        }
    }

    /// Append a value to a field; empty values are ignored
    pub fn add_field(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            return;
        }
        self.fields.entry(name.to_string()).or_default().push(value);
    }

    /// Replace all values of a field
    pub fn set_field(&mut self, name: &str, values: Vec<String>) {
        self.fields.insert(name.to_string(), values);
    }

    /// First value of a field
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// Mark this node as a volume of `anchor`
    ///
    /// Kind and back-reference change together so a volume can never
    /// lack its anchor identifier.
    pub fn mark_volume(&mut self, anchor: String) {
        self.kind = DocKind::Volume;
        self.anchor_identifier = Some(anchor);
    }

    /// Set a field on this node and every descendant
    pub fn tag_all(&mut self, name: &str, value: &str) {
        self.set_field(name, vec![value.to_string()]);
        for child in &mut self.children {
            child.tag_all(name, value);
        }
    }

    /// Number of nodes in this subtree
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(StructuralDocument::count).sum::<usize>()
    }

    /// Approximate in-memory size of this subtree in bytes
    pub fn estimated_size(&self) -> usize {
        const NODE_OVERHEAD: usize = 64;
        let own = NODE_OVERHEAD
            + self.identifier.len()
            + self.anchor_identifier.as_ref().map_or(0, String::len)
            + self
                .fields
                .iter()
                .map(|(k, v)| k.len() + v.iter().map(String::len).sum::<usize>())
                .sum::<usize>();
        own + self
            .children
            .iter()
            .map(StructuralDocument::estimated_size)
            .sum::<usize>()
    }

    /// Flatten into write order: every parent precedes its children
    pub fn flatten(self) -> Vec<IndexDocument> {
        let mut out = Vec::with_capacity(self.count());
        let root = self.identifier.clone();
        flatten_into(self, None, &root, 0, &mut out);
        out
    }
}

fn flatten_into(
    node: StructuralDocument,
    parent: Option<&str>,
    root: &str,
    position: usize,
    out: &mut Vec<IndexDocument>,
) {
    let StructuralDocument {
        kind,
        identifier,
        fields,
        children,
        anchor_identifier,
    } = node;

    out.push(IndexDocument {
        identifier: identifier.clone(),
        kind,
        parent: parent.map(str::to_string),
        root: root.to_string(),
        position,
        anchor_identifier,
        fields,
    });

    for (idx, child) in children.into_iter().enumerate() {
        flatten_into(child, Some(&identifier), root, idx, out);
    }
}

/// A flattened node as written to the search index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub identifier: String,
    pub kind: DocKind,

    /// Identifier of the parent node, `None` for the record root
    pub parent: Option<String>,

    /// Identifier of the record root
    pub root: String,

    /// Position among siblings
    pub position: usize,

    pub anchor_identifier: Option<String>,
    pub fields: BTreeMap<String, Vec<String>>,
}

impl IndexDocument {
    /// First value of a field
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }
}

/// Resolved anchor relationship of a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorLink {
    pub child_identifier: String,
    pub anchor_identifier: String,

    /// Description of the candidate that matched
    pub source: String,
}

/// Kind of non-fatal finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A sub-node could not be decomposed and was skipped
    Structure,
    /// Anchor candidates disagreed; the first match was used
    ResolutionAmbiguity,
    /// A remote resource could not be fetched
    RemoteFetch,
}

/// Non-fatal finding reported next to a successful result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexWarning {
    pub kind: WarningKind,

    /// Identifier or query of the node concerned, when known
    pub node: Option<String>,

    pub message: String,
}

impl IndexWarning {
    pub fn new(kind: WarningKind, node: Option<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            node,
            message: message.into(),
        }
    }
}

impl fmt::Display for IndexWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            Some(node) => write!(f, "{:?} [{}]: {}", self.kind, node, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

/// One indexing job, as supplied by the job scheduler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexJob {
    /// Record file to index
    pub file_path: PathBuf,

    /// Job came from the re-index queue (affects upstream policy only)
    #[serde(default)]
    pub from_reindex_queue: bool,

    /// Named data folders (e.g. "media")
    #[serde(default)]
    pub data_folders: HashMap<String, PathBuf>,

    /// Order number given to the first page
    #[serde(default = "default_page_count_start")]
    pub page_count_start: u32,

    /// Fetch externally hosted page images into the media folder
    #[serde(default)]
    pub download_external_images: bool,
}

fn default_page_count_start() -> u32 {
    1
}

impl IndexJob {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            from_reindex_queue: false,
            data_folders: HashMap::new(),
            page_count_start: default_page_count_start(),
            download_external_images: false,
        }
    }

    pub fn with_data_folder(mut self, name: &str, path: impl Into<PathBuf>) -> Self {
        self.data_folders.insert(name.to_string(), path.into());
        self
    }

    pub fn with_page_count_start(mut self, start: u32) -> Self {
        self.page_count_start = start;
        self
    }

    pub fn with_external_images(mut self, download: bool) -> Self {
        self.download_external_images = download;
        self
    }
}

/// Result of one job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexOutcome {
    pub file_path: PathBuf,

    /// Identifiers written, in commit order
    pub identifiers: Vec<String>,

    pub warnings: Vec<IndexWarning>,

    /// Fatal error, if the job was aborted
    pub error: Option<String>,

    pub schema_kind: Option<String>,
    pub anchor: Option<AnchorLink>,
    pub write_mode: Option<WriteMode>,
    pub duration_ms: u64,
}

impl IndexOutcome {
    pub fn new(file_path: PathBuf) -> Self {
        Self {
            file_path,
            identifiers: Vec::new(),
            warnings: Vec::new(),
            error: None,
            schema_kind: None,
            anchor: None,
            write_mode: None,
            duration_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
