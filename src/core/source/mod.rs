//! Document source adapter.
//!
//! [`SourceRecord`] wraps one parsed metadata record together with the
//! namespace table its queries are evaluated under. It answers path
//! queries with elements or text and never falls back across
//! expressions: an empty result means "no match".

pub mod dom;
pub mod namespaces;
pub mod query;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::error::Result;
use dom::{NodeId, XmlDocument};
pub use namespaces::NamespaceTable;
pub use query::{Item, Query};

/// Handle to an element of a [`SourceRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef(NodeId);

impl NodeRef {
    pub fn id(&self) -> NodeId {
        self.0
    }
}

/// A parsed record plus its namespace bindings (immutable)
#[derive(Debug, Clone)]
pub struct SourceRecord {
    document: XmlDocument,
    namespaces: Arc<NamespaceTable>,
    path: Option<PathBuf>,
}

impl SourceRecord {
    /// Parse XML text into a record bound to `namespaces`
    pub fn parse(xml: &str, namespaces: Arc<NamespaceTable>) -> Result<Self> {
        Ok(Self {
            document: XmlDocument::parse(xml)?,
            namespaces,
            path: None,
        })
    }

    /// Parse raw bytes, decoded per their BOM or XML declaration
    pub fn parse_bytes(bytes: &[u8], namespaces: Arc<NamespaceTable>) -> Result<Self> {
        Ok(Self {
            document: XmlDocument::parse_bytes(bytes)?,
            namespaces,
            path: None,
        })
    }

    /// Read and parse a record file
    pub fn from_file(path: &Path, namespaces: Arc<NamespaceTable>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let mut record = Self::parse_bytes(&bytes, namespaces)?;
        record.path = Some(path.to_path_buf());
        Ok(record)
    }

    /// Rebind the parsed document to another namespace table
    pub fn with_namespaces(self, namespaces: Arc<NamespaceTable>) -> Self {
        Self { namespaces, ..self }
    }

    /// Source file, when the record was read from disk
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn namespaces(&self) -> &NamespaceTable {
        &self.namespaces
    }

    pub fn document(&self) -> &XmlDocument {
        &self.document
    }

    /// The document element
    pub fn root(&self) -> NodeRef {
        NodeRef(self.document.root())
    }

    /// Namespace URI of an element
    pub fn namespace_of(&self, node: NodeRef) -> Option<&str> {
        self.document.element(node.0).namespace.as_deref()
    }

    /// Local name of an element
    pub fn local_name(&self, node: NodeRef) -> &str {
        &self.document.element(node.0).local_name
    }

    /// Compile an expression under this record's namespace table
    pub fn compile(&self, expr: &str) -> Result<Query> {
        Query::compile(expr, &self.namespaces)
    }

    /// Matching elements in document order
    ///
    /// Attribute and `text()` matches are not elements and are left
    /// out; use [`select_text`](Self::select_text) for those.
    pub fn select(&self, query: &Query, context: Option<NodeRef>) -> Vec<NodeRef> {
        query
            .evaluate(&self.document, Self::context_item(context))
            .into_iter()
            .filter_map(|item| match item {
                Item::Element(id) => Some(NodeRef(id)),
                _ => None,
            })
            .collect()
    }

    /// Trimmed text of the first match with non-empty text
    pub fn select_text(&self, query: &Query, context: Option<NodeRef>) -> Option<String> {
        self.texts(query, context).next()
    }

    /// Trimmed, non-empty texts of all matches in document order
    pub fn select_all_text(&self, query: &Query, context: Option<NodeRef>) -> Vec<String> {
        self.texts(query, context).collect()
    }

    /// Compile and run `expr`, returning matching elements
    pub fn select_expr(&self, expr: &str, context: Option<NodeRef>) -> Result<Vec<NodeRef>> {
        Ok(self.select(&self.compile(expr)?, context))
    }

    /// Compile and run `expr`, returning the first text
    pub fn text_expr(&self, expr: &str, context: Option<NodeRef>) -> Result<Option<String>> {
        Ok(self.select_text(&self.compile(expr)?, context))
    }

    /// Attribute value (no namespace) of an element
    pub fn attribute(&self, node: NodeRef, name: &str) -> Option<&str> {
        self.document.attribute(node.0, None, name)
    }

    /// Concatenated, trimmed text content of an element
    pub fn text_of(&self, node: NodeRef) -> String {
        self.document.string_value(node.0).trim().to_string()
    }

    fn texts<'a>(
        &'a self,
        compiled: &Query,
        context: Option<NodeRef>,
    ) -> impl Iterator<Item = String> + 'a {
        compiled
            .evaluate(&self.document, Self::context_item(context))
            .into_iter()
            .map(move |item| query::string_value(&self.document, item).trim().to_string())
            .filter(|text| !text.is_empty())
    }

    fn context_item(context: Option<NodeRef>) -> Item {
        context.map(|n| Item::Element(n.0)).unwrap_or(Item::Document)
    }
}
