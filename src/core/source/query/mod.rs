//! Namespace-aware path queries.
//!
//! A small XPath 1.0 subset, enough for metadata extraction rules:
//!
//! - absolute (`/a/b`), descendant (`//a`) and relative (`a/b`) paths
//! - `.`, `..`, `*`, `prefix:name`, `prefix:*`
//! - trailing `@attr`, `@prefix:attr` and `text()` steps
//! - predicates: `[n]`, `[@a]`, `[@a='v']`, `[child!='v']`, combined
//!   with `and`, `or`, `not(...)` and parentheses
//! - `|` unions
//!
//! Queries are compiled against a [`NamespaceTable`]; an unknown
//! prefix is a compile error, not an empty result.

mod eval;
mod lexer;
mod parser;

use std::fmt;

use crate::core::error::{Result, StrataError};
use crate::core::source::dom::XmlDocument;
use crate::core::source::NamespaceTable;

pub use eval::Item;
use parser::LocationPath;

/// A compiled query
#[derive(Debug, Clone)]
pub struct Query {
    source: String,
    paths: Vec<LocationPath>,
}

impl Query {
    /// Compile `expr` with prefixes resolved through `namespaces`
    pub fn compile(expr: &str, namespaces: &NamespaceTable) -> Result<Self> {
        let paths = parser::parse(expr, namespaces).map_err(|message| StrataError::QueryError {
            query: expr.to_string(),
            message,
        })?;
        Ok(Self {
            source: expr.to_string(),
            paths,
        })
    }

    /// The expression this query was compiled from
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub(crate) fn evaluate(&self, doc: &XmlDocument, context: Item) -> Vec<Item> {
        eval::evaluate(doc, &self.paths, context)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

pub(crate) fn string_value(doc: &XmlDocument, item: Item) -> String {
    eval::string_value(doc, item)
}
