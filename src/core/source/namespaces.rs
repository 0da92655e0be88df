//! Namespace tables (prefix → URI) used to compile queries.
//!
//! A table is a plain value. Each format variant owns its own table,
//! built once from the configured base table plus the variant's
//! overrides, and every record parsed for that variant carries it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known namespace URIs
pub mod uri {
    pub const METS: &str = "http://www.loc.gov/METS/";
    pub const MODS: &str = "http://www.loc.gov/mods/v3";
    pub const MARC: &str = "http://www.loc.gov/MARC21/slim";
    pub const XLINK: &str = "http://www.w3.org/1999/xlink";
    pub const EAD2: &str = "urn:isbn:1-931666-22-9";
    pub const EAD3: &str = "http://ead3.archivists.org/schema/";
    pub const LIDO: &str = "http://www.lido-schema.org";
    pub const DC: &str = "http://purl.org/dc/elements/1.1/";
    pub const DCTERMS: &str = "http://purl.org/dc/terms/";
    pub const OAI_DC: &str = "http://www.openarchives.org/OAI/2.0/oai_dc/";
}

/// Mapping of namespace prefix to URI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamespaceTable {
    bindings: BTreeMap<String, String>,
}

impl NamespaceTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// The base table shipped with the indexer
    pub fn standard() -> Self {
        Self::new()
            .with("mets", uri::METS)
            .with("mods", uri::MODS)
            .with("marc", uri::MARC)
            .with("xlink", uri::XLINK)
            .with("ead", uri::EAD2)
            .with("lido", uri::LIDO)
            .with("dc", uri::DC)
            .with("dcterms", uri::DCTERMS)
            .with("oai_dc", uri::OAI_DC)
    }

    /// Builder-style binding, replacing any previous URI for `prefix`
    pub fn with(mut self, prefix: &str, uri: &str) -> Self {
        self.bind(prefix, uri);
        self
    }

    /// Bind `prefix` to `uri`, replacing any previous binding
    pub fn bind(&mut self, prefix: &str, uri: &str) {
        self.bindings.insert(prefix.to_string(), uri.to_string());
    }

    /// Look up the URI bound to `prefix`
    pub fn uri(&self, prefix: &str) -> Option<&str> {
        self.bindings.get(prefix).map(String::as_str)
    }

    /// Return a copy of `self` with every binding of `overrides` applied
    pub fn overlay(&self, overrides: &NamespaceTable) -> NamespaceTable {
        let mut merged = self.clone();
        for (prefix, uri) in &overrides.bindings {
            merged.bind(prefix, uri);
        }
        merged
    }

    /// Iterate bindings in prefix order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
