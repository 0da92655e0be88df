//! Format variants.
//!
//! A variant describes how one metadata standard is read: which root
//! elements it accepts, its namespace bindings, where identifiers and
//! anchor references live, and how the record decomposes into
//! sub-structures and pages.
//!
//! Variants are data. A [`VariantDefinition`] is a plain declarative
//! value that can be copied and partially overridden to derive a new
//! variant; [`FormatVariant::compile`] turns it into an immutable
//! compiled form bound to its own namespace table.

pub mod builtin;
pub mod registry;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::core::error::{Result, StrataError};
use crate::core::resolver::AnchorResolver;
use crate::core::source::{NamespaceTable, Query, SourceRecord};

pub use registry::FormatRegistry;

/// Attribute predicate a lookup template can be indexed by
static KEY_PREDICATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[@([A-Za-z_][\w.-]*)='\{key\}'\]").expect("key predicate pattern is valid")
});

/// Schema family of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchemaKind {
    Mets,
    MetsMarc,
    Ead,
    Ead3,
    Lido,
    DublinCore,
}

impl SchemaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaKind::Mets => "METS",
            SchemaKind::MetsMarc => "METS_MARC",
            SchemaKind::Ead => "EAD",
            SchemaKind::Ead3 => "EAD3",
            SchemaKind::Lido => "LIDO",
            SchemaKind::DublinCore => "DUBLIN_CORE",
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaKind {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "METS" => Ok(SchemaKind::Mets),
            "METS_MARC" => Ok(SchemaKind::MetsMarc),
            "EAD" => Ok(SchemaKind::Ead),
            "EAD3" => Ok(SchemaKind::Ead3),
            "LIDO" => Ok(SchemaKind::Lido),
            "DUBLIN_CORE" | "DC" => Ok(SchemaKind::DublinCore),
            _ => Err(StrataError::UnknownVariant(s.to_string())),
        }
    }
}

/// Where an anchor candidate reads its value from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    /// Text of the first match of a query on the record itself
    Query(String),
    /// A link to the anchor record, fetched and queried for its identifier
    RemotePointer { href: String, identifier: String },
}

/// One anchor candidate, tried in the variant's declared order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorCandidate {
    /// Name reported as the resolution source
    pub name: String,
    pub source: CandidateSource,
    /// Remove a leading MARC organization code, e.g. `(DE-627)`
    #[serde(default)]
    pub strip_org_code: bool,
}

impl AnchorCandidate {
    pub fn query(name: &str, expr: &str) -> Self {
        Self {
            name: name.to_string(),
            source: CandidateSource::Query(expr.to_string()),
            strip_org_code: false,
        }
    }

    /// MARC control number reference; the organization code prefix is dropped
    pub fn marc(name: &str, expr: &str) -> Self {
        Self {
            strip_org_code: true,
            ..Self::query(name, expr)
        }
    }

    pub fn remote(name: &str, href: &str, identifier: &str) -> Self {
        Self {
            name: name.to_string(),
            source: CandidateSource::RemotePointer {
                href: href.to_string(),
                identifier: identifier.to_string(),
            },
            strip_org_code: false,
        }
    }
}

/// A field extracted into a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    pub name: String,
    pub expr: String,
    /// Second query with a `{key}` placeholder, evaluated from the
    /// document root once per value of `expr`
    #[serde(default)]
    pub lookup: Option<String>,
}

impl FieldRule {
    pub fn new(name: &str, expr: &str) -> Self {
        Self {
            name: name.to_string(),
            expr: expr.to_string(),
            lookup: None,
        }
    }

    pub fn lookup(name: &str, expr: &str, template: &str) -> Self {
        Self {
            lookup: Some(template.to_string()),
            ..Self::new(name, expr)
        }
    }
}

/// Recursive sub-structure decomposition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRules {
    /// Child sections, relative to the current section (or structure root)
    pub select: String,
    /// Local identifier, relative to the section
    pub id: String,
    pub fields: Vec<FieldRule>,
}

/// Page decomposition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRules {
    /// Page nodes, from the document root
    pub select: String,
    /// Explicit order number, relative to the page
    pub order: Option<String>,
    pub fields: Vec<FieldRule>,
}

/// How a record decomposes into a tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureRules {
    /// Node standing for the work itself; the document element when unset
    pub root: Option<String>,
    pub root_fields: Vec<FieldRule>,
    pub sections: Option<SectionRules>,
    pub pages: Option<PageRules>,
}

/// Root-path computation of a variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootPathRule {
    /// Containing collection path from the collection query
    Collection,
    /// No root path for this schema
    Suppress,
}

/// Declarative description of a variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantDefinition {
    pub name: String,
    pub kind: SchemaKind,
    /// Accepted document elements as `prefix:local`
    pub root_elements: Vec<String>,
    /// Bindings applied over the configured base table
    pub namespaces: NamespaceTable,
    /// Record identifier queries, first non-empty wins
    pub identifier_rules: Vec<String>,
    pub anchor_candidates: Vec<AnchorCandidate>,
    /// Matches when the record is itself an anchor
    pub anchor_marker: Option<String>,
    pub collection: Option<String>,
    /// Ranks this variant first among those accepting the same root
    pub detect_hint: Option<String>,
    pub structure: StructureRules,
    pub root_path: RootPathRule,
}

impl VariantDefinition {
    pub fn new(name: &str, kind: SchemaKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            root_elements: Vec::new(),
            namespaces: NamespaceTable::new(),
            identifier_rules: Vec::new(),
            anchor_candidates: Vec::new(),
            anchor_marker: None,
            collection: None,
            detect_hint: None,
            structure: StructureRules::default(),
            root_path: RootPathRule::Collection,
        }
    }

    /// Copy this definition under a new name and kind
    pub fn derive(&self, name: &str, kind: SchemaKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            ..self.clone()
        }
    }

    pub fn root_element(mut self, qname: &str) -> Self {
        self.root_elements.push(qname.to_string());
        self
    }

    pub fn bind(mut self, prefix: &str, uri: &str) -> Self {
        self.namespaces.bind(prefix, uri);
        self
    }

    pub fn identifier(mut self, expr: &str) -> Self {
        self.identifier_rules.push(expr.to_string());
        self
    }

    /// Drop inherited identifier rules
    pub fn clear_identifiers(mut self) -> Self {
        self.identifier_rules.clear();
        self
    }

    /// Try `expr` before every inherited identifier rule
    pub fn identifier_first(mut self, expr: &str) -> Self {
        self.identifier_rules.insert(0, expr.to_string());
        self
    }

    pub fn candidate(mut self, candidate: AnchorCandidate) -> Self {
        self.anchor_candidates.push(candidate);
        self
    }

    /// Insert a candidate at `index` of the priority list
    pub fn candidate_at(mut self, index: usize, candidate: AnchorCandidate) -> Self {
        let index = index.min(self.anchor_candidates.len());
        self.anchor_candidates.insert(index, candidate);
        self
    }

    pub fn anchor_marker(mut self, expr: &str) -> Self {
        self.anchor_marker = Some(expr.to_string());
        self
    }

    pub fn collection(mut self, expr: &str) -> Self {
        self.collection = Some(expr.to_string());
        self
    }

    pub fn detect_hint(mut self, expr: &str) -> Self {
        self.detect_hint = Some(expr.to_string());
        self
    }

    pub fn structure(mut self, structure: StructureRules) -> Self {
        self.structure = structure;
        self
    }

    /// Append a field to the record root
    pub fn root_field(mut self, rule: FieldRule) -> Self {
        self.structure.root_fields.push(rule);
        self
    }

    pub fn root_path(mut self, rule: RootPathRule) -> Self {
        self.root_path = rule;
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) enum CompiledSource {
    Query(Query),
    RemotePointer { href: Query, identifier: Query },
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledCandidate {
    pub name: String,
    pub source: CompiledSource,
    pub strip_org_code: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledField {
    pub name: String,
    pub query: Query,
    pub lookup: Option<CompiledLookup>,
}

/// A `{key}` lookup template in evaluable form
#[derive(Debug, Clone)]
pub(crate) enum CompiledLookup {
    /// `base[@attribute='{key}']/rest`, answered from one pass over `base`
    Keyed {
        base: Query,
        attribute: String,
        rest: Option<Query>,
    },
    /// Any other shape, compiled once per key
    Template(String),
}

impl CompiledLookup {
    fn compile(template: &str, compile: &dyn Fn(&str) -> Result<Query>) -> Result<Self> {
        let fallback = || Ok(Self::Template(template.to_string()));
        if template.matches("{key}").count() != 1 {
            return fallback();
        }
        let Some(caps) = KEY_PREDICATE.captures(template) else {
            return fallback();
        };
        let (Some(whole), Some(attribute)) = (caps.get(0), caps.get(1)) else {
            return fallback();
        };

        let base = &template[..whole.start()];
        let rest = &template[whole.end()..];
        let rest = match rest.strip_prefix('/') {
            Some(r) if !r.starts_with('/') => Some(r),
            None if rest.is_empty() => None,
            _ => return fallback(),
        };
        if base.is_empty() {
            return fallback();
        }

        Ok(Self::Keyed {
            base: compile(base)?,
            attribute: attribute.as_str().to_string(),
            rest: rest.map(|r| compile(r)).transpose()?,
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledSections {
    pub select: Query,
    pub id: Query,
    pub fields: Vec<CompiledField>,
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledPages {
    pub select: Query,
    pub order: Option<Query>,
    pub fields: Vec<CompiledField>,
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledStructure {
    pub root: Option<Query>,
    pub root_fields: Vec<CompiledField>,
    pub sections: Option<CompiledSections>,
    pub pages: Option<CompiledPages>,
}

/// A compiled, immutable variant
#[derive(Debug, Clone)]
pub struct FormatVariant {
    definition: VariantDefinition,
    namespaces: Arc<NamespaceTable>,
    roots: Vec<(String, String)>,
    identifiers: Vec<Query>,
    candidates: Vec<CompiledCandidate>,
    anchor_marker: Option<Query>,
    collection: Option<Query>,
    detect_hint: Option<Query>,
    structure: CompiledStructure,
}

impl FormatVariant {
    /// Compile `definition` with its bindings applied over `base`
    ///
    /// Every query is compiled here, so a bad rule or an unknown
    /// prefix fails at construction and never mid-job.
    pub fn compile(definition: VariantDefinition, base: &NamespaceTable) -> Result<Self> {
        let namespaces = base.overlay(&definition.namespaces);
        let compile = |expr: &str| {
            Query::compile(expr, &namespaces).map_err(|e| {
                StrataError::ConfigError(format!("variant '{}': {}", definition.name, e))
            })
        };
        let compile_fields = |rules: &[FieldRule]| -> Result<Vec<CompiledField>> {
            rules
                .iter()
                .map(|rule| {
                    Ok(CompiledField {
                        name: rule.name.clone(),
                        query: compile(&rule.expr)?,
                        lookup: rule
                            .lookup
                            .as_deref()
                            .map(|t| CompiledLookup::compile(t, &compile))
                            .transpose()?,
                    })
                })
                .collect()
        };

        if definition.root_elements.is_empty() {
            return Err(StrataError::ConfigError(format!(
                "variant '{}' accepts no root element",
                definition.name
            )));
        }
        let roots = definition
            .root_elements
            .iter()
            .map(|qname| resolve_qname(qname, &namespaces, &definition.name))
            .collect::<Result<Vec<_>>>()?;

        let identifiers = definition
            .identifier_rules
            .iter()
            .map(|expr| compile(expr))
            .collect::<Result<Vec<_>>>()?;
        if identifiers.is_empty() {
            return Err(StrataError::ConfigError(format!(
                "variant '{}' has no identifier rule",
                definition.name
            )));
        }

        let candidates = definition
            .anchor_candidates
            .iter()
            .map(|c| {
                let source = match &c.source {
                    CandidateSource::Query(expr) => CompiledSource::Query(compile(expr)?),
                    CandidateSource::RemotePointer { href, identifier } => {
                        CompiledSource::RemotePointer {
                            href: compile(href)?,
                            identifier: compile(identifier)?,
                        }
                    }
                };
                Ok(CompiledCandidate {
                    name: c.name.clone(),
                    source,
                    strip_org_code: c.strip_org_code,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let rules = &definition.structure;
        let structure = CompiledStructure {
            root: rules.root.as_deref().map(compile).transpose()?,
            root_fields: compile_fields(&rules.root_fields)?,
            sections: rules
                .sections
                .as_ref()
                .map(|s| -> Result<CompiledSections> {
                    Ok(CompiledSections {
                        select: compile(&s.select)?,
                        id: compile(&s.id)?,
                        fields: compile_fields(&s.fields)?,
                    })
                })
                .transpose()?,
            pages: rules
                .pages
                .as_ref()
                .map(|p| -> Result<CompiledPages> {
                    Ok(CompiledPages {
                        select: compile(&p.select)?,
                        order: p.order.as_deref().map(compile).transpose()?,
                        fields: compile_fields(&p.fields)?,
                    })
                })
                .transpose()?,
        };

        let anchor_marker = definition.anchor_marker.as_deref().map(compile).transpose()?;
        let collection = definition.collection.as_deref().map(compile).transpose()?;
        let detect_hint = definition.detect_hint.as_deref().map(compile).transpose()?;

        Ok(Self {
            namespaces: Arc::new(namespaces),
            roots,
            identifiers,
            candidates,
            anchor_marker,
            collection,
            detect_hint,
            structure,
            definition,
        })
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn kind(&self) -> SchemaKind {
        self.definition.kind
    }

    pub fn definition(&self) -> &VariantDefinition {
        &self.definition
    }

    /// Effective namespace table of this variant
    pub fn namespaces(&self) -> &Arc<NamespaceTable> {
        &self.namespaces
    }

    pub fn root_path_rule(&self) -> RootPathRule {
        self.definition.root_path
    }

    /// Parse XML text bound to this variant's namespace table
    pub fn parse(&self, xml: &str) -> Result<SourceRecord> {
        SourceRecord::parse(xml, Arc::clone(&self.namespaces))
    }

    /// Parse raw bytes in whatever encoding they declare
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<SourceRecord> {
        SourceRecord::parse_bytes(bytes, Arc::clone(&self.namespaces))
    }

    /// Check whether the record's document element is one this variant reads
    pub fn accepts(&self, record: &SourceRecord) -> bool {
        let root = record.root();
        let namespace = record.namespace_of(root).unwrap_or("");
        let local = record.local_name(root);
        self.roots
            .iter()
            .any(|(ns, name)| ns == namespace && name == local)
    }

    /// Schema kind of `record`
    pub fn classify(&self, record: &SourceRecord) -> Result<SchemaKind> {
        if self.accepts(record) {
            return Ok(self.kind());
        }
        let root = record.root();
        Err(StrataError::ClassificationFailed(format!(
            "document element {{{}}}{} is not a {} record",
            record.namespace_of(root).unwrap_or(""),
            record.local_name(root),
            self.name()
        )))
    }

    /// Record identifier: first non-empty identifier rule
    pub fn identifier(&self, record: &SourceRecord) -> Option<String> {
        self.identifiers
            .iter()
            .find_map(|q| record.select_text(q, None))
    }

    /// Anchor identifier from the record alone (no remote lookups)
    pub fn anchor_identifier(&self, record: &SourceRecord) -> Option<String> {
        AnchorResolver::local().resolve(record, self).anchor
    }

    /// Derived from [`anchor_identifier`](Self::anchor_identifier)
    pub fn is_volume(&self, record: &SourceRecord) -> bool {
        self.anchor_identifier(record).is_some()
    }

    /// Check whether the record is itself an anchor
    pub fn is_anchor(&self, record: &SourceRecord) -> bool {
        self.anchor_marker
            .as_ref()
            .is_some_and(|q| !record.select(q, None).is_empty())
    }

    /// Collection path of the record
    ///
    /// Each collection value `a.b.c` expands to its ancestors
    /// `a`, `a.b`, `a.b.c`. Records without a collection fall back to
    /// `default`. Variants with [`RootPathRule::Suppress`] return an
    /// empty path.
    pub fn root_path(&self, record: &SourceRecord, default: &str, separator: &str) -> Vec<String> {
        if self.definition.root_path == RootPathRule::Suppress {
            return Vec::new();
        }

        let mut collections = self
            .collection
            .as_ref()
            .map(|q| record.select_all_text(q, None))
            .unwrap_or_default();
        if collections.is_empty() && !default.is_empty() {
            collections.push(default.to_string());
        }

        let mut path: Vec<String> = Vec::new();
        for collection in collections {
            for ancestor in collection_ancestors(&collection, separator) {
                if !path.contains(&ancestor) {
                    path.push(ancestor);
                }
            }
        }
        path
    }

    /// Check whether the record carries this variant's detection hint
    pub fn matches_hint(&self, record: &SourceRecord) -> bool {
        self.detect_hint
            .as_ref()
            .is_some_and(|q| !record.select(q, None).is_empty())
    }

    pub(crate) fn candidates(&self) -> &[CompiledCandidate] {
        &self.candidates
    }

    pub(crate) fn structure_rules(&self) -> &CompiledStructure {
        &self.structure
    }

    pub(crate) fn collection_query(&self) -> Option<&Query> {
        self.collection.as_ref()
    }
}

fn resolve_qname(
    qname: &str,
    namespaces: &NamespaceTable,
    variant: &str,
) -> Result<(String, String)> {
    match qname.split_once(':') {
        Some((prefix, local)) => {
            let uri = namespaces.uri(prefix).ok_or_else(|| {
                StrataError::ConfigError(format!(
                    "variant '{variant}': unknown namespace prefix '{prefix}' in root element"
                ))
            })?;
            Ok((uri.to_string(), local.to_string()))
        }
        None => Ok((String::new(), qname.to_string())),
    }
}

/// `a.b.c` → `a`, `a.b`, `a.b.c`
fn collection_ancestors(collection: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return vec![collection.to_string()];
    }
    let parts: Vec<&str> = collection
        .split(separator)
        .filter(|p| !p.is_empty())
        .collect();
    (1..=parts.len())
        .map(|n| parts[..n].join(separator))
        .collect()
}
