//! Structural decomposition of a record.
//!
//! Walks a [`SourceRecord`] with its variant's structure rules and
//! produces a single-rooted [`StructuralDocument`] tree: the work
//! itself, its nested sub-structures in document order, then its
//! pages. Sub-nodes that cannot be decomposed are skipped with a
//! structure warning; only a missing root identifier is fatal, and
//! that is checked by the caller.

use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::core::source::{NodeRef, Query, SourceRecord};
use crate::core::types::{
    field, is_valid_identifier, DocKind, IndexWarning, StructuralDocument, WarningKind,
};
use crate::core::variant::{
    CompiledField, CompiledLookup, CompiledPages, CompiledSections, FormatVariant,
};

/// Nesting limit for sub-structures
const MAX_DEPTH: usize = 64;

/// Tree and findings of one structural walk
#[derive(Debug)]
pub struct Structure {
    pub tree: StructuralDocument,
    pub warnings: Vec<IndexWarning>,

    /// Lookup queries evaluated over the whole record
    pub lookup_scans: usize,
}

/// Build the document tree of `record` rooted at identifier `pi`
pub fn build(
    record: &SourceRecord,
    variant: &FormatVariant,
    pi: &str,
    page_count_start: u32,
) -> Structure {
    let mut walker = StructureWalker {
        record,
        pi,
        warnings: Vec::new(),
        seen: HashSet::from([pi.to_string()]),
        lookup_index: HashMap::new(),
        lookup_scans: 0,
    };
    let rules = variant.structure_rules();

    let context = rules
        .root
        .as_ref()
        .and_then(|q| record.select(q, None).into_iter().next())
        .unwrap_or_else(|| record.root());

    let mut root = StructuralDocument::new(DocKind::TopLevel, pi);
    walker.apply_fields(&mut root, &rules.root_fields, context);

    if let Some(sections) = &rules.sections {
        walker.walk_sections(&mut root, sections, context, 1);
    }
    if let Some(pages) = &rules.pages {
        walker.walk_pages(&mut root, pages, page_count_start);
    }

    debug!(
        "Structure of {}: {} nodes, {} warnings, {} lookup scans",
        pi,
        root.count(),
        walker.warnings.len(),
        walker.lookup_scans
    );
    Structure {
        tree: root,
        warnings: walker.warnings,
        lookup_scans: walker.lookup_scans,
    }
}

struct StructureWalker<'a> {
    record: &'a SourceRecord,
    pi: &'a str,
    warnings: Vec<IndexWarning>,
    seen: HashSet<String>,
    /// Keyed lookup candidates per base query, by attribute value
    lookup_index: HashMap<String, HashMap<String, Vec<NodeRef>>>,
    lookup_scans: usize,
}

impl StructureWalker<'_> {
    fn warn(&mut self, node: String, message: String) {
        warn!("{} [{}]: {}", self.pi, node, message);
        self.warnings
            .push(IndexWarning::new(WarningKind::Structure, Some(node), message));
    }

    /// Claim `identifier` for this batch, warning when it cannot be used
    fn claim(&mut self, identifier: &str, node: &str) -> bool {
        if !is_valid_identifier(identifier) {
            self.warn(
                node.to_string(),
                format!("invalid identifier '{identifier}', node skipped"),
            );
            return false;
        }
        if !self.seen.insert(identifier.to_string()) {
            self.warn(
                node.to_string(),
                format!("duplicate identifier '{identifier}', node skipped"),
            );
            return false;
        }
        true
    }

    fn walk_sections(
        &mut self,
        parent: &mut StructuralDocument,
        rules: &CompiledSections,
        context: NodeRef,
        depth: usize,
    ) {
        for (idx, node) in self.record.select(&rules.select, Some(context)).into_iter().enumerate() {
            let location = format!("{}[{}]", rules.select, idx + 1);
            if node == context {
                self.warn(location, "section selects itself, node skipped".to_string());
                continue;
            }
            if depth > MAX_DEPTH {
                self.warn(location, format!("nesting deeper than {MAX_DEPTH}, node skipped"));
                continue;
            }

            let Some(local_id) = self.record.select_text(&rules.id, Some(node)) else {
                self.warn(location, "section without identifier, node skipped".to_string());
                continue;
            };
            let identifier = format!("{}_{}", self.pi, local_id);
            if !self.claim(&identifier, &location) {
                continue;
            }

            let mut section = StructuralDocument::new(DocKind::SubStructure, identifier);
            self.apply_fields(&mut section, &rules.fields, node);
            self.walk_sections(&mut section, rules, node, depth + 1);
            parent.children.push(section);
        }
    }

    fn walk_pages(&mut self, root: &mut StructuralDocument, rules: &CompiledPages, start: u32) {
        for (idx, node) in self.record.select(&rules.select, None).into_iter().enumerate() {
            let location = format!("{}[{}]", rules.select, idx + 1);
            let fallback = start.saturating_add(idx as u32);

            let order = match rules.order.as_ref().and_then(|q| self.record.select_text(q, Some(node))) {
                None => fallback,
                Some(text) => match text.parse::<u32>() {
                    Ok(order) => order,
                    Err(_) => {
                        self.warn(
                            location.clone(),
                            format!("page order '{text}' is not a number, using {fallback}"),
                        );
                        fallback
                    }
                },
            };

            let identifier = format!("{}_PAGE_{}", self.pi, order);
            if !self.claim(&identifier, &location) {
                continue;
            }

            let mut page = StructuralDocument::new(DocKind::Page, identifier);
            page.add_field(field::ORDER, order.to_string());
            self.apply_fields(&mut page, &rules.fields, node);
            root.children.push(page);
        }
    }

    fn apply_fields(&mut self, doc: &mut StructuralDocument, rules: &[CompiledField], context: NodeRef) {
        for rule in rules {
            let keys = self.record.select_all_text(&rule.query, Some(context));
            match &rule.lookup {
                None => {
                    for value in keys {
                        doc.add_field(&rule.name, value);
                    }
                }
                Some(CompiledLookup::Keyed {
                    base,
                    attribute,
                    rest,
                }) => {
                    let slot = format!("{base}[@{attribute}]");
                    if !self.lookup_index.contains_key(&slot) {
                        let index = self.index_lookup(base, attribute);
                        self.lookup_index.insert(slot.clone(), index);
                    }
                    let Some(index) = self.lookup_index.get(&slot) else {
                        continue;
                    };
                    for key in keys {
                        for &node in index.get(&key).into_iter().flatten() {
                            let values = match rest {
                                Some(rest) => self.record.select_all_text(rest, Some(node)),
                                None => vec![self.record.text_of(node)],
                            };
                            for value in values.into_iter().filter(|v| !v.is_empty()) {
                                doc.add_field(&rule.name, value);
                            }
                        }
                    }
                }
                Some(CompiledLookup::Template(template)) => {
                    for key in keys {
                        self.lookup_template(doc, &rule.name, template, &key);
                    }
                }
            }
        }
    }

    /// Candidates of a keyed lookup grouped by their key attribute
    fn index_lookup(&mut self, base: &Query, attribute: &str) -> HashMap<String, Vec<NodeRef>> {
        self.lookup_scans += 1;
        let mut index: HashMap<String, Vec<NodeRef>> = HashMap::new();
        for node in self.record.select(base, None) {
            if let Some(value) = self.record.attribute(node, attribute) {
                index.entry(value.to_string()).or_default().push(node);
            }
        }
        index
    }

    fn lookup_template(&mut self, doc: &mut StructuralDocument, name: &str, template: &str, key: &str) {
        if key.contains('\'') {
            self.warn(
                doc.identifier.clone(),
                format!("lookup key '{key}' for field {name} contains a quote"),
            );
            return;
        }
        let expr = template.replace("{key}", key);
        match self.record.compile(&expr) {
            Ok(query) => {
                self.lookup_scans += 1;
                for value in self.record.select_all_text(&query, None) {
                    doc.add_field(name, value);
                }
            }
            Err(e) => {
                self.warn(doc.identifier.clone(), format!("lookup for field {name} failed: {e}"));
            }
        }
    }
}
