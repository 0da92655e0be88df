//! Tantivy-backed search index client.
//!
//! Every flattened document becomes one Tantivy document keyed by its
//! persistent identifier. Tree links (`parent_pi`, `root_pi`,
//! `position`) and the anchor back-reference are indexed so a record
//! can be read back as a tree; field values are stored as JSON and
//! folded into one full-text field.

use crate::core::error::{Result, StrataError};
use crate::core::storage::strategy::IndexClient;
use crate::core::types::{field as reserved, DocKind, IndexDocument, StructuralDocument};
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::Path;
use tantivy::collector::{Count, TopDocs};
use tantivy::query::TermQuery;
use tantivy::schema::*;
use tantivy::{DocAddress, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::debug;

/// Current schema version
/// Version 1: Initial record schema
pub const SCHEMA_VERSION: u32 = 1;

/// Create the Tantivy schema for record documents
///
/// Fields:
/// - pi: Persistent identifier (STRING | STORED)
/// - kind: Document kind (STRING | STORED)
/// - schema_kind: Source schema family (STRING | STORED)
/// - parent_pi / root_pi / anchor_pi: Tree and anchor links (STRING | STORED)
/// - position: Position among siblings (u64 | INDEXED | STORED)
/// - root_path: Collection path, one value per level (STRING | STORED)
/// - fields_json: All field values as JSON (STORED)
/// - text: Full-text content of all field values (TEXT)
/// - indexed_at: Timestamp (Date | STORED)
pub fn create_schema() -> Schema {
    let mut builder = Schema::builder();

    builder.add_text_field("pi", STRING | STORED);
    builder.add_text_field("kind", STRING | STORED);
    builder.add_text_field("schema_kind", STRING | STORED);

    // Links
    builder.add_text_field("parent_pi", STRING | STORED);
    builder.add_text_field("root_pi", STRING | STORED);
    builder.add_text_field("anchor_pi", STRING | STORED);
    builder.add_u64_field("position", INDEXED | STORED);

    builder.add_text_field("root_path", STRING | STORED);
    builder.add_text_field("fields_json", STORED);
    builder.add_text_field("text", TEXT);

    builder.add_date_field("indexed_at", STORED);

    builder.build()
}

#[derive(Debug, Clone, Copy)]
struct Fields {
    pi: Field,
    kind: Field,
    schema_kind: Field,
    parent_pi: Field,
    root_pi: Field,
    anchor_pi: Field,
    position: Field,
    root_path: Field,
    fields_json: Field,
    text: Field,
    indexed_at: Field,
}

impl Fields {
    fn resolve(schema: &Schema) -> Result<Self> {
        let get = |name: &str| {
            schema
                .get_field(name)
                .map_err(|e| StrataError::StorageError(format!("Missing {name} field: {e}")))
        };
        Ok(Self {
            pi: get("pi")?,
            kind: get("kind")?,
            schema_kind: get("schema_kind")?,
            parent_pi: get("parent_pi")?,
            root_pi: get("root_pi")?,
            anchor_pi: get("anchor_pi")?,
            position: get("position")?,
            root_path: get("root_path")?,
            fields_json: get("fields_json")?,
            text: get("text")?,
            indexed_at: get("indexed_at")?,
        })
    }
}

/// Tantivy index wrapper
pub struct TantivyIndex {
    index: Index,
    fields: Fields,
    writer: IndexWriter,
    reader: IndexReader,
}

impl std::fmt::Debug for TantivyIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TantivyIndex")
            .field("schema", &"<schema>")
            .finish()
    }
}

impl TantivyIndex {
    /// Create a new Tantivy index at the given path
    pub fn create(index_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(index_dir)?;
        let index = Index::create_in_dir(index_dir, create_schema())
            .map_err(|e| StrataError::StorageError(format!("Failed to create index: {e}")))?;
        Self::from_index(index)
    }

    /// Open an existing Tantivy index
    pub fn open(index_dir: &Path) -> Result<Self> {
        let index = Index::open_in_dir(index_dir)
            .map_err(|e| StrataError::StorageError(format!("Failed to open index: {e}")))?;
        Self::from_index(index)
    }

    /// Open the index at `index_dir`, creating it when absent
    pub fn open_or_create(index_dir: &Path) -> Result<Self> {
        if index_dir.join("meta.json").exists() {
            Self::open(index_dir)
        } else {
            Self::create(index_dir)
        }
    }

    fn from_index(index: Index) -> Result<Self> {
        let fields = Fields::resolve(&index.schema())?;

        // 50MB writer heap
        let writer = index
            .writer(50_000_000)
            .map_err(|e| StrataError::StorageError(format!("Failed to create writer: {e}")))?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| StrataError::StorageError(format!("Failed to create reader: {e}")))?;

        Ok(Self {
            index,
            fields,
            writer,
            reader,
        })
    }

    /// Get a reference to the underlying Tantivy index
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Number of committed documents
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// Committed document with identifier `pi`
    pub fn get(&self, pi: &str) -> Result<Option<IndexDocument>> {
        Ok(self.find(self.fields.pi, pi)?.into_iter().next())
    }

    /// Direct children of `pi`, in position order
    pub fn children(&self, pi: &str) -> Result<Vec<IndexDocument>> {
        let mut children = self.find(self.fields.parent_pi, pi)?;
        children.sort_by_key(|d| d.position);
        Ok(children)
    }

    /// Committed records whose anchor is `anchor`
    pub fn volumes_of(&self, anchor: &str) -> Result<Vec<IndexDocument>> {
        let mut volumes = self.find(self.fields.anchor_pi, anchor)?;
        volumes.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        Ok(volumes)
    }

    /// Rebuild the tree rooted at `pi`
    pub fn load_tree(&self, pi: &str) -> Result<StructuralDocument> {
        let root = self
            .get(pi)?
            .ok_or_else(|| StrataError::RecordNotFound(pi.to_string()))?;
        self.build_tree(root)
    }

    fn build_tree(&self, doc: IndexDocument) -> Result<StructuralDocument> {
        let children = self
            .children(&doc.identifier)?
            .into_iter()
            .map(|child| self.build_tree(child))
            .collect::<Result<Vec<_>>>()?;

        Ok(StructuralDocument {
            kind: doc.kind,
            identifier: doc.identifier,
            fields: doc.fields,
            children,
            anchor_identifier: doc.anchor_identifier,
        })
    }

    /// Delete a whole record and commit
    pub fn delete_record(&mut self, pi: &str) -> Result<usize> {
        let count = self.count_term(self.fields.root_pi, pi)?;
        if count == 0 {
            return Err(StrataError::RecordNotFound(pi.to_string()));
        }
        IndexClient::delete_tree(self, pi)?;
        IndexClient::commit(self)?;
        Ok(count)
    }

    fn term_query(field: Field, value: &str) -> TermQuery {
        TermQuery::new(Term::from_field_text(field, value), IndexRecordOption::Basic)
    }

    fn count_term(&self, field: Field, value: &str) -> Result<usize> {
        self.reader
            .searcher()
            .search(&Self::term_query(field, value), &Count)
            .map_err(|e| StrataError::StorageError(format!("Search failed: {e}")))
    }

    fn find(&self, field: Field, value: &str) -> Result<Vec<IndexDocument>> {
        let searcher = self.reader.searcher();
        let limit = (searcher.num_docs() as usize).max(1);
        let hits: Vec<(f32, DocAddress)> = searcher
            .search(&Self::term_query(field, value), &TopDocs::with_limit(limit))
            .map_err(|e| StrataError::StorageError(format!("Search failed: {e}")))?;

        hits.into_iter()
            .map(|(_, address)| {
                let doc: TantivyDocument = searcher
                    .doc(address)
                    .map_err(|e| StrataError::StorageError(format!("Failed to load document: {e}")))?;
                self.read_document(&doc)
            })
            .collect()
    }

    fn build_document(&self, doc: &IndexDocument) -> Result<TantivyDocument> {
        let f = self.fields;
        let mut out = TantivyDocument::default();

        out.add_text(f.pi, &doc.identifier);
        out.add_text(f.kind, doc.kind.as_str());
        if let Some(schema_kind) = doc.field(reserved::SCHEMA_KIND) {
            out.add_text(f.schema_kind, schema_kind);
        }
        if let Some(parent) = &doc.parent {
            out.add_text(f.parent_pi, parent);
        }
        out.add_text(f.root_pi, &doc.root);
        if let Some(anchor) = &doc.anchor_identifier {
            out.add_text(f.anchor_pi, anchor);
        }
        out.add_u64(f.position, doc.position as u64);
        for level in doc.fields.get(reserved::ROOT_PATH).into_iter().flatten() {
            out.add_text(f.root_path, level);
        }
        out.add_text(f.fields_json, serde_json::to_string(&doc.fields)?);

        let text = doc
            .fields
            .iter()
            .filter(|(name, _)| name.as_str() != reserved::ROOT_PATH)
            .flat_map(|(_, values)| values.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        out.add_text(f.text, &text);
        out.add_date(
            f.indexed_at,
            tantivy::DateTime::from_timestamp_secs(Utc::now().timestamp()),
        );

        Ok(out)
    }

    fn read_document(&self, doc: &TantivyDocument) -> Result<IndexDocument> {
        let f = self.fields;
        let text = |field: Field| {
            doc.get_first(field)
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };
        let required = |field: Field, name: &str| {
            text(field)
                .ok_or_else(|| StrataError::StorageError(format!("Stored document lacks {name}")))
        };

        let kind = required(f.kind, "kind")?
            .parse::<DocKind>()
            .map_err(StrataError::StorageError)?;
        let fields: BTreeMap<String, Vec<String>> =
            serde_json::from_str(&required(f.fields_json, "fields_json")?)?;
        let position = doc
            .get_first(f.position)
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as usize;

        Ok(IndexDocument {
            identifier: required(f.pi, "pi")?,
            kind,
            parent: text(f.parent_pi),
            root: required(f.root_pi, "root_pi")?,
            position,
            anchor_identifier: text(f.anchor_pi),
            fields,
        })
    }
}

impl IndexClient for TantivyIndex {
    fn upsert(&mut self, doc: &IndexDocument) -> Result<()> {
        let document = self.build_document(doc)?;
        self.writer
            .delete_term(Term::from_field_text(self.fields.pi, &doc.identifier));
        self.writer
            .add_document(document)
            .map_err(|e| StrataError::StorageError(format!("Failed to add document: {e}")))?;
        Ok(())
    }

    fn delete(&mut self, identifier: &str) -> Result<()> {
        self.writer
            .delete_term(Term::from_field_text(self.fields.pi, identifier));
        Ok(())
    }

    fn delete_tree(&mut self, root: &str) -> Result<()> {
        self.writer
            .delete_term(Term::from_field_text(self.fields.root_pi, root));
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.writer
            .commit()
            .map_err(|e| StrataError::StorageError(format!("Failed to commit: {e}")))?;
        self.reader
            .reload()
            .map_err(|e| StrataError::StorageError(format!("Failed to reload reader: {e}")))?;
        debug!("Index committed, {} documents visible", self.num_docs());
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.writer
            .rollback()
            .map_err(|e| StrataError::StorageError(format!("Failed to roll back: {e}")))?;
        Ok(())
    }
}
