//! Indexing pipeline orchestration.
//!
//! Runs one job through the fixed sequence of steps:
//! 1. Validate: read and parse the record file
//! 2. Classify: pick the variant and its schema kind
//! 3. Structure: decompose the record into a document tree
//! 4. Resolve: link volumes to their anchor
//! 5. Root path: attach the collection path, if the variant has one
//! 6. Emit: buffer the tree and commit it as one batch
//! 7. Report: build the [`IndexOutcome`]
//!
//! Steps 1 to 3 may fail the job; nothing is written in that case.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::core::config::Config;
use crate::core::connector::Connector;
use crate::core::error::{Result, StrataError};
use crate::core::indexer::structure;
use crate::core::resolver::AnchorResolver;
use crate::core::source::{NamespaceTable, SourceRecord};
use crate::core::storage::{select_strategy, IndexClient, WriteMode};
use crate::core::types::{
    field, is_valid_identifier, AnchorLink, DocKind, IndexJob, IndexOutcome, IndexWarning,
    StructuralDocument, WarningKind,
};
use crate::core::variant::{FormatRegistry, FormatVariant, SchemaKind};

/// Tunables of a pipeline, usually taken from [`Config`]
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Variant used when detection finds none
    pub default_variant: String,
    pub default_collection: String,
    pub collection_separator: String,
    pub disk_threshold_bytes: usize,
    pub temp_dir: Option<PathBuf>,
    pub fetch_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_variant: config.indexing.default_variant.clone(),
            default_collection: config.indexing.default_collection.clone(),
            collection_separator: config.indexing.collection_separator.clone(),
            disk_threshold_bytes: config.write.disk_threshold_bytes,
            temp_dir: config.write.temp_dir.clone(),
            fetch_timeout: Duration::from_secs(config.limits.fetch_timeout_sec),
        }
    }
}

/// A record decomposed and resolved, ready to be written
#[derive(Debug)]
pub struct Prepared {
    pub tree: StructuralDocument,
    pub warnings: Vec<IndexWarning>,
    pub variant: String,
    pub schema_kind: SchemaKind,
    pub anchor: Option<AnchorLink>,
}

/// Orchestrates the indexing of single record files
pub struct IndexerPipeline {
    registry: Arc<FormatRegistry>,
    variant: Option<Arc<FormatVariant>>,
    settings: PipelineSettings,
    connector: Option<Arc<dyn Connector>>,
}

impl IndexerPipeline {
    /// Create a pipeline that detects each record's variant
    pub fn new(registry: Arc<FormatRegistry>, settings: PipelineSettings) -> Self {
        Self {
            registry,
            variant: None,
            settings,
            connector: None,
        }
    }

    pub fn from_config(registry: Arc<FormatRegistry>, config: &Config) -> Self {
        Self::new(registry, PipelineSettings::from_config(config))
    }

    /// Read every record with the named variant instead of detecting one
    pub fn with_variant(mut self, name: &str) -> Result<Self> {
        self.variant = Some(self.registry.get(name)?);
        Ok(self)
    }

    /// Follow remote anchor pointers and download images through `connector`
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<FormatRegistry> {
        &self.registry
    }

    /// Run `job` and commit its documents to `client`
    ///
    /// Never fails: fatal errors are reported in the outcome and leave
    /// the index untouched.
    pub fn run<C: IndexClient>(&self, job: &IndexJob, client: &Mutex<C>) -> IndexOutcome {
        let start = Instant::now();
        let mut outcome = IndexOutcome::new(job.file_path.clone());
        info!("Indexing {:?}", job.file_path);

        match self.prepare(job) {
            Ok(prepared) => {
                outcome.schema_kind = Some(prepared.schema_kind.as_str().to_string());
                outcome.anchor = prepared.anchor.clone();
                outcome.warnings = prepared.warnings;

                let mut identifiers = Vec::with_capacity(prepared.tree.count());
                collect_identifiers(&prepared.tree, &mut identifiers);

                match self.emit(prepared.tree, client) {
                    Ok(mode) => {
                        outcome.identifiers = identifiers;
                        outcome.write_mode = Some(mode);
                    }
                    Err(e) => outcome.error = Some(e.to_string()),
                }
            }
            Err(e) => {
                if !e.is_fatal_input() {
                    error!("Indexing {:?} failed outside the record: {}", job.file_path, e);
                }
                outcome.error = Some(e.to_string());
            }
        }

        outcome.duration_ms = start.elapsed().as_millis() as u64;
        match &outcome.error {
            None => info!(
                "Indexed {:?}: {} documents, {} warnings in {}ms",
                job.file_path,
                outcome.identifiers.len(),
                outcome.warnings.len(),
                outcome.duration_ms
            ),
            Some(e) => warn!("Failed to index {:?}: {}", job.file_path, e),
        }
        outcome
    }

    /// Validate, classify, decompose and resolve one record
    pub fn prepare(&self, job: &IndexJob) -> Result<Prepared> {
        // Step 1: Validate
        let record = read_record(&job.file_path)?;

        // Step 2: Classify
        let variant = self.select_variant(&record)?;
        let record = record.with_namespaces(Arc::clone(variant.namespaces()));
        let schema_kind = variant.classify(&record)?;
        debug!("{:?} read as {} ({})", job.file_path, variant.name(), schema_kind.as_str());

        // Step 3: Structure
        let pi = variant.identifier(&record).ok_or_else(|| {
            StrataError::MissingIdentifier(format!(
                "{} record {:?} has no identifier",
                variant.name(),
                job.file_path
            ))
        })?;
        if !is_valid_identifier(&pi) {
            return Err(StrataError::MissingIdentifier(format!(
                "'{pi}' in {:?} is not a usable identifier",
                job.file_path
            )));
        }
        let structure::Structure {
            mut tree,
            mut warnings,
            ..
        } = structure::build(&record, &variant, &pi, job.page_count_start);

        // Step 4: Resolve
        let resolver = match &self.connector {
            Some(connector) => {
                AnchorResolver::with_connector(connector.as_ref(), self.settings.fetch_timeout)
            }
            None => AnchorResolver::local(),
        };
        let resolution = resolver.resolve(&record, &variant);
        warnings.extend(resolution.warnings.iter().cloned());

        let anchor = resolution.link(&pi);
        if variant.is_anchor(&record) {
            tree.kind = DocKind::Anchor;
        } else if let Some(link) = &anchor {
            tree.mark_volume(link.anchor_identifier.clone());
            tree.add_field(field::ANCHOR_SOURCE, link.source.clone());
        }

        // Step 5: Root path
        let root_path = variant.root_path(
            &record,
            &self.settings.default_collection,
            &self.settings.collection_separator,
        );
        if !root_path.is_empty() {
            tree.set_field(field::ROOT_PATH, root_path);
        }
        if let Some(query) = variant.collection_query() {
            for collection in record.select_all_text(query, None) {
                tree.add_field(field::COLLECTION, collection);
            }
        }
        tree.add_field(field::SOURCE_FILE, job.file_path.display().to_string());
        tree.tag_all(field::SCHEMA_KIND, schema_kind.as_str());

        if job.download_external_images {
            self.download_images(job, &mut tree, &mut warnings);
        }

        Ok(Prepared {
            tree,
            warnings,
            variant: variant.name().to_string(),
            schema_kind,
            anchor,
        })
    }

    fn select_variant(&self, record: &SourceRecord) -> Result<Arc<FormatVariant>> {
        if let Some(variant) = &self.variant {
            return Ok(Arc::clone(variant));
        }
        match self.registry.detect(record) {
            Some(variant) => Ok(variant),
            None => {
                debug!(
                    "No variant accepts the record, trying default '{}'",
                    self.settings.default_variant
                );
                self.registry.get(&self.settings.default_variant)
            }
        }
    }

    /// Step 6: buffer the tree and commit it while holding the client
    fn emit<C: IndexClient>(&self, tree: StructuralDocument, client: &Mutex<C>) -> Result<WriteMode> {
        let mut strategy = select_strategy(
            tree.estimated_size(),
            self.settings.disk_threshold_bytes,
            self.settings.temp_dir.as_deref(),
        )?;
        let mode = strategy.mode();

        if let Err(e) = strategy.add(tree) {
            strategy.discard();
            return Err(e);
        }

        let mut guard = client
            .lock()
            .map_err(|e| StrataError::StorageError(format!("Index client lock poisoned: {e}")))?;
        let written = strategy.commit(&mut *guard)?;
        debug!("Committed {} documents ({} buffer)", written, mode);
        Ok(mode)
    }

    fn download_images(
        &self,
        job: &IndexJob,
        tree: &mut StructuralDocument,
        warnings: &mut Vec<IndexWarning>,
    ) {
        let Some(media) = job.data_folders.get("media") else {
            debug!("No media folder for {:?}, skipping image download", job.file_path);
            return;
        };
        let Some(connector) = &self.connector else {
            return;
        };

        for page in tree.children.iter_mut().filter(|c| c.kind == DocKind::Page) {
            let Some(url) = page.field(field::IMAGE).map(str::to_string) else {
                continue;
            };
            if !url.starts_with("http://") && !url.starts_with("https://") {
                continue;
            }

            let target = media.join(format!("{}.{}", page.identifier, image_extension(&url)));
            let result = connector
                .fetch(&url, self.settings.fetch_timeout)
                .and_then(|bytes| fs::write(&target, bytes).map_err(StrataError::from));
            match result {
                Ok(()) => page.add_field(field::IMAGE_LOCAL, target.display().to_string()),
                Err(e) => {
                    warn!("Image download for {} failed: {}", page.identifier, e);
                    warnings.push(IndexWarning::new(
                        WarningKind::RemoteFetch,
                        Some(page.identifier.clone()),
                        format!("image download failed: {e}"),
                    ));
                }
            }
        }
    }
}

fn read_record(path: &Path) -> Result<SourceRecord> {
    if !path.is_file() {
        return Err(StrataError::InvalidPath(format!(
            "{} is not a readable file",
            path.display()
        )));
    }
    SourceRecord::from_file(path, Arc::new(NamespaceTable::new()))
}

fn collect_identifiers(node: &StructuralDocument, out: &mut Vec<String>) {
    out.push(node.identifier.clone());
    for child in &node.children {
        collect_identifiers(child, out);
    }
}

/// File extension of an image URL, `jpg` when it has none
fn image_extension(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.len() <= 5)
        .unwrap_or("jpg")
}
