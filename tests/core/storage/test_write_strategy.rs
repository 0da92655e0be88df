// Integration tests for buffered, all-or-nothing commits

use crate::common::{test_pipeline, RecordFolder, METS_VOLUME};
use std::path::Path;
use std::sync::Mutex;
use strata::core::error::{Result, StrataError};
use strata::core::indexer::{IndexerPipeline, PipelineSettings};
use strata::core::storage::{
    select_strategy, DiskWriteStrategy, IndexClient, TantivyIndex, WriteMode, WriteStrategy,
};
use strata::core::types::{IndexDocument, IndexJob, IndexOutcome};
use tempfile::TempDir;

/// Tantivy client that fails when it reaches one identifier
struct FlakyIndex {
    inner: TantivyIndex,
    fail_on: Option<String>,
    rollbacks: usize,
}

impl FlakyIndex {
    fn new(dir: &TempDir) -> Self {
        Self {
            inner: TantivyIndex::create(&dir.path().join("index")).unwrap(),
            fail_on: None,
            rollbacks: 0,
        }
    }
}

impl IndexClient for FlakyIndex {
    fn upsert(&mut self, doc: &IndexDocument) -> Result<()> {
        if self.fail_on.as_deref() == Some(doc.identifier.as_str()) {
            return Err(StrataError::StorageError("disk quota exceeded".to_string()));
        }
        self.inner.upsert(doc)
    }

    fn delete(&mut self, identifier: &str) -> Result<()> {
        self.inner.delete(identifier)
    }

    fn delete_tree(&mut self, root: &str) -> Result<()> {
        self.inner.delete_tree(root)
    }

    fn commit(&mut self) -> Result<()> {
        self.inner.commit()
    }

    fn rollback(&mut self) -> Result<()> {
        self.rollbacks += 1;
        self.inner.rollback()
    }
}

fn settings(threshold: usize, temp_dir: &TempDir) -> PipelineSettings {
    PipelineSettings {
        disk_threshold_bytes: threshold,
        temp_dir: Some(temp_dir.path().join("spool")),
        ..PipelineSettings::default()
    }
}

fn run_ok(pipeline: &IndexerPipeline, client: &Mutex<FlakyIndex>, path: &Path) -> IndexOutcome {
    let outcome = pipeline.run(&IndexJob::new(path), client);
    assert!(outcome.is_success(), "{:?}", outcome.error);
    outcome
}

fn spool_files(temp_dir: &TempDir) -> usize {
    std::fs::read_dir(temp_dir.path().join("spool"))
        .map(|entries| entries.count())
        .unwrap_or(0)
}

#[test]
fn test_failed_reindex_keeps_previous_version() {
    let folder = RecordFolder::with_records(&[("PPN100_V1.xml", METS_VOLUME)]);
    let path = folder.record("PPN100_V1.xml");
    let temp_dir = TempDir::new().unwrap();

    for threshold in [usize::MAX, 1] {
        let index_dir = TempDir::new().unwrap();
        let client = Mutex::new(FlakyIndex::new(&index_dir));
        let pipeline = test_pipeline(settings(threshold, &temp_dir));

        run_ok(&pipeline, &client, &path);
        let before = client.lock().unwrap().inner.load_tree("PPN100_V1").unwrap();

        client.lock().unwrap().fail_on = Some("PPN100_V1_PAGE_2".to_string());
        let outcome = pipeline.run(&IndexJob::new(&path), &client);

        assert!(!outcome.is_success());
        assert!(outcome.identifiers.is_empty());
        let error = outcome.error.unwrap();
        assert!(error.contains("batch aborted"), "{error}");

        let client = client.lock().unwrap();
        assert_eq!(client.rollbacks, 1);
        assert_eq!(client.inner.num_docs(), 6);
        assert_eq!(client.inner.load_tree("PPN100_V1").unwrap(), before);
    }
    assert_eq!(spool_files(&temp_dir), 0);
}

#[test]
fn test_spool_file_released_after_commit() {
    let folder = RecordFolder::with_records(&[("PPN100_V1.xml", METS_VOLUME)]);
    let temp_dir = TempDir::new().unwrap();
    let index_dir = TempDir::new().unwrap();
    let client = Mutex::new(FlakyIndex::new(&index_dir));
    let pipeline = test_pipeline(settings(1, &temp_dir));

    let outcome = run_ok(&pipeline, &client, &folder.record("PPN100_V1.xml"));
    assert_eq!(outcome.write_mode, Some(WriteMode::Disk));
    assert_eq!(spool_files(&temp_dir), 0);
}

#[test]
fn test_prepared_tree_commits_through_either_strategy() {
    let folder = RecordFolder::with_records(&[("PPN100_V1.xml", METS_VOLUME)]);
    let pipeline = test_pipeline(PipelineSettings::default());
    let prepared = pipeline
        .prepare(&IndexJob::new(folder.record("PPN100_V1.xml")))
        .unwrap();
    let size = prepared.tree.estimated_size();
    let temp_dir = TempDir::new().unwrap();

    let mut trees = Vec::new();
    for threshold in [size + 1, size] {
        let index_dir = TempDir::new().unwrap();
        let mut client = FlakyIndex::new(&index_dir);
        let mut strategy = select_strategy(size, threshold, Some(temp_dir.path())).unwrap();
        strategy.add(prepared.tree.clone()).unwrap();
        assert_eq!(strategy.len(), 6);

        assert_eq!(strategy.commit(&mut client).unwrap(), 6);
        assert!(strategy.is_empty());
        trees.push((strategy.mode(), client.inner.load_tree("PPN100_V1").unwrap()));
    }

    assert_eq!(trees[0].0, WriteMode::Memory);
    assert_eq!(trees[1].0, WriteMode::Disk);
    assert_eq!(trees[0].1, trees[1].1);
    assert_eq!(trees[0].1, prepared.tree);
}

#[test]
fn test_discarded_disk_buffer_leaves_nothing() {
    let folder = RecordFolder::with_records(&[("PPN100_V1.xml", METS_VOLUME)]);
    let pipeline = test_pipeline(PipelineSettings::default());
    let prepared = pipeline
        .prepare(&IndexJob::new(folder.record("PPN100_V1.xml")))
        .unwrap();
    let temp_dir = TempDir::new().unwrap();

    let mut strategy = DiskWriteStrategy::new(Some(temp_dir.path())).unwrap();
    strategy.add(prepared.tree).unwrap();
    let path = strategy.path().unwrap();
    assert!(path.exists());

    strategy.discard();
    assert!(strategy.path().is_none());
    assert!(!path.exists());

    let index_dir = TempDir::new().unwrap();
    let mut client = FlakyIndex::new(&index_dir);
    assert!(matches!(
        strategy.commit(&mut client),
        Err(StrataError::CommitError(_))
    ));
    assert_eq!(client.inner.num_docs(), 0);
}
