// Integration tests for reading indexed records back from Tantivy

use crate::common::{create_test_index, index_record, test_pipeline, RecordFolder};
use std::sync::Mutex;
use strata::core::error::StrataError;
use strata::core::indexer::PipelineSettings;
use strata::core::storage::TantivyIndex;
use strata::core::types::{DocKind, IndexJob};
use tempfile::TempDir;

#[test]
fn test_loaded_tree_matches_prepared_tree() {
    let folder = RecordFolder::all_formats();
    let (index, _dir) = create_test_index();
    let pipeline = test_pipeline(PipelineSettings::default());

    for name in ["PPN100_V1.xml", "EAD_FAM_1.xml", "LIDO_OBJ_7.xml"] {
        let path = folder.record(name);
        let prepared = pipeline.prepare(&IndexJob::new(&path)).unwrap();
        index_record(&pipeline, &index, &path);

        let loaded = index
            .lock()
            .unwrap()
            .load_tree(&prepared.tree.identifier)
            .unwrap();
        assert_eq!(loaded, prepared.tree, "{name} changed on the way through the index");
    }
}

#[test]
fn test_children_follow_document_order() {
    let folder = RecordFolder::all_formats();
    let (index, _dir) = create_test_index();
    let pipeline = test_pipeline(PipelineSettings::default());
    index_record(&pipeline, &index, &folder.record("PPN100_V1.xml"));

    let index = index.lock().unwrap();
    let ids: Vec<String> = index
        .children("PPN100_V1")
        .unwrap()
        .into_iter()
        .map(|d| d.identifier)
        .collect();
    assert_eq!(
        ids,
        vec![
            "PPN100_V1_LOG_2",
            "PPN100_V1_LOG_3",
            "PPN100_V1_PAGE_1",
            "PPN100_V1_PAGE_2"
        ]
    );

    let section = index.get("PPN100_V1_LOG_4").unwrap().unwrap();
    assert_eq!(section.parent.as_deref(), Some("PPN100_V1_LOG_3"));
    assert_eq!(section.root, "PPN100_V1");
    assert!(index.children("PPN100_V1_PAGE_1").unwrap().is_empty());
}

#[test]
fn test_index_persists_across_reopen() {
    let folder = RecordFolder::all_formats();
    let temp_dir = TempDir::new().unwrap();
    let index_dir = temp_dir.path().join("index");
    let pipeline = test_pipeline(PipelineSettings::default());

    let index = Mutex::new(TantivyIndex::open_or_create(&index_dir).unwrap());
    index_record(&pipeline, &index, &folder.record("EAD_FAM_1.xml"));
    index_record(&pipeline, &index, &folder.record("DC_LETTER_12.xml"));
    drop(index);

    let reopened = TantivyIndex::open_or_create(&index_dir).unwrap();
    assert_eq!(reopened.num_docs(), 5);
    let tree = reopened.load_tree("EAD_FAM_1").unwrap();
    assert_eq!(tree.count(), 4);
    assert_eq!(reopened.get("DC_LETTER_12").unwrap().unwrap().kind, DocKind::Volume);
}

#[test]
fn test_delete_record_removes_whole_tree() {
    let folder = RecordFolder::all_formats();
    let (index, _dir) = create_test_index();
    let pipeline = test_pipeline(PipelineSettings::default());
    index_record(&pipeline, &index, &folder.record("LIDO_OBJ_7.xml"));
    index_record(&pipeline, &index, &folder.record("DC_LETTER_12.xml"));

    let mut index = index.lock().unwrap();
    assert_eq!(index.delete_record("LIDO_OBJ_7").unwrap(), 3);
    assert_eq!(index.num_docs(), 1);
    assert!(index.get("LIDO_OBJ_7_PAGE_1").unwrap().is_none());
    assert!(index.get("DC_LETTER_12").unwrap().is_some());

    assert!(matches!(
        index.delete_record("LIDO_OBJ_7"),
        Err(StrataError::RecordNotFound(_))
    ));
}

#[test]
fn test_load_missing_tree() {
    let (index, _dir) = create_test_index();
    let index = index.lock().unwrap();
    assert!(matches!(
        index.load_tree("PPN404"),
        Err(StrataError::RecordNotFound(_))
    ));
    assert!(index.volumes_of("PPN404").unwrap().is_empty());
}
