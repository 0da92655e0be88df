// Integration tests for folder scans and the concurrent job runner

use crate::common::{create_test_services, RecordFolder, METS_VOLUME};
use strata::core::indexer::{data_folders_for, RecordWalker};
use strata::core::types::{DocKind, IndexJob};

#[tokio::test]
async fn test_index_folder_of_all_formats() {
    let folder = RecordFolder::all_formats();
    let (services, _dir) = create_test_services();

    let walker = RecordWalker::new(&services.config.indexing.include_patterns, 10).unwrap();
    let files = walker.collect_records(folder.path()).unwrap();
    assert_eq!(files.len(), 7);

    let jobs: Vec<IndexJob> = files.iter().map(IndexJob::new).collect();
    let outcomes = services.runner(services.pipeline()).run_all(jobs).await;

    assert_eq!(outcomes.len(), 7);
    for outcome in &outcomes {
        assert!(
            outcome.is_success(),
            "{:?}: {:?}",
            outcome.file_path,
            outcome.error
        );
    }

    // Outcomes come back in job order
    let paths: Vec<_> = outcomes.iter().map(|o| o.file_path.clone()).collect();
    assert_eq!(paths, files);

    let written: usize = outcomes.iter().map(|o| o.identifiers.len()).sum();
    let index = services.index.lock().unwrap();
    assert_eq!(index.num_docs() as usize, written);
    assert_eq!(index.get("PPN100").unwrap().unwrap().kind, DocKind::Anchor);
    assert_eq!(index.get("PPN100_V1").unwrap().unwrap().kind, DocKind::Volume);
}

#[tokio::test]
async fn test_runner_reports_failures_per_job() {
    let folder = RecordFolder::with_records(&[
        ("a.xml", METS_VOLUME),
        ("b.xml", "<unclosed"),
        ("c.xml", METS_VOLUME),
    ]);
    let (services, _dir) = create_test_services();

    let jobs = folder.files.iter().map(IndexJob::new).collect();
    let outcomes = services.runner(services.pipeline()).run_all(jobs).await;

    let succeeded: Vec<bool> = outcomes.iter().map(|o| o.is_success()).collect();
    assert_eq!(succeeded, vec![true, false, true]);

    // a.xml and c.xml share an identifier; the second commit replaces the first
    let index = services.index.lock().unwrap();
    assert_eq!(index.num_docs() as usize, outcomes[0].identifiers.len());
}

#[test]
fn test_data_folders_are_attached_to_records() {
    let folder = RecordFolder::with_records(&[
        ("PPN100_V1.xml", METS_VOLUME),
        ("PPN100_V1_media/00000001.jpg", "jpg"),
        ("PPN100_V1_fulltext/00000001.txt", "text"),
    ]);

    let walker = RecordWalker::new(&["*.xml".to_string()], 10).unwrap();
    let files = walker.collect_records(folder.path()).unwrap();
    assert_eq!(files, vec![folder.record("PPN100_V1.xml")]);

    let folders = data_folders_for(&files[0]);
    assert_eq!(folders.len(), 2);
    assert_eq!(folders["media"], folder.record("PPN100_V1_media"));
    assert_eq!(folders["fulltext"], folder.record("PPN100_V1_fulltext"));
}
