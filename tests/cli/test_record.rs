//! Tests for show-record and delete-record CLI commands

use crate::cli::test_helpers::{create_cli_test_services, index_folder};
use crate::common::RecordFolder;
use strata::cli::commands::record::{execute_delete, execute_show, DeleteArgs, ShowArgs};
use strata::cli::OutputFormat;

/// Test showing an anchor with its volumes
#[tokio::test]
async fn test_show_record_human() {
    let (services, _storage_temp) = create_cli_test_services();
    let folder = RecordFolder::all_formats();
    index_folder(&services, &folder).await;

    let args = ShowArgs {
        pi: "PPN100".to_string(),
        tree: false,
    };
    let result = execute_show(args, &services, OutputFormat::Human).await;
    assert!(result.is_ok(), "Show should succeed: {:?}", result.err());
}

/// Test showing a record with its tree in both formats
#[tokio::test]
async fn test_show_record_tree() {
    let (services, _storage_temp) = create_cli_test_services();
    let folder = RecordFolder::all_formats();
    index_folder(&services, &folder).await;

    for format in [OutputFormat::Human, OutputFormat::Json] {
        let args = ShowArgs {
            pi: "PPN100_V1".to_string(),
            tree: true,
        };
        assert!(execute_show(args, &services, format).await.is_ok());
    }

    // Sections and pages can be shown on their own
    let args = ShowArgs {
        pi: "PPN100_V1_PAGE_2".to_string(),
        tree: false,
    };
    assert!(execute_show(args, &services, OutputFormat::Json).await.is_ok());
}

/// Test showing a record that was never indexed
#[tokio::test]
async fn test_show_record_not_found() {
    let (services, _storage_temp) = create_cli_test_services();

    let args = ShowArgs {
        pi: "PPN404".to_string(),
        tree: true,
    };
    let err = execute_show(args, &services, OutputFormat::Human)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not found"), "{err}");
}

/// Test deleting a record removes its sections and pages
#[tokio::test]
async fn test_delete_record_force() {
    let (services, _storage_temp) = create_cli_test_services();
    let folder = RecordFolder::all_formats();
    index_folder(&services, &folder).await;
    let before = services.index.lock().unwrap().num_docs();

    let args = DeleteArgs {
        pi: "PPN100_V1".to_string(),
        force: true,
    };
    let result = execute_delete(args, &services, OutputFormat::Json).await;
    assert!(result.is_ok(), "Delete should succeed: {:?}", result.err());

    let index = services.index.lock().unwrap();
    assert_eq!(index.num_docs(), before - 6);
    assert!(index.get("PPN100_V1_LOG_3").unwrap().is_none());
    assert!(index.get("PPN100").unwrap().is_some());
    assert!(index.volumes_of("PPN100").unwrap().is_empty());
}

/// Test deleting a record that does not exist
#[tokio::test]
async fn test_delete_record_not_found() {
    let (services, _storage_temp) = create_cli_test_services();

    let args = DeleteArgs {
        pi: "PPN404".to_string(),
        force: true,
    };
    let err = execute_delete(args, &services, OutputFormat::Human)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not found"));
}
