// Integration tests for pipeline runs over every supported format

use crate::common::{
    create_test_index, index_record, test_pipeline, RecordFolder, DUBLIN_CORE, EAD2, EAD3, LIDO,
    METS_ANCHOR, METS_MARC_VOLUME, METS_VOLUME,
};
use strata::core::indexer::PipelineSettings;
use strata::core::storage::WriteMode;
use strata::core::types::{field, DocKind, IndexJob};

#[test]
fn test_mets_volume_tree() {
    let folder = RecordFolder::with_records(&[("PPN100_V1.xml", METS_VOLUME)]);
    let (index, _dir) = create_test_index();
    let pipeline = test_pipeline(PipelineSettings::default());

    let outcome = index_record(&pipeline, &index, &folder.record("PPN100_V1.xml"));
    assert_eq!(
        outcome.identifiers,
        vec![
            "PPN100_V1",
            "PPN100_V1_LOG_2",
            "PPN100_V1_LOG_3",
            "PPN100_V1_LOG_4",
            "PPN100_V1_PAGE_1",
            "PPN100_V1_PAGE_2",
        ]
    );
    assert_eq!(outcome.schema_kind.as_deref(), Some("METS"));
    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);

    let index = index.lock().unwrap();
    let tree = index.load_tree("PPN100_V1").unwrap();
    assert_eq!(tree.kind, DocKind::Volume);
    assert_eq!(tree.anchor_identifier.as_deref(), Some("PPN100"));
    assert_eq!(tree.field(field::TITLE), Some("Annual Report 1901"));
    assert_eq!(tree.field("author"), Some("Statistical Office"));
    assert_eq!(
        tree.fields[field::ROOT_PATH],
        vec!["History".to_string(), "History.Periodicals".to_string()]
    );

    let chapters = &tree.children[1];
    assert_eq!(chapters.kind, DocKind::SubStructure);
    assert_eq!(chapters.field(field::LABEL), Some("Accounts"));
    assert_eq!(chapters.children[0].identifier, "PPN100_V1_LOG_4");

    let cover = index.get("PPN100_V1_PAGE_1").unwrap().unwrap();
    assert_eq!(cover.kind, DocKind::Page);
    assert_eq!(cover.field(field::IMAGE), Some("images/00000001.jpg"));
    assert_eq!(cover.field(field::LABEL), Some("[Cover]"));
    assert_eq!(cover.field(field::SCHEMA_KIND), Some("METS"));
}

#[test]
fn test_anchor_and_volumes_are_linked_by_identifier() {
    let folder = RecordFolder::all_formats();
    let (index, _dir) = create_test_index();
    let pipeline = test_pipeline(PipelineSettings::default());

    // Volume before anchor: forward references are stored as-is
    index_record(&pipeline, &index, &folder.record("PPN100_V1.xml"));
    index_record(&pipeline, &index, &folder.record("PPN100.xml"));

    let index = index.lock().unwrap();
    let anchor = index.get("PPN100").unwrap().unwrap();
    assert_eq!(anchor.kind, DocKind::Anchor);
    assert_eq!(anchor.anchor_identifier, None);

    let volumes = index.volumes_of("PPN100").unwrap();
    assert_eq!(volumes.len(), 1);
    assert_eq!(volumes[0].identifier, "PPN100_V1");
}

#[test]
fn test_mets_marc_volume() {
    let folder = RecordFolder::with_records(&[("PPN200_V3.xml", METS_MARC_VOLUME)]);
    let (index, _dir) = create_test_index();
    let pipeline = test_pipeline(PipelineSettings::default());

    let outcome = index_record(&pipeline, &index, &folder.record("PPN200_V3.xml"));
    assert_eq!(outcome.schema_kind.as_deref(), Some("METS_MARC"));
    let anchor = outcome.anchor.unwrap();
    assert_eq!(anchor.anchor_identifier, "PPN200");
    assert_eq!(anchor.source, "marc:773$w");
    assert_eq!(outcome.warnings.len(), 1);

    let index = index.lock().unwrap();
    let root = index.get("PPN200_V3").unwrap().unwrap();
    assert_eq!(root.field(field::TITLE), Some("Atlas, Part 3"));
    assert_eq!(root.field(field::COLLECTION), Some("Maps"));
    assert_eq!(root.field(field::ANCHOR_SOURCE), Some("marc:773$w"));
}

#[test]
fn test_ead_components_without_root_path() {
    let folder = RecordFolder::with_records(&[("ead.xml", EAD2), ("ead3.xml", EAD3)]);
    let (index, _dir) = create_test_index();
    let pipeline = test_pipeline(PipelineSettings::default());

    let outcome = index_record(&pipeline, &index, &folder.record("ead.xml"));
    assert_eq!(
        outcome.identifiers,
        vec!["EAD_FAM_1", "EAD_FAM_1_s1", "EAD_FAM_1_s1_f1", "EAD_FAM_1_s2"]
    );
    let outcome = index_record(&pipeline, &index, &folder.record("ead3.xml"));
    assert_eq!(outcome.identifiers, vec!["EAD3_TOWN", "EAD3_TOWN_m1"]);
    assert_eq!(outcome.schema_kind.as_deref(), Some("EAD3"));

    let index = index.lock().unwrap();
    let tree = index.load_tree("EAD_FAM_1").unwrap();
    assert_eq!(tree.kind, DocKind::TopLevel);
    assert_eq!(tree.field(field::TITLE), Some("Family Papers"));
    assert!(!tree.fields.contains_key(field::ROOT_PATH));
    assert_eq!(tree.children[0].field("level"), Some("series"));
    assert_eq!(tree.children[0].children[0].field(field::TITLE), Some("1850-1860"));

    let ead3 = index.get("EAD3_TOWN").unwrap().unwrap();
    assert!(ead3.field(field::ROOT_PATH).is_none());
}

#[test]
fn test_lido_resource_sets_become_pages() {
    let folder = RecordFolder::with_records(&[("lido.xml", LIDO)]);
    let (index, _dir) = create_test_index();
    let pipeline = test_pipeline(PipelineSettings::default());

    let outcome = index_record(&pipeline, &index, &folder.record("lido.xml"));
    assert_eq!(
        outcome.identifiers,
        vec!["LIDO_OBJ_7", "LIDO_OBJ_7_PAGE_1", "LIDO_OBJ_7_PAGE_2"]
    );

    let index = index.lock().unwrap();
    let root = index.get("LIDO_OBJ_7").unwrap().unwrap();
    assert_eq!(root.field(field::TITLE), Some("Harbour at Dusk"));
    assert_eq!(root.field("object_type"), Some("Painting"));
    assert_eq!(root.field(field::ROOT_PATH), Some("unsorted"));

    let back = index.get("LIDO_OBJ_7_PAGE_2").unwrap().unwrap();
    assert_eq!(back.field(field::LABEL), Some("Back"));
    assert_eq!(
        back.field(field::IMAGE),
        Some("https://images.example.org/obj7/back.jpg")
    );
}

#[test]
fn test_dublin_core_uses_default_collection() {
    let folder = RecordFolder::with_records(&[("dc.xml", DUBLIN_CORE)]);
    let (index, _dir) = create_test_index();
    let settings = PipelineSettings {
        default_collection: "letters.incoming".to_string(),
        ..PipelineSettings::default()
    };
    let pipeline = test_pipeline(settings);

    index_record(&pipeline, &index, &folder.record("dc.xml"));

    let index = index.lock().unwrap();
    let root = index.get("DC_LETTER_12").unwrap().unwrap();
    assert_eq!(root.kind, DocKind::Volume);
    assert_eq!(root.anchor_identifier.as_deref(), Some("DC_SERIES_1"));
    assert_eq!(
        root.fields[field::ROOT_PATH],
        vec!["letters".to_string(), "letters.incoming".to_string()]
    );
}

#[test]
fn test_latin1_record_is_decoded() {
    let folder = RecordFolder::with_records(&[]);
    let xml = DUBLIN_CORE
        .replace("UTF-8", "ISO-8859-1")
        .replace("Letter to the Mayor", "Lettre \u{e0} l'\u{e9}v\u{ea}que");
    let latin1: Vec<u8> = xml.chars().map(|c| c as u32 as u8).collect();
    let path = folder.record("dc_latin1.xml");
    std::fs::write(&path, latin1).unwrap();

    let (index, _dir) = create_test_index();
    let pipeline = test_pipeline(PipelineSettings::default());
    index_record(&pipeline, &index, &path);

    let index = index.lock().unwrap();
    let root = index.get("DC_LETTER_12").unwrap().unwrap();
    assert_eq!(
        root.field(field::TITLE),
        Some("Lettre \u{e0} l'\u{e9}v\u{ea}que")
    );
}

#[test]
fn test_undeclared_non_utf8_record_is_a_parse_error() {
    let folder = RecordFolder::with_records(&[]);
    let path = folder.record("broken.xml");
    std::fs::write(&path, b"<oai_dc:dc xmlns:oai_dc=\"x\">\xE9</oai_dc:dc>").unwrap();

    let (index, _dir) = create_test_index();
    let pipeline = test_pipeline(PipelineSettings::default());
    let outcome = pipeline.run(&IndexJob::new(&path), &index);
    assert!(!outcome.is_success());
    assert!(
        outcome.error.as_deref().unwrap_or_default().contains("UTF-8"),
        "{:?}",
        outcome.error
    );
}

#[test]
fn test_reindexing_is_idempotent() {
    let folder = RecordFolder::with_records(&[("PPN100_V1.xml", METS_VOLUME)]);
    let (index, _dir) = create_test_index();
    let pipeline = test_pipeline(PipelineSettings::default());
    let path = folder.record("PPN100_V1.xml");

    index_record(&pipeline, &index, &path);
    let first = index.lock().unwrap().load_tree("PPN100_V1").unwrap();
    let count = index.lock().unwrap().num_docs();

    let outcome = pipeline.run(&IndexJob::new(&path).with_page_count_start(1), &index);
    assert!(outcome.is_success());

    let index = index.lock().unwrap();
    assert_eq!(index.num_docs(), count);
    assert_eq!(index.load_tree("PPN100_V1").unwrap(), first);
}

#[test]
fn test_reindexing_removes_dropped_nodes() {
    let folder = RecordFolder::with_records(&[("PPN100_V1.xml", METS_VOLUME)]);
    let (index, _dir) = create_test_index();
    let pipeline = test_pipeline(PipelineSettings::default());
    let path = folder.record("PPN100_V1.xml");

    index_record(&pipeline, &index, &path);
    assert!(index.lock().unwrap().get("PPN100_V1_LOG_4").unwrap().is_some());

    let trimmed = METS_VOLUME.replace(r#"<mets:div ID="LOG_4" TYPE="section" LABEL="Income"/>"#, "");
    std::fs::write(&path, trimmed).unwrap();
    index_record(&pipeline, &index, &path);

    assert!(index.lock().unwrap().get("PPN100_V1_LOG_4").unwrap().is_none());
}

#[test]
fn test_threshold_only_changes_the_buffer() {
    let folder = RecordFolder::with_records(&[("PPN100_V1.xml", METS_VOLUME)]);
    let path = folder.record("PPN100_V1.xml");

    let (memory_index, _m) = create_test_index();
    let memory = test_pipeline(PipelineSettings {
        disk_threshold_bytes: usize::MAX,
        ..PipelineSettings::default()
    });
    let memory_outcome = index_record(&memory, &memory_index, &path);
    assert_eq!(memory_outcome.write_mode, Some(WriteMode::Memory));

    let (disk_index, _d) = create_test_index();
    let disk = test_pipeline(PipelineSettings {
        disk_threshold_bytes: 1,
        ..PipelineSettings::default()
    });
    let disk_outcome = index_record(&disk, &disk_index, &path);
    assert_eq!(disk_outcome.write_mode, Some(WriteMode::Disk));

    assert_eq!(memory_outcome.identifiers, disk_outcome.identifiers);
    assert_eq!(
        memory_index.lock().unwrap().load_tree("PPN100_V1").unwrap(),
        disk_index.lock().unwrap().load_tree("PPN100_V1").unwrap()
    );
}

#[test]
fn test_page_count_start_without_order() {
    let xml = METS_VOLUME.replace(r#" ORDER="1""#, "").replace(r#" ORDER="2""#, "");
    let folder = RecordFolder::with_records(&[("PPN100_V1.xml", xml.as_str())]);
    let (index, _dir) = create_test_index();
    let pipeline = test_pipeline(PipelineSettings::default());

    let job = IndexJob::new(folder.record("PPN100_V1.xml")).with_page_count_start(5);
    let outcome = pipeline.run(&job, &index);
    assert!(outcome.is_success());
    assert!(outcome.identifiers.contains(&"PPN100_V1_PAGE_5".to_string()));
    assert!(outcome.identifiers.contains(&"PPN100_V1_PAGE_6".to_string()));
}

#[test]
fn test_fatal_errors_write_nothing() {
    let folder = RecordFolder::with_records(&[
        ("broken.xml", "<mets:mets xmlns:mets=\"http://www.loc.gov/METS/\">"),
        ("unknown.xml", "<catalog><item/></catalog>"),
        ("no_id.xml", "<oai_dc:dc xmlns:oai_dc=\"http://www.openarchives.org/OAI/2.0/oai_dc/\"/>"),
    ]);
    let (index, _dir) = create_test_index();
    let pipeline = test_pipeline(PipelineSettings::default());

    for name in ["broken.xml", "unknown.xml", "no_id.xml"] {
        let outcome = pipeline.run(&IndexJob::new(folder.record(name)), &index);
        assert!(!outcome.is_success(), "{name} should fail");
        assert!(outcome.identifiers.is_empty());
    }
    assert_eq!(index.lock().unwrap().num_docs(), 0);
}
