// Integration tests for format detection

use crate::common::{DUBLIN_CORE, EAD2, EAD3, LIDO, METS_ANCHOR, METS_MARC_VOLUME, METS_VOLUME};
use std::sync::Arc;
use strata::core::source::{NamespaceTable, SourceRecord};
use strata::core::variant::{builtin, FormatRegistry, FormatVariant, SchemaKind};
use strata::StrataError;

fn registry() -> FormatRegistry {
    FormatRegistry::new(&NamespaceTable::standard()).unwrap()
}

fn detect(xml: &str) -> Arc<FormatVariant> {
    let record = SourceRecord::parse(xml, Arc::new(NamespaceTable::new())).unwrap();
    registry().detect(&record).expect("a variant accepts the record")
}

#[test]
fn test_detects_every_builtin_format() {
    let cases = [
        (METS_ANCHOR, "mets", SchemaKind::Mets),
        (METS_VOLUME, "mets", SchemaKind::Mets),
        (METS_MARC_VOLUME, "mets-marc", SchemaKind::MetsMarc),
        (EAD2, "ead", SchemaKind::Ead),
        (EAD3, "ead3", SchemaKind::Ead3),
        (LIDO, "lido", SchemaKind::Lido),
        (DUBLIN_CORE, "dc", SchemaKind::DublinCore),
    ];

    for (xml, name, kind) in cases {
        let variant = detect(xml);
        assert_eq!(variant.name(), name);

        let record = variant.parse(xml).unwrap();
        assert_eq!(variant.classify(&record).unwrap(), kind);
    }
}

#[test]
fn test_unknown_root_is_not_detected() {
    let record = SourceRecord::parse(
        r#"<record xmlns="urn:unknown"><id>1</id></record>"#,
        Arc::new(NamespaceTable::new()),
    )
    .unwrap();
    assert!(registry().detect(&record).is_none());
}

#[test]
fn test_classify_rejects_foreign_record() {
    let ead = registry().get("ead").unwrap();
    let record = ead.parse(LIDO).unwrap();
    assert!(matches!(
        ead.classify(&record),
        Err(StrataError::ClassificationFailed(_))
    ));
}

#[test]
fn test_identifiers_per_format() {
    let cases = [
        (METS_VOLUME, "PPN100_V1"),
        (METS_MARC_VOLUME, "PPN200_V3"),
        (EAD2, "EAD_FAM_1"),
        (EAD3, "EAD3_TOWN"),
        (LIDO, "LIDO_OBJ_7"),
        (DUBLIN_CORE, "DC_LETTER_12"),
    ];
    for (xml, expected) in cases {
        let variant = detect(xml);
        let record = variant.parse(xml).unwrap();
        assert_eq!(variant.identifier(&record).as_deref(), Some(expected));
    }
}

#[test]
fn test_namespace_tables_are_per_variant() {
    let registry = registry();
    let ead = registry.get("ead").unwrap();
    let ead3 = registry.get("ead3").unwrap();

    // Same prefix, different URI, both live at once
    assert_eq!(ead.namespaces().uri("ead"), Some("urn:isbn:1-931666-22-9"));
    assert_eq!(ead3.namespaces().uri("ead"), Some("http://ead3.archivists.org/schema/"));

    // Each parses only its own documents
    assert!(ead.accepts(&ead.parse(EAD2).unwrap()));
    assert!(!ead.accepts(&ead.parse(EAD3).unwrap()));
    assert!(ead3.accepts(&ead3.parse(EAD3).unwrap()));
}

#[test]
fn test_configured_base_table_overrides_builtin_binding() {
    let base = NamespaceTable::standard().with("dc", "urn:local:dc");
    let registry = FormatRegistry::new(&base).unwrap();
    let dc = registry.get("dc").unwrap();

    // dc:identifier now resolves to the local namespace, so the
    // standard record has no identifier under this configuration
    let record = dc.parse(DUBLIN_CORE).unwrap();
    assert_eq!(dc.identifier(&record), None);
}

#[test]
fn test_derived_variant_keeps_parent_rules() {
    let mets = builtin::mets();
    let derived = mets.derive("mets-local", SchemaKind::Mets).collection("/mets:mets/@TYPE");
    assert_eq!(derived.anchor_candidates, mets.anchor_candidates);
    assert_eq!(derived.identifier_rules, mets.identifier_rules);
    assert_ne!(derived.collection, mets.collection);
}
