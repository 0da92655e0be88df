// Integration tests for anchor/volume resolution

use crate::common::{
    RecordFolder, DUBLIN_CORE, EAD2, EAD3, LIDO, METS_ANCHOR, METS_MARC_VOLUME, METS_VOLUME,
};
use std::sync::Arc;
use std::time::Duration;
use strata::core::connector::HttpConnector;
use strata::core::resolver::AnchorResolver;
use strata::core::source::{NamespaceTable, SourceRecord};
use strata::core::types::WarningKind;
use strata::core::variant::{builtin, FormatRegistry, FormatVariant};

fn registry() -> FormatRegistry {
    FormatRegistry::new(&NamespaceTable::standard()).unwrap()
}

fn detect(xml: &str) -> (Arc<FormatVariant>, SourceRecord) {
    let record = SourceRecord::parse(xml, Arc::new(NamespaceTable::new())).unwrap();
    let variant = registry().detect(&record).unwrap();
    let record = record.with_namespaces(Arc::clone(variant.namespaces()));
    (variant, record)
}

#[test]
fn test_is_volume_follows_anchor_identifier() {
    for xml in [
        METS_ANCHOR,
        METS_VOLUME,
        METS_MARC_VOLUME,
        EAD2,
        EAD3,
        LIDO,
        DUBLIN_CORE,
    ] {
        let (variant, record) = detect(xml);
        assert_eq!(
            variant.is_volume(&record),
            variant.anchor_identifier(&record).is_some(),
            "variant {}",
            variant.name()
        );
    }
}

#[test]
fn test_mets_volume_and_anchor() {
    let (variant, volume) = detect(METS_VOLUME);
    assert_eq!(variant.anchor_identifier(&volume).as_deref(), Some("PPN100"));
    assert!(variant.is_volume(&volume));
    assert!(!variant.is_anchor(&volume));

    let (variant, anchor) = detect(METS_ANCHOR);
    assert!(variant.is_anchor(&anchor));
    assert!(!variant.is_volume(&anchor));
}

#[test]
fn test_marc_links_win_in_declared_order() {
    let (variant, record) = detect(METS_MARC_VOLUME);
    let resolution = AnchorResolver::local().resolve(&record, &variant);

    // 773 comes before 830; organization codes are stripped
    assert_eq!(resolution.anchor.as_deref(), Some("PPN200"));
    assert_eq!(resolution.source.as_deref(), Some("marc:773$w"));
    assert!(resolution.is_ambiguous());
    assert_eq!(
        resolution.conflicts,
        vec![("marc:830$w".to_string(), "PPN999".to_string())]
    );
    assert!(resolution
        .warnings
        .iter()
        .any(|w| w.kind == WarningKind::ResolutionAmbiguity));
}

#[test]
fn test_reordered_candidates_change_the_winner() {
    let mut definition = builtin::mets_marc(&builtin::mets());
    definition.anchor_candidates.swap(0, 1);
    let variant = FormatVariant::compile(definition, &NamespaceTable::standard()).unwrap();

    let record = variant.parse(METS_MARC_VOLUME).unwrap();
    let resolution = AnchorResolver::local().resolve(&record, &variant);
    assert_eq!(resolution.anchor.as_deref(), Some("PPN999"));
    assert_eq!(resolution.source.as_deref(), Some("marc:830$w"));
}

#[test]
fn test_dublin_core_part_of() {
    let (variant, record) = detect(DUBLIN_CORE);
    let link = AnchorResolver::local()
        .resolve(&record, &variant)
        .link("DC_LETTER_12")
        .unwrap();
    assert_eq!(link.anchor_identifier, "DC_SERIES_1");
    assert_eq!(link.source, "dcterms:isPartOf");
}

/// Volume without a host entry, pointing at its anchor file
fn pointer_only_volume(anchor_path: &std::path::Path) -> String {
    let start = METS_VOLUME.find("<mods:relatedItem").unwrap();
    let end = METS_VOLUME.find("</mods:relatedItem>").unwrap() + "</mods:relatedItem>".len();
    let mut xml = METS_VOLUME.to_string();
    xml.replace_range(start..end, "");
    xml.replace(
        "file:///records/PPN100.xml",
        &format!("file://{}", anchor_path.display()),
    )
}

#[tokio::test]
async fn test_remote_pointer_is_followed() {
    let folder = RecordFolder::with_records(&[("PPN100.xml", METS_ANCHOR)]);
    let xml = pointer_only_volume(&folder.record("PPN100.xml"));
    let (variant, record) = detect(&xml);

    // Without a connector the pointer cannot be followed
    assert!(AnchorResolver::local().resolve(&record, &variant).anchor.is_none());

    let connector = HttpConnector::from_current().unwrap();
    let resolution = AnchorResolver::with_connector(&connector, Duration::from_secs(5))
        .resolve(&record, &variant);
    assert_eq!(resolution.anchor.as_deref(), Some("PPN100"));
    assert_eq!(resolution.source.as_deref(), Some("mets:mptr"));
    assert!(resolution.warnings.is_empty());
}

#[tokio::test]
async fn test_unreachable_pointer_is_a_warning() {
    let folder = RecordFolder::with_records(&[]);
    let xml = pointer_only_volume(&folder.record("missing.xml"));
    let (variant, record) = detect(&xml);

    let connector = HttpConnector::from_current().unwrap();
    let resolution = AnchorResolver::with_connector(&connector, Duration::from_secs(5))
        .resolve(&record, &variant);
    assert!(resolution.anchor.is_none());
    assert!(resolution
        .warnings
        .iter()
        .any(|w| w.kind == WarningKind::RemoteFetch));
}

/// Volume read from `path`, detected and rebound like the pipeline does
fn detect_file(path: &std::path::Path) -> (Arc<FormatVariant>, SourceRecord) {
    let record = SourceRecord::from_file(path, Arc::new(NamespaceTable::new())).unwrap();
    let variant = registry().detect(&record).unwrap();
    let record = record.with_namespaces(Arc::clone(variant.namespaces()));
    (variant, record)
}

fn volume_pointing_at(href: &str) -> String {
    pointer_only_volume(std::path::Path::new("/records/PPN100.xml"))
        .replace("file:///records/PPN100.xml", href)
}

#[tokio::test]
async fn test_relative_pointer_resolves_next_to_the_volume() {
    let volume = volume_pointing_at("PPN100.xml");
    let folder = RecordFolder::with_records(&[
        ("batch/PPN100.xml", METS_ANCHOR),
        ("batch/PPN100_V1.xml", volume.as_str()),
    ]);
    let (variant, record) = detect_file(&folder.record("batch/PPN100_V1.xml"));

    let connector = HttpConnector::from_current().unwrap();
    let resolution = AnchorResolver::with_connector(&connector, Duration::from_secs(5))
        .resolve(&record, &variant);
    assert_eq!(resolution.anchor.as_deref(), Some("PPN100"));
    assert!(resolution.warnings.is_empty(), "{:?}", resolution.warnings);
}

#[tokio::test]
async fn test_pointer_outside_the_volume_folder_is_refused() {
    let volume = volume_pointing_at("../PPN100.xml");
    let folder = RecordFolder::with_records(&[
        ("PPN100.xml", METS_ANCHOR),
        ("batch/PPN100_V1.xml", volume.as_str()),
    ]);
    let (variant, record) = detect_file(&folder.record("batch/PPN100_V1.xml"));

    let connector = HttpConnector::from_current().unwrap();
    let resolution = AnchorResolver::with_connector(&connector, Duration::from_secs(5))
        .resolve(&record, &variant);
    assert!(resolution.anchor.is_none());
    assert!(resolution
        .warnings
        .iter()
        .any(|w| w.kind == WarningKind::RemoteFetch && w.message.contains("unavailable")));
}
