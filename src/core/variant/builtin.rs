//! Built-in variant definitions.

use super::{
    AnchorCandidate, FieldRule, PageRules, RootPathRule, SchemaKind, SectionRules,
    StructureRules, VariantDefinition,
};
use crate::core::source::namespaces::uri;
use crate::core::types::field;

const MODS: &str = "/mets:mets/mets:dmdSec[1]/mets:mdWrap/mets:xmlData/mods:mods";
const MARC: &str = "/mets:mets/mets:dmdSec//marc:record";
const LOGICAL: &str = "/mets:mets/mets:structMap[@TYPE='LOGICAL']";
const PHYSICAL: &str = "/mets:mets/mets:structMap[@TYPE='PHYSICAL']";

/// Every built-in definition, in registration order
pub fn all() -> Vec<VariantDefinition> {
    let mets = mets();
    let mets_marc = mets_marc(&mets);
    let ead = ead();
    let ead3 = ead3(&ead);
    vec![mets, mets_marc, ead, ead3, lido(), dublin_core()]
}

/// METS with MODS descriptive metadata
pub fn mets() -> VariantDefinition {
    let structure = StructureRules {
        root: Some(format!("{LOGICAL}//mets:div[not(mets:mptr)]")),
        root_fields: vec![
            FieldRule::new(field::TITLE, &format!("{MODS}/mods:titleInfo/mods:title")),
            FieldRule::new("author", &format!("{MODS}/mods:name/mods:displayForm")),
            FieldRule::new("date", &format!("{MODS}/mods:originInfo/mods:dateIssued")),
            FieldRule::new("doc_type", "@TYPE"),
            FieldRule::new(field::LABEL, "@LABEL"),
        ],
        sections: Some(SectionRules {
            select: "mets:div[not(mets:mptr)]".to_string(),
            id: "@ID".to_string(),
            fields: vec![
                FieldRule::new("doc_type", "@TYPE"),
                FieldRule::new(field::LABEL, "@LABEL"),
            ],
        }),
        pages: Some(PageRules {
            select: format!("{PHYSICAL}/mets:div/mets:div"),
            order: Some("@ORDER".to_string()),
            fields: vec![
                FieldRule::new(field::LABEL, "@ORDERLABEL"),
                FieldRule::lookup(
                    field::IMAGE,
                    "mets:fptr/@FILEID",
                    "/mets:mets/mets:fileSec/mets:fileGrp[@USE='PRESENTATION' or @USE='DEFAULT']\
                     /mets:file[@ID='{key}']/mets:FLocat/@xlink:href",
                ),
            ],
        }),
    };

    VariantDefinition::new("mets", SchemaKind::Mets)
        .root_element("mets:mets")
        .identifier(&format!("{MODS}/mods:recordInfo/mods:recordIdentifier"))
        .identifier(&format!("{MODS}/mods:identifier[@type='ppn' or @type='PPN']"))
        .identifier("/mets:mets/@OBJID")
        .candidate(AnchorCandidate::query(
            "mods:relatedItem[host]",
            &format!("{MODS}/mods:relatedItem[@type='host']/mods:recordInfo/mods:recordIdentifier"),
        ))
        .candidate(AnchorCandidate::query(
            "mods:relatedItem[series]",
            &format!("{MODS}/mods:relatedItem[@type='series']/mods:recordInfo/mods:recordIdentifier"),
        ))
        .candidate(AnchorCandidate::remote(
            "mets:mptr",
            &format!("{LOGICAL}/mets:div/mets:mptr/@xlink:href"),
            &format!("{MODS}/mods:recordInfo/mods:recordIdentifier"),
        ))
        .anchor_marker(&format!("{LOGICAL}/mets:div[mets:div/mets:mptr]"))
        .collection(&format!("{MODS}/mods:classification"))
        .structure(structure)
}

/// METS whose descriptive section is MARCXML
pub fn mets_marc(mets: &VariantDefinition) -> VariantDefinition {
    mets.derive("mets-marc", SchemaKind::MetsMarc)
        .identifier_first(&format!("{MARC}/marc:controlfield[@tag='001']"))
        .candidate_at(
            0,
            AnchorCandidate::marc(
                "marc:773$w",
                &format!("{MARC}/marc:datafield[@tag='773']/marc:subfield[@code='w']"),
            ),
        )
        .candidate_at(
            1,
            AnchorCandidate::marc(
                "marc:830$w",
                &format!("{MARC}/marc:datafield[@tag='830']/marc:subfield[@code='w']"),
            ),
        )
        .collection(&format!("{MARC}/marc:datafield[@tag='912']/marc:subfield[@code='a']"))
        .root_field(FieldRule::new(
            field::TITLE,
            &format!("{MARC}/marc:datafield[@tag='245']/marc:subfield[@code='a']"),
        ))
        .root_field(FieldRule::new(
            "author",
            &format!("{MARC}/marc:datafield[@tag='100']/marc:subfield[@code='a']"),
        ))
        .detect_hint(MARC)
}

fn ead_structure() -> StructureRules {
    let component_fields = || {
        vec![
            FieldRule::new(field::TITLE, "ead:did/ead:unittitle"),
            FieldRule::new("unit_id", "ead:did/ead:unitid"),
            FieldRule::new("date", "ead:did/ead:unitdate"),
            FieldRule::new("level", "@level"),
        ]
    };
    let components = (1..=12)
        .map(|n| format!("ead:c{n:02}"))
        .fold(
            "ead:dsc/ead:c | ead:c | ead:dsc/ead:c01".to_string(),
            |acc, c| format!("{acc} | {c}"),
        );

    StructureRules {
        root: Some("/ead:ead/ead:archdesc".to_string()),
        root_fields: component_fields(),
        sections: Some(SectionRules {
            select: components,
            id: "@id".to_string(),
            fields: component_fields(),
        }),
        pages: None,
    }
}

/// EAD 2002 finding aids
pub fn ead() -> VariantDefinition {
    VariantDefinition::new("ead", SchemaKind::Ead)
        .bind("ead", uri::EAD2)
        .root_element("ead:ead")
        .identifier("/ead:ead/ead:eadheader/ead:eadid")
        .structure(ead_structure())
        .root_path(RootPathRule::Suppress)
}

/// EAD3: same decomposition as EAD 2002 under the EAD3 namespace
pub fn ead3(ead: &VariantDefinition) -> VariantDefinition {
    ead.derive("ead3", SchemaKind::Ead3)
        .bind("ead", uri::EAD3)
        .clear_identifiers()
        .identifier("/ead:ead/ead:control/ead:recordid")
}

/// LIDO object records; resource sets become pages
pub fn lido() -> VariantDefinition {
    const DESCRIPTIVE: &str = "lido:descriptiveMetadata";
    let structure = StructureRules {
        root: Some("//lido:lido".to_string()),
        root_fields: vec![
            FieldRule::new(
                field::TITLE,
                &format!(
                    "{DESCRIPTIVE}/lido:objectIdentificationWrap/lido:titleWrap\
                     /lido:titleSet/lido:appellationValue"
                ),
            ),
            FieldRule::new(
                "object_type",
                &format!(
                    "{DESCRIPTIVE}/lido:objectClassificationWrap/lido:objectWorkTypeWrap\
                     /lido:objectWorkType/lido:term"
                ),
            ),
        ],
        sections: None,
        pages: Some(PageRules {
            select: "//lido:lido/lido:administrativeMetadata/lido:resourceWrap/lido:resourceSet"
                .to_string(),
            order: Some("@lido:sortorder".to_string()),
            fields: vec![
                FieldRule::new(field::IMAGE, "lido:resourceRepresentation/lido:linkResource"),
                FieldRule::new(field::LABEL, "lido:resourceDescription"),
            ],
        }),
    };

    VariantDefinition::new("lido", SchemaKind::Lido)
        .root_element("lido:lidoWrap")
        .root_element("lido:lido")
        .identifier("//lido:lido/lido:lidoRecID")
        .structure(structure)
}

/// Simple Dublin Core records
pub fn dublin_core() -> VariantDefinition {
    let structure = StructureRules {
        root: None,
        root_fields: vec![
            FieldRule::new(field::TITLE, "dc:title"),
            FieldRule::new("author", "dc:creator"),
            FieldRule::new("date", "dc:date"),
            FieldRule::new("doc_type", "dc:type"),
        ],
        sections: None,
        pages: None,
    };

    VariantDefinition::new("dc", SchemaKind::DublinCore)
        .root_element("oai_dc:dc")
        .identifier("/oai_dc:dc/dc:identifier")
        .candidate(AnchorCandidate::query(
            "dcterms:isPartOf",
            "/oai_dc:dc/dcterms:isPartOf",
        ))
        .structure(structure)
}
