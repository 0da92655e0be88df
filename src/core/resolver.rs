//! Anchor/volume resolution.
//!
//! A record is a volume of a multi-part work exactly when one of its
//! variant's anchor candidates yields an identifier. Candidates are
//! tried in the variant's declared order and the first non-empty value
//! wins. Later candidates are still evaluated so that disagreeing
//! values can be reported; remote pointers are only followed while no
//! value has been found.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Component, Path};
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::connector::Connector;
use crate::core::source::{Query, SourceRecord};
use crate::core::types::{AnchorLink, IndexWarning, WarningKind};
use crate::core::variant::{CompiledCandidate, CompiledSource, FormatVariant};

/// Leading MARC organization code such as `(DE-627)`
static ORG_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\([^)]*\)\s*").expect("organization code pattern is valid"));

/// Outcome of anchor resolution for one record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Anchor identifier, if any candidate matched
    pub anchor: Option<String>,

    /// Name of the candidate that produced `anchor`
    pub source: Option<String>,

    /// Other candidates that produced a different value
    pub conflicts: Vec<(String, String)>,

    pub warnings: Vec<IndexWarning>,
}

impl Resolution {
    pub fn is_volume(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn is_ambiguous(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// Link record `child` to its anchor
    pub fn link(&self, child: &str) -> Option<AnchorLink> {
        let anchor = self.anchor.as_ref()?;
        Some(AnchorLink {
            child_identifier: child.to_string(),
            anchor_identifier: anchor.clone(),
            source: self.source.clone().unwrap_or_default(),
        })
    }
}

/// Evaluates anchor candidates against a record
pub struct AnchorResolver<'a> {
    connector: Option<&'a dyn Connector>,
    timeout: Duration,
}

impl AnchorResolver<'static> {
    /// Resolver that never follows remote pointers
    pub fn local() -> Self {
        Self {
            connector: None,
            timeout: Duration::ZERO,
        }
    }
}

impl<'a> AnchorResolver<'a> {
    /// Resolver that fetches remote anchor records through `connector`
    pub fn with_connector(connector: &'a dyn Connector, timeout: Duration) -> Self {
        Self {
            connector: Some(connector),
            timeout,
        }
    }

    pub fn resolve(&self, record: &SourceRecord, variant: &FormatVariant) -> Resolution {
        let mut resolution = Resolution::default();

        for candidate in variant.candidates() {
            let value = match &candidate.source {
                CompiledSource::Query(query) => record.select_text(query, None),
                CompiledSource::RemotePointer { .. } if resolution.anchor.is_some() => continue,
                CompiledSource::RemotePointer { href, identifier } => {
                    let Some(href) = record.select_text(href, None) else {
                        continue;
                    };
                    let url = locate(record, &href);
                    self.fetch_identifier(&url, identifier, variant, candidate, &mut resolution)
                }
            };
            let Some(value) = value.map(|v| normalize(candidate, v)).filter(|v| !v.is_empty())
            else {
                continue;
            };

            match &resolution.anchor {
                None => {
                    debug!("Anchor '{}' found by candidate {}", value, candidate.name);
                    resolution.anchor = Some(value);
                    resolution.source = Some(candidate.name.clone());
                }
                Some(first) if *first != value => {
                    resolution.conflicts.push((candidate.name.clone(), value));
                }
                Some(_) => {}
            }
        }

        if let (Some(anchor), Some(source)) = (&resolution.anchor, &resolution.source) {
            if !resolution.conflicts.is_empty() {
                let others = resolution
                    .conflicts
                    .iter()
                    .map(|(name, value)| format!("{name}='{value}'"))
                    .collect::<Vec<_>>()
                    .join(", ");
                let message =
                    format!("anchor candidates disagree; using {source}='{anchor}' over {others}");
                warn!("{}", message);
                resolution.warnings.push(IndexWarning::new(
                    WarningKind::ResolutionAmbiguity,
                    None,
                    message,
                ));
            }
        }

        resolution
    }

    fn fetch_identifier(
        &self,
        url: &str,
        identifier: &Query,
        variant: &FormatVariant,
        candidate: &CompiledCandidate,
        resolution: &mut Resolution,
    ) -> Option<String> {
        let connector = self.connector?;

        let fetched = connector
            .fetch(url, self.timeout)
            .and_then(|bytes| variant.parse_bytes(&bytes));
        match fetched {
            Ok(remote) => remote.select_text(identifier, None),
            Err(e) => {
                let message = if e.is_remote() {
                    format!("candidate {} unavailable: {}", candidate.name, e)
                } else {
                    format!("candidate {} points to an unreadable record: {}", candidate.name, e)
                };
                warn!("{}", message);
                resolution.warnings.push(IndexWarning::new(
                    WarningKind::RemoteFetch,
                    Some(url.to_string()),
                    message,
                ));
                None
            }
        }
    }
}

/// URL of a pointer href
///
/// A relative path below the record's own folder becomes a `file://`
/// URL next to the record; anything else is passed on unchanged.
fn locate(record: &SourceRecord, href: &str) -> String {
    if href.contains("://") {
        return href.to_string();
    }
    let relative = Path::new(href);
    let below = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    match record.path().and_then(Path::parent) {
        Some(dir) if below => format!("file://{}", dir.join(relative).display()),
        _ => href.to_string(),
    }
}

fn normalize(candidate: &CompiledCandidate, value: String) -> String {
    if candidate.strip_org_code {
        ORG_CODE.replace(&value, "").trim().to_string()
    } else {
        value
    }
}
