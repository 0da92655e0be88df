//! Registry of compiled format variants.

use std::sync::Arc;
use tracing::debug;

use super::{builtin, FormatVariant, VariantDefinition};
use crate::core::error::{Result, StrataError};
use crate::core::source::{NamespaceTable, SourceRecord};

/// Compiled variants available to one indexer
///
/// Built once at startup; every variant holds its own namespace table
/// derived from the base table, so nothing here changes afterwards.
#[derive(Debug, Clone)]
pub struct FormatRegistry {
    variants: Vec<Arc<FormatVariant>>,
}

impl FormatRegistry {
    /// Compile the built-in variants over `base`
    pub fn new(base: &NamespaceTable) -> Result<Self> {
        Self::with_definitions(base, builtin::all())
    }

    /// Compile a custom set of definitions over `base`
    pub fn with_definitions(base: &NamespaceTable, definitions: Vec<VariantDefinition>) -> Result<Self> {
        let mut variants: Vec<Arc<FormatVariant>> = Vec::with_capacity(definitions.len());
        for definition in definitions {
            if variants.iter().any(|v| v.name() == definition.name) {
                return Err(StrataError::ConfigError(format!(
                    "duplicate variant name '{}'",
                    definition.name
                )));
            }
            let variant = FormatVariant::compile(definition, base)?;
            debug!(
                "Registered variant '{}' ({}) with {} anchor candidates",
                variant.name(),
                variant.kind(),
                variant.candidates().len()
            );
            variants.push(Arc::new(variant));
        }
        Ok(Self { variants })
    }

    /// Look up a variant by name
    pub fn get(&self, name: &str) -> Result<Arc<FormatVariant>> {
        self.variants
            .iter()
            .find(|v| v.name() == name)
            .cloned()
            .ok_or_else(|| StrataError::UnknownVariant(name.to_string()))
    }

    /// Pick the variant for a record from its document element
    ///
    /// Among variants accepting the root element, one whose detection
    /// hint matches wins; otherwise the first registered one.
    pub fn detect(&self, record: &SourceRecord) -> Option<Arc<FormatVariant>> {
        let accepting: Vec<&Arc<FormatVariant>> =
            self.variants.iter().filter(|v| v.accepts(record)).collect();

        accepting
            .iter()
            .find(|v| v.matches_hint(record))
            .or_else(|| accepting.iter().find(|v| v.definition().detect_hint.is_none()))
            .or_else(|| accepting.first())
            .map(|v| Arc::clone(v))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<FormatVariant>> {
        self.variants.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.variants.iter().map(|v| v.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}
