//! Unified service container for Strata
//!
//! Provides shared access to the format registry, the search index and
//! the configuration.

use crate::core::config::Config;
use crate::core::connector::{Connector, HttpConnector};
use crate::core::error::Result;
use crate::core::indexer::{IndexerPipeline, JobRunner};
use crate::core::storage::TantivyIndex;
use crate::core::variant::FormatRegistry;
use std::sync::{Arc, Mutex};

/// Unified services container
///
/// All commands use this same struct for service access.
#[derive(Clone)]
pub struct Services {
    /// Compiled format variants
    pub registry: Arc<FormatRegistry>,

    /// Search index, locked for one commit at a time
    pub index: Arc<Mutex<TantivyIndex>>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl Services {
    /// Create services from configuration
    ///
    /// Opens (or creates) the index under `storage.index_dir`.
    pub fn new(config: Config) -> Result<Self> {
        let registry = Arc::new(FormatRegistry::new(&config.namespace_table())?);
        let index = TantivyIndex::open_or_create(&config.storage.index_dir)?;

        Ok(Self {
            registry,
            index: Arc::new(Mutex::new(index)),
            config: Arc::new(config),
        })
    }

    /// Create a pipeline that detects each record's variant
    ///
    /// Remote anchor pointers and image downloads go through an
    /// [`HttpConnector`] bound to the current tokio runtime, when there is one.
    pub fn pipeline(&self) -> IndexerPipeline {
        let pipeline = IndexerPipeline::from_config(Arc::clone(&self.registry), &self.config);
        match HttpConnector::from_current() {
            Ok(connector) => pipeline.with_connector(Arc::new(connector) as Arc<dyn Connector>),
            Err(e) => {
                tracing::debug!("Remote lookups disabled: {}", e);
                pipeline
            }
        }
    }

    /// Create a job runner over `pipeline` sharing this index
    pub fn runner(&self, pipeline: IndexerPipeline) -> JobRunner<TantivyIndex> {
        JobRunner::new(
            Arc::new(pipeline),
            Arc::clone(&self.index),
            self.config.limits.max_concurrent_jobs,
        )
    }
}
