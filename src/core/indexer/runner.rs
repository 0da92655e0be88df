//! Concurrent job execution.
//!
//! Jobs run on tokio's blocking pool, at most `max_concurrent_jobs` at
//! a time. Each job owns its parse tree and write buffer; only the
//! index client is shared, and it is locked for one commit at a time.

use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::core::indexer::IndexerPipeline;
use crate::core::storage::IndexClient;
use crate::core::types::{IndexJob, IndexOutcome};

/// Runs indexing jobs concurrently against one shared index client
pub struct JobRunner<C: IndexClient + 'static> {
    pipeline: Arc<IndexerPipeline>,
    client: Arc<Mutex<C>>,
    permits: Arc<Semaphore>,
}

impl<C: IndexClient + 'static> Clone for JobRunner<C> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
            client: Arc::clone(&self.client),
            permits: Arc::clone(&self.permits),
        }
    }
}

impl<C: IndexClient + 'static> JobRunner<C> {
    pub fn new(pipeline: Arc<IndexerPipeline>, client: Arc<Mutex<C>>, max_concurrent_jobs: usize) -> Self {
        Self {
            pipeline,
            client,
            permits: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
        }
    }

    /// Run one job on the blocking pool
    pub async fn run(&self, job: IndexJob) -> IndexOutcome {
        let file_path = job.file_path.clone();
        let permit = match Arc::clone(&self.permits).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => return failed(file_path, format!("Job runner closed: {e}")),
        };

        let pipeline = Arc::clone(&self.pipeline);
        let client = Arc::clone(&self.client);
        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            pipeline.run(&job, &*client)
        });

        match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Indexing task for {:?} failed: {}", file_path, e);
                failed(file_path, format!("Indexing task failed: {e}"))
            }
        }
    }

    /// Run all jobs, returning outcomes in job order
    pub async fn run_all(&self, jobs: Vec<IndexJob>) -> Vec<IndexOutcome> {
        let total = jobs.len();
        info!("Running {} indexing jobs", total);

        let handles: Vec<_> = jobs
            .into_iter()
            .map(|job| {
                let runner = self.clone();
                let file_path = job.file_path.clone();
                (file_path, tokio::spawn(async move { runner.run(job).await }))
            })
            .collect();

        let mut outcomes = Vec::with_capacity(total);
        for (file_path, handle) in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    warn!("Job task for {:?} failed to join: {}", file_path, e);
                    outcomes.push(failed(file_path, format!("Indexing task failed: {e}")));
                }
            }
        }

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        info!(
            "Indexing run complete: {} succeeded, {} failed",
            outcomes.len() - failed,
            failed
        );
        outcomes
    }
}

fn failed(file_path: std::path::PathBuf, message: String) -> IndexOutcome {
    let mut outcome = IndexOutcome::new(file_path);
    outcome.error = Some(message);
    outcome
}
