use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::error::{ClipperError, Result};

/// Fixed-size worker pool: jobs are spawned on the runtime, at most `max_workers`
/// of them run at once, and results come back in submission order.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    max_workers: usize,
}

impl WorkerPool {
    pub fn new(max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_workers)),
            max_workers,
        }
    }

    /// Pool sized to the host's processing units
    pub fn available() -> Self {
        Self::new(num_cpus::get())
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Run every job and wait for all of them.
    ///
    /// The i-th result belongs to the i-th job whatever the completion order. A job
    /// that panics yields `ClipperError::Worker` without affecting the others.
    pub async fn run_all<T, Fut>(&self, jobs: Vec<Fut>) -> Vec<Result<T>>
    where
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        debug!("Submitting {} jobs to {} workers", jobs.len(), self.max_workers);

        let handles: Vec<_> = jobs
            .into_iter()
            .map(|job| {
                let semaphore = Arc::clone(&self.semaphore);
                tokio::spawn(async move {
                    // The semaphore is never closed, so acquiring only waits.
                    let _permit = semaphore.acquire_owned().await;
                    job.await
                })
            })
            .collect();

        futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.map_err(|e| ClipperError::Worker(e.to_string())))
            .collect()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            max_workers: self.max_workers,
            available_permits: self.semaphore.available_permits(),
        }
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::available()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    pub max_workers: usize,
    pub available_permits: usize,
}
