use crate::config::ConfigErrors;
use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, instrument};

/// Executor that works on a local thread pool of fixed size
#[derive(Debug)]
pub struct LocalExecutor {
    pool: ThreadPool,
    threads: usize,
}

impl LocalExecutor {
    pub fn new(threads: usize) -> Result<Self, ConfigErrors> {
        debug!("Starting thread pool with {threads} threads");

        Ok(Self {
            pool: ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|index| format!("harvest-worker-{index}"))
                .build()?,
            threads,
        })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Run `task` for every item on the pool and wait for all of them.
    /// Results keep the order of `items`.
    #[instrument(skip(self, items, task), level = "debug")]
    pub fn execute<T, R, F>(&self, label: &str, items: Vec<T>, task: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Send + Sync,
    {
        // general counters to provide progress
        let total = items.len() as u64;
        let processed = AtomicU64::new(0);

        let results = self.pool.install(|| {
            items
                .into_par_iter()
                .map(|item| {
                    let result = task(item);

                    debug!(
                        "{label}: done with {}/{total}",
                        processed.fetch_add(1, Ordering::SeqCst) + 1
                    );

                    result
                })
                .collect::<Vec<R>>()
        });

        info!("{label}: done with processing {total} tasks");

        results
    }
}
