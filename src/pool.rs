//! Bounded worker pool. A `Semaphore` gates how many `tokio::task::spawn`ed
//! workers run at once, generalizing the reference actor system's `JoinSet`-driven
//! task bookkeeping with an explicit concurrency cap instead of an unbounded fan-out.

use crate::errors::{Result, SensorPipelineError};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
}

impl Default for WorkerPool {
    fn default() -> Self {
        let parallelism = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
        Self::new(parallelism)
    }
}

impl WorkerPool {
    pub fn new(parallelism: usize) -> Self {
        WorkerPool { semaphore: Arc::new(Semaphore::new(parallelism.max(1))) }
    }

    /// Suspends the caller until a worker slot is free, then runs `task` on that worker.
    /// A panicking task is reported as `PoolTaskFailed`, not propagated to the caller's task.
    pub async fn submit<F, T>(&self, task: F) -> Result<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| SensorPipelineError::PoolTaskFailed("semaphore closed".to_string()))?;

        let join = tokio::spawn(async move {
            let _permit = permit;
            task.await
        });

        join.await.map_err(|e| SensorPipelineError::PoolTaskFailed(e.to_string()))
    }

    pub async fn submit_void<F>(&self, task: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.submit(task).await
    }

    /// Runs every item's task concurrently, bounded by the pool's parallelism; task
    /// ordering and fairness across items are not guaranteed.
    pub async fn process_batch<F, Fut, T>(&self, items: Vec<T>, make_task: F) -> Vec<Result<()>>
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
        T: Send + 'static,
    {
        let mut set = JoinSet::new();
        for item in items {
            let permit = self.semaphore.clone().acquire_owned().await;
            let fut = make_task(item);
            set.spawn(async move {
                let permit = permit;
                fut.await;
                drop(permit);
            });
        }

        let mut results = Vec::new();
        while let Some(res) = set.join_next().await {
            results.push(res.map_err(|e| SensorPipelineError::PoolTaskFailed(e.to_string())));
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn submit_returns_the_task_result() {
        let pool = WorkerPool::new(2);
        let result = pool.submit(async { 21 * 2 }).await.unwrap();
        assert_eq!(result, 42);
    }

    #[tokio::test]
    async fn panicking_task_does_not_kill_the_pool() {
        let pool = WorkerPool::new(1);
        let boom: std::pin::Pin<Box<dyn Future<Output = ()> + Send>> = Box::pin(async { panic!("boom") });
        let failed = pool.submit(boom).await;
        assert!(failed.is_err());
        let ok = pool.submit(async { 1 }).await.unwrap();
        assert_eq!(ok, 1);
    }

    #[tokio::test]
    async fn process_batch_runs_every_item_exactly_once() {
        let pool = WorkerPool::new(4);
        let counter = Arc::new(AtomicUsize::new(0));
        let items: Vec<usize> = (0..50).collect();
        let c = counter.clone();
        let results = pool
            .process_batch(items, move |_i| {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                }
            })
            .await;
        assert_eq!(results.len(), 50);
        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(counter.load(Ordering::SeqCst), 50);
    }
}
