//! Streaming queue. A bounded producer/consumer channel with a single consumer
//! task; `Stop` enqueues a sentinel behind whatever is already queued so the consumer
//! drains every produced item, in order, before it terminates. Generic over the item
//! type so the same queue carries raw lines in the CLI binary and typed records in tests.

use crate::errors::{Result, SensorPipelineError};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};

pub const DEFAULT_CAPACITY: usize = 100;
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

enum QueueItem<T> {
    Item(T),
    Stop,
}

pub struct StreamingQueue<T: Send + 'static> {
    tx: mpsc::Sender<QueueItem<T>>,
    consumer: Mutex<Option<mpsc::Receiver<QueueItem<T>>>>,
    running: Mutex<Option<JoinHandle<usize>>>,
    consumed: Arc<AtomicUsize>,
}

impl<T: Send + 'static> Default for StreamingQueue<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<T: Send + 'static> StreamingQueue<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        StreamingQueue {
            tx,
            consumer: Mutex::new(Some(rx)),
            running: Mutex::new(None),
            consumed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Suspends until the queue has room, giving the consumer real backpressure.
    pub async fn produce(&self, item: T) -> Result<()> {
        self.tx.send(QueueItem::Item(item)).await.map_err(|_| SensorPipelineError::QueueClosed)
    }

    /// Spawns the single consumer task, which awaits `process` for every item until
    /// `stop` is called. Returns an error if already running.
    pub async fn start<F, Fut>(&self, process: F) -> Result<()>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(SensorPipelineError::AlreadyRunning);
        }

        let rx = self.consumer.lock().await.take().ok_or(SensorPipelineError::AlreadyRunning)?;
        self.consumed.store(0, Ordering::SeqCst);
        let join = tokio::spawn(run_consumer(rx, process, self.consumed.clone()));
        *running = Some(join);
        Ok(())
    }

    /// Enqueues a stop sentinel behind any already-produced items and waits up to 5
    /// seconds for the consumer to drain and terminate. A consumer that hasn't finished
    /// within the deadline is given up on rather than treated as a failure: the caller
    /// gets back however many items were consumed so far, read off a shared counter
    /// since the still-running task's eventual return value is no longer reachable.
    pub async fn stop(&self) -> Result<usize> {
        let mut running = self.running.lock().await;
        let join = running.take().ok_or(SensorPipelineError::QueueClosed)?;

        self.tx.send(QueueItem::Stop).await.map_err(|_| SensorPipelineError::QueueClosed)?;

        match timeout(DRAIN_TIMEOUT, join).await {
            Ok(Ok(count)) => Ok(count),
            Ok(Err(e)) => Err(SensorPipelineError::PoolTaskFailed(e.to_string())),
            Err(_) => Ok(self.consumed.load(Ordering::SeqCst)),
        }
    }
}

async fn run_consumer<T, F, Fut>(mut rx: mpsc::Receiver<QueueItem<T>>, process: F, consumed: Arc<AtomicUsize>) -> usize
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut count = 0;
    while let Some(item) = rx.recv().await {
        match item {
            QueueItem::Item(value) => {
                process(value).await;
                count += 1;
                consumed.store(count, Ordering::SeqCst);
            }
            QueueItem::Stop => break,
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn produced_items_are_all_consumed_after_stop() {
        let queue: StreamingQueue<usize> = StreamingQueue::new(4);
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        queue
            .start(move |_item| {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                }
            })
            .await
            .unwrap();

        for i in 0..20 {
            queue.produce(i).await.unwrap();
        }

        let consumed = queue.stop().await.unwrap();
        assert_eq!(consumed, 20);
        assert_eq!(counter.load(Ordering::SeqCst), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_gives_up_after_drain_timeout_without_erroring() {
        let queue: StreamingQueue<usize> = StreamingQueue::new(4);
        queue
            .start(|_item| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
            })
            .await
            .unwrap();

        queue.produce(1).await.unwrap();
        queue.produce(2).await.unwrap();

        let consumed = queue.stop().await.unwrap();
        assert_eq!(consumed, 0);
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let queue: StreamingQueue<usize> = StreamingQueue::new(4);
        queue.start(|_item| async {}).await.unwrap();
        let second = queue.start(|_item| async {}).await;
        assert!(matches!(second, Err(SensorPipelineError::AlreadyRunning)));
    }
}
