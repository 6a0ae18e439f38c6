// Persistence queue - every durable write goes through one ordered worker
// Jobs run one at a time in submission order; the worker yields between jobs

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::{Error, Result};

type Job = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send + 'static>;

/// Result handle of an enqueued job. Awaiting it is optional: dropping the
/// ticket does not cancel the job.
pub struct QueueTicket<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Future for QueueTicket<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(Error::Queue("job dropped before completion".to_string()))),
            Poll::Pending => Poll::Pending,
        }
    }
}

pub struct PersistenceQueue {
    tx: mpsc::UnboundedSender<Job>,
    enqueued: Arc<AtomicUsize>,
    completed: Arc<AtomicUsize>,
}

impl PersistenceQueue {
    /// Spawn the worker on the current tokio runtime
    pub fn new() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let completed = Arc::new(AtomicUsize::new(0));

        let done = completed.clone();
        tokio::spawn(async move {
            debug!("[PersistenceQueue] Worker started");
            while let Some(job) = rx.recv().await {
                job().await;
                done.fetch_add(1, Ordering::SeqCst);
                // Let interactive work run before the next write
                tokio::task::yield_now().await;
            }
            debug!("[PersistenceQueue] Worker stopped");
        });

        Self {
            tx,
            enqueued: Arc::new(AtomicUsize::new(0)),
            completed,
        }
    }

    /// Append a job. It runs after every job submitted before it.
    pub fn enqueue<T, F, Fut>(&self, label: &'static str, op: F) -> QueueTicket<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.enqueued.fetch_add(1, Ordering::SeqCst);
        debug!("[PersistenceQueue] Enqueued {}", label);
        self.submit(label, op)
    }

    fn submit<T, F, Fut>(&self, label: &'static str, op: F) -> QueueTicket<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (resultTx, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            async move {
                let result = op().await;
                if let Err(e) = &result {
                    warn!("[PersistenceQueue] {} failed: {}", label, e);
                }
                let _ = resultTx.send(result);
            }
            .boxed()
        });

        if self.tx.send(job).is_err() {
            warn!("[PersistenceQueue] Worker gone, dropping {}", label);
        }
        QueueTicket { rx }
    }

    /// Wait until every job submitted so far has finished.
    /// Not counted as an enqueued job.
    pub async fn drain(&self) -> Result<()> {
        self.submit("drain", || async { Ok(()) }).await
    }

    /// Jobs submitted through `enqueue`
    pub fn enqueuedCount(&self) -> usize {
        self.enqueued.load(Ordering::SeqCst)
    }

    /// Jobs finished by the worker, drains included
    pub fn completedCount(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

impl Default for PersistenceQueue {
    fn default() -> Self {
        Self::new()
    }
}
