//! Fixed set of long-lived workers pulling job ids from one bounded queue.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

use crate::downloader::{EngineError, SHUT_DOWN};
use crate::job::{JobId, JobOutcome};

use super::{run_job, Shared};

pub(crate) struct WorkerPool {
    queue: mpsc::Sender<JobId>,
    workers: Mutex<JoinSet<()>>,
}

impl WorkerPool {
    /// Starts `workers` workers (at least one) over a queue holding up to
    /// `capacity` ids. Must be called from within a Tokio runtime.
    pub(crate) fn start(shared: &Arc<Shared>, workers: usize, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let mut set = JoinSet::new();
        for n in 0..workers.max(1) {
            set.spawn(worker(n, Arc::clone(shared), Arc::clone(&rx)));
        }
        tracing::debug!(workers = set.len(), capacity, "worker pool started");
        Self {
            queue: tx,
            workers: Mutex::new(set),
        }
    }

    /// Queues `job_id` without blocking the caller. When the queue is full
    /// the push is handed to a background task that waits for room; if the
    /// workers are gone by then, the job is failed there.
    pub(crate) fn submit(&self, shared: &Arc<Shared>, job_id: JobId) -> Result<(), EngineError> {
        match self.queue.try_send(job_id) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(job_id)) => {
                tracing::debug!(job_id = %job_id, "queue full; deferring push");
                let queue = self.queue.clone();
                let tracker = shared.tracker.clone();
                let shared = Arc::clone(shared);
                tracker.spawn(async move {
                    if let Err(mpsc::error::SendError(job_id)) = queue.send(job_id).await {
                        tracing::debug!(job_id = %job_id, "queue closed before deferred push");
                        shared.finish(&job_id, JobOutcome::Failed(SHUT_DOWN.to_string()));
                    }
                });
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(EngineError::ShutDown),
        }
    }

    /// Waits for every worker to exit. Workers exit once the engine's root
    /// token is cancelled and their current job has reached a terminal state.
    pub(crate) async fn join(&self) {
        let mut workers = self.workers.lock().await;
        while let Some(res) = workers.join_next().await {
            if let Err(e) = res {
                tracing::error!("worker task failed: {}", e);
            }
        }
    }
}

async fn worker(n: usize, shared: Arc<Shared>, queue: Arc<Mutex<mpsc::Receiver<JobId>>>) {
    loop {
        let next = tokio::select! {
            biased;
            _ = shared.control.shut_down() => None,
            job_id = async { queue.lock().await.recv().await } => job_id,
        };
        let Some(job_id) = next else {
            break;
        };
        // Own task per job so a panic ends only that job (its guard fails it).
        let task = tokio::spawn({
            let shared = Arc::clone(&shared);
            async move {
                run_job(&shared, &job_id).await;
            }
        });
        if let Err(e) = task.await {
            tracing::error!(worker = n, "job task ended abnormally: {}", e);
        }
    }
    tracing::debug!(worker = n, "worker stopped");
}
