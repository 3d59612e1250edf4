//! Download orchestrator: the public face of the engine.
//!
//! [`Downloader::enqueue`] creates a `pending` job and hands its id to the
//! worker pool; [`Downloader::run_synchronously`] runs a job inline on the
//! caller's task without using a pool slot. Both paths share one registry,
//! one set of cancellation tokens and the completion hook.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::config::VidfetchConfig;
use crate::job::{DownloadOptions, Job, JobId, JobOutcome, JobStatus};
use crate::runner::{ProcessRunner, RunError};
use crate::scheduler::{run_job, CompletionHook, Shared, WorkerPool};

pub(crate) const SHUT_DOWN: &str = "engine shut down before the download started";

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("job {0} not found")]
    JobNotFound(JobId),
    #[error("job {0} is {1}; only failed jobs can be retried")]
    NotRetryable(JobId, JobStatus),
    #[error("job {0} already finished")]
    AlreadyFinished(JobId),
    #[error("downloader is shut down")]
    ShutDown,
}

/// A synchronous run that ended `failed`.
#[derive(Debug, Error)]
#[error("download of {} failed: {source}", .job.url)]
pub struct JobFailed {
    /// Terminal snapshot; `job.error` holds the diagnostic text.
    pub job: Box<Job>,
    #[source]
    pub source: RunError,
}

/// Progress view returned by [`Downloader::progress_of`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub fraction: f64,
    pub eta: String,
    pub status: JobStatus,
}

pub struct Downloader {
    shared: Arc<Shared>,
    pool: WorkerPool,
    output_dir: PathBuf,
    output_template: String,
}

impl Downloader {
    /// Starts `config.max_concurrent` workers. Must be called from within a
    /// Tokio runtime. The hook, if any, receives every terminal snapshot.
    pub fn start(config: &VidfetchConfig, runner: ProcessRunner, hook: Option<CompletionHook>) -> Self {
        let shared = Arc::new(Shared::new(runner, hook));
        let pool = WorkerPool::start(&shared, config.max_concurrent, config.queue_capacity);
        tracing::info!(
            workers = config.max_concurrent.max(1),
            queue = config.queue_capacity,
            "downloader started"
        );
        Self {
            shared,
            pool,
            output_dir: config.output_dir.clone(),
            output_template: config.output_template.clone(),
        }
    }

    fn create(&self, url: &str, options: DownloadOptions) -> Job {
        let options = options.normalized(&self.output_dir, &self.output_template);
        let job = self.shared.registry.insert(Job::new(url, options));
        self.shared.control.register(&job.id);
        job
    }

    /// Creates a `pending` job and queues it. Never waits for queue space.
    ///
    /// Fails with [`EngineError::ShutDown`] once [`shutdown`](Self::shutdown)
    /// has been called.
    pub fn enqueue(&self, url: &str, options: DownloadOptions) -> Result<JobId, EngineError> {
        if self.shared.control.is_shut_down() {
            return Err(EngineError::ShutDown);
        }
        let job_id = self.create(url, options).id;
        tracing::info!(job_id = %job_id, url, "job queued");
        if let Err(e) = self.pool.submit(&self.shared, job_id.clone()) {
            self.shared
                .finish(&job_id, JobOutcome::Failed(SHUT_DOWN.to_string()));
            return Err(e);
        }
        Ok(job_id)
    }

    /// Runs one job to completion on the caller's task, outside the pool.
    ///
    /// After shutdown the job is created and immediately failed as cancelled.
    pub async fn run_synchronously(&self, url: &str, options: DownloadOptions) -> Result<Job, JobFailed> {
        let job = self.create(url, options);
        self.run_created(job).await
    }

    async fn run_created(&self, created: Job) -> Result<Job, JobFailed> {
        if let Some(result) = run_job(&self.shared, &created.id).await {
            return result;
        }
        // Settled by the shutdown sweep before it could be claimed.
        let settled = self.shared.wait_terminal(&created.id).await;
        let job = settled.unwrap_or(created);
        if job.status == JobStatus::Completed {
            return Ok(job);
        }
        Err(JobFailed {
            job: Box::new(job),
            source: RunError::Cancelled {
                output: String::new(),
            },
        })
    }

    /// `None` for an unknown id.
    pub fn progress_of(&self, job_id: &JobId) -> Option<ProgressSnapshot> {
        self.shared.registry.get(job_id).map(|job| ProgressSnapshot {
            fraction: job.progress,
            eta: job.eta,
            status: job.status,
        })
    }

    pub fn job(&self, job_id: &JobId) -> Option<Job> {
        self.shared.registry.get(job_id)
    }

    /// Snapshots of every job, oldest first.
    pub fn all_jobs(&self) -> Vec<Job> {
        let mut jobs = self.shared.registry.list();
        jobs.sort_by(|a, b| a.id.cmp(&b.id));
        jobs
    }

    /// Cancels a pending or running job. A running job's process is killed;
    /// a pending one is failed when a worker dequeues it.
    pub fn cancel(&self, job_id: &JobId) -> Result<(), EngineError> {
        let job = self
            .shared
            .registry
            .get(job_id)
            .ok_or_else(|| EngineError::JobNotFound(job_id.clone()))?;
        if job.is_terminal() || !self.shared.control.cancel(job_id) {
            return Err(EngineError::AlreadyFinished(job_id.clone()));
        }
        tracing::info!(job_id = %job_id, status = %job.status, "cancel requested");
        Ok(())
    }

    /// Queues a new job with the URL and options of a failed one.
    pub fn retry(&self, job_id: &JobId) -> Result<JobId, EngineError> {
        let job = self
            .shared
            .registry
            .get(job_id)
            .ok_or_else(|| EngineError::JobNotFound(job_id.clone()))?;
        if job.status != JobStatus::Failed {
            return Err(EngineError::NotRetryable(job_id.clone(), job.status));
        }
        tracing::info!(job_id = %job_id, "retrying");
        self.enqueue(&job.url, job.options)
    }

    /// Seeds the runner's binary path. Returns false if one is already cached.
    pub fn set_binary(&self, path: impl Into<PathBuf>) -> bool {
        self.shared.runner.set_binary(path)
    }

    /// Resolves with the job's terminal snapshot. `None` for an unknown id.
    pub async fn wait(&self, job_id: &JobId) -> Option<Job> {
        self.shared.wait_terminal(job_id).await
    }

    /// Kills every running process, stops the workers and fails every job
    /// that had not finished. Returns after all completion hooks have run.
    ///
    /// Callable through a shared handle; later `enqueue` calls fail with
    /// [`EngineError::ShutDown`]. Must not be awaited from inside the
    /// completion hook, since it waits for every hook to return.
    pub async fn shutdown(&self) {
        tracing::info!("downloader shutting down");
        self.shared.control.cancel_all();
        self.pool.join().await;
        for job_id in self.shared.registry.unfinished() {
            self.shared
                .finish(&job_id, JobOutcome::Failed(SHUT_DOWN.to_string()));
        }
        self.shared.tracker.close();
        self.shared.tracker.wait().await;
        tracing::info!("downloader stopped");
    }
}

impl Drop for Downloader {
    fn drop(&mut self) {
        self.shared.control.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn job_settled_before_claim_returns_its_registry_snapshot() {
        let dl = Downloader::start(
            &VidfetchConfig::default(),
            ProcessRunner::with_binary("/nonexistent/yt-dlp"),
            None,
        );
        let created = dl.create("https://example.com/v", DownloadOptions::default());
        dl.shared
            .finish(&created.id, JobOutcome::Failed(SHUT_DOWN.to_string()));

        let failed = dl.run_created(created.clone()).await.unwrap_err();
        assert_eq!(failed.job.id, created.id);
        assert_eq!(failed.job.status, JobStatus::Failed);
        assert_eq!(failed.job.error, SHUT_DOWN);
        assert_eq!(dl.all_jobs().len(), 1);
        dl.shutdown().await;
    }

    #[tokio::test]
    async fn enqueue_after_shutdown_is_rejected() {
        let dl = Downloader::start(
            &VidfetchConfig::default(),
            ProcessRunner::with_binary("/nonexistent/yt-dlp"),
            None,
        );
        dl.shutdown().await;
        let err = dl
            .enqueue("https://example.com/v", DownloadOptions::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::ShutDown));
        assert!(dl.all_jobs().is_empty());
    }
}
