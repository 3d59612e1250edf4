//! Worker pool and per-job execution.
//!
//! Job ids flow from the bounded intake queue to long-lived workers; each
//! worker drives one job at a time through the runner and is the only
//! writer of that job's `downloading -> terminal` transition.

mod execute;
mod hook;
mod pool;

use tokio::sync::Notify;
use tokio_util::task::TaskTracker;

use crate::control::JobControl;
use crate::job::{Job, JobId, JobOutcome, JobStatus};
use crate::registry::JobRegistry;
use crate::runner::ProcessRunner;

pub(crate) use execute::run_job;
pub use hook::CompletionHook;
pub(crate) use pool::WorkerPool;

/// State shared by the orchestrator, every worker and the synchronous path.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) registry: JobRegistry,
    pub(crate) runner: ProcessRunner,
    pub(crate) control: JobControl,
    hook: Option<CompletionHook>,
    finished: Notify,
    /// Hook invocations and deferred queue pushes.
    pub(crate) tracker: TaskTracker,
}

impl Shared {
    pub(crate) fn new(runner: ProcessRunner, hook: Option<CompletionHook>) -> Self {
        Self {
            registry: JobRegistry::new(),
            runner,
            control: JobControl::new(),
            hook,
            finished: Notify::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Terminal transition for `id`. Returns the terminal snapshot if this
    /// call made the transition; the hook fires only in that case, after the
    /// registry lock has been released.
    pub(crate) fn finish(&self, id: &JobId, outcome: JobOutcome) -> Option<Job> {
        self.control.unregister(id);
        let job = self.registry.finish(id, outcome)?;
        match job.status {
            JobStatus::Completed => {
                tracing::info!(job_id = %id, path = %job.file_path, "download completed")
            }
            _ => tracing::warn!(job_id = %id, error = %first_line(&job.error), "download failed"),
        }
        self.finished.notify_waiters();
        if let Some(hook) = &self.hook {
            hook.fire(&self.tracker, job.clone());
        }
        Some(job)
    }

    /// Resolves with the job's terminal snapshot. `None` if the id is unknown.
    pub(crate) async fn wait_terminal(&self, id: &JobId) -> Option<Job> {
        loop {
            let notified = self.finished.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            let job = self.registry.get(id)?;
            if job.is_terminal() {
                return Some(job);
            }
            notified.await;
        }
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}
