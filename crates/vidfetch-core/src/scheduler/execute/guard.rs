//! RAII guard that fails a claimed job if its driver goes away early.

use crate::job::{Job, JobId, JobOutcome};

use super::super::Shared;

pub(super) const ABANDONED: &str = "worker stopped before the download finished";

/// Marks the job `failed` when dropped while still armed (panic, task
/// abort), so no job is left `downloading` after its driver exits.
pub(super) struct TerminalGuard<'a> {
    shared: &'a Shared,
    job_id: &'a JobId,
    armed: bool,
}

impl<'a> TerminalGuard<'a> {
    pub(super) fn new(shared: &'a Shared, job_id: &'a JobId) -> Self {
        Self {
            shared,
            job_id,
            armed: true,
        }
    }

    /// Records the real outcome and disarms the guard.
    pub(super) fn finish(mut self, outcome: JobOutcome) -> Option<Job> {
        self.armed = false;
        self.shared.finish(self.job_id, outcome)
    }
}

impl Drop for TerminalGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::error!(job_id = %self.job_id, "job driver exited without a result");
            self.shared
                .finish(self.job_id, JobOutcome::Failed(ABANDONED.to_string()));
        }
    }
}
