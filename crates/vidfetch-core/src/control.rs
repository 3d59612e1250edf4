//! Job control for cancellation: one token per live job, all children of
//! an engine-wide root token.
//!
//! A token is registered when a job is created, so a job cancelled while
//! still queued is failed as soon as a worker picks it up. Cancelling the
//! root (engine shutdown) cancels every job token.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tokio_util::sync::CancellationToken;

use crate::job::JobId;

#[derive(Debug, Default)]
pub struct JobControl {
    root: CancellationToken,
    jobs: RwLock<HashMap<JobId, CancellationToken>>,
}

impl JobControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a job and returns its cancellation token.
    pub fn register(&self, job_id: &JobId) -> CancellationToken {
        let token = self.root.child_token();
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(job_id.clone(), token.clone());
        token
    }

    /// Token for a registered job, registering one if missing.
    pub fn token(&self, job_id: &JobId) -> CancellationToken {
        let existing = self
            .jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(job_id)
            .cloned();
        existing.unwrap_or_else(|| self.register(job_id))
    }

    /// Unregister a job (call once the job is terminal).
    pub fn unregister(&self, job_id: &JobId) {
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(job_id);
    }

    /// Cancels one job. Returns false if the job is not registered.
    pub fn cancel(&self, job_id: &JobId) -> bool {
        match self
            .jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(job_id)
        {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels every job, including ones registered later.
    pub fn cancel_all(&self) {
        self.root.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.root.is_cancelled()
    }

    /// Resolves once [`cancel_all`](Self::cancel_all) has been called.
    pub async fn shut_down(&self) {
        self.root.cancelled().await
    }
}
