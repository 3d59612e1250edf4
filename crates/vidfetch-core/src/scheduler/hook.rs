//! Completion hook invoked once per terminal transition.

use std::fmt;
use std::sync::Arc;
use tokio_util::task::TaskTracker;

use crate::job::Job;

/// Callback receiving the full snapshot of every job that reaches
/// `completed` or `failed`. Supplied at construction time.
///
/// Runs on the blocking pool, so it may do file I/O or query the
/// downloader without stalling a worker.
#[derive(Clone)]
pub struct CompletionHook(Arc<dyn Fn(Job) + Send + Sync>);

impl CompletionHook {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Job) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub(crate) fn fire(&self, tracker: &TaskTracker, job: Job) {
        let hook = Arc::clone(&self.0);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracker.spawn_blocking_on(move || hook(job), &handle);
            }
            // Dropped outside a runtime (e.g. during runtime teardown).
            Err(_) => hook(job),
        }
    }
}

impl fmt::Debug for CompletionHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CompletionHook(..)")
    }
}
