//! Thread-safe job registry: the single source of truth for job state.
//!
//! One `RwLock` guards the whole map. Every accessor hands out clones, so
//! callers never hold a reference past the lock and every mutation goes
//! through [`JobRegistry::mutate`].

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::job::{DownloadOptions, Job, JobId, JobOutcome};
use crate::progress::ProgressDelta;

#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Every write is a whole-field assignment, so a panic while holding the
    // lock cannot leave a half-updated job behind.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<JobId, Job>> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<JobId, Job>> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocates a new `pending` job and returns its id.
    pub fn create(&self, url: &str, options: DownloadOptions) -> JobId {
        self.insert(Job::new(url, options)).id
    }

    /// Stores a freshly built job; returns the stored snapshot.
    pub(crate) fn insert(&self, job: Job) -> Job {
        self.write().insert(job.id.clone(), job.clone());
        job
    }

    /// Snapshot of one job.
    pub fn get(&self, id: &JobId) -> Option<Job> {
        self.read().get(id).cloned()
    }

    /// Snapshots of every job, in no particular order.
    pub fn list(&self) -> Vec<Job> {
        self.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Runs `f` on the job under the write lock. `None` if the id is unknown.
    pub fn mutate<R>(&self, id: &JobId, f: impl FnOnce(&mut Job) -> R) -> Option<R> {
        self.write().get_mut(id).map(f)
    }

    /// `pending` -> `downloading`; returns the claimed snapshot, or `None`
    /// if the job is unknown or was not pending.
    pub(crate) fn claim(&self, id: &JobId) -> Option<Job> {
        self.mutate(id, |job| job.begin().then(|| job.clone()))
            .flatten()
    }

    pub(crate) fn apply_progress(&self, id: &JobId, delta: &ProgressDelta) {
        self.mutate(id, |job| job.apply_progress(delta));
    }

    pub(crate) fn set_destination(&self, id: &JobId, path: &str) {
        self.mutate(id, |job| job.set_destination(path));
    }

    /// Terminal transition. Returns the terminal snapshot only if this call
    /// made the transition, so each job yields it at most once.
    pub(crate) fn finish(&self, id: &JobId, outcome: JobOutcome) -> Option<Job> {
        self.mutate(id, |job| job.finish(outcome).then(|| job.clone()))
            .flatten()
    }

    /// Ids of every job that has not reached a terminal state.
    pub(crate) fn unfinished(&self) -> Vec<JobId> {
        self.read()
            .values()
            .filter(|job| !job.is_terminal())
            .map(|job| job.id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStatus;
    use std::sync::Arc;

    #[test]
    fn create_get_list() {
        let registry = JobRegistry::new();
        assert!(registry.is_empty());
        let a = registry.create("https://a.example/1", DownloadOptions::default());
        let b = registry.create("https://b.example/2", DownloadOptions::default());
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);

        let job = registry.get(&a).unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.url, "https://a.example/1");

        let mut urls: Vec<_> = registry.list().into_iter().map(|j| j.url).collect();
        urls.sort();
        assert_eq!(urls, vec!["https://a.example/1", "https://b.example/2"]);
    }

    #[test]
    fn unknown_id_is_not_found() {
        let registry = JobRegistry::new();
        let id = JobId::from("dl_0");
        assert!(registry.get(&id).is_none());
        assert!(registry.mutate(&id, |job| job.title.clear()).is_none());
        assert!(registry.claim(&id).is_none());
    }

    #[test]
    fn snapshots_are_copies() {
        let registry = JobRegistry::new();
        let id = registry.create("https://a.example/1", DownloadOptions::default());
        let mut snapshot = registry.get(&id).unwrap();
        snapshot.title = "edited locally".to_string();
        assert!(registry.get(&id).unwrap().title.is_empty());
    }

    #[test]
    fn claim_and_finish_happen_once() {
        let registry = JobRegistry::new();
        let id = registry.create("https://a.example/1", DownloadOptions::default());
        assert!(registry.claim(&id).is_some());
        assert!(registry.claim(&id).is_none());
        assert_eq!(registry.unfinished(), vec![id.clone()]);

        let done = registry.finish(&id, JobOutcome::Completed).unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert!(registry
            .finish(&id, JobOutcome::Failed("late".to_string()))
            .is_none());
        assert!(registry.unfinished().is_empty());
    }

    #[test]
    fn concurrent_progress_updates_are_not_lost() {
        let registry = Arc::new(JobRegistry::new());
        let id = registry.create("https://a.example/1", DownloadOptions::default());
        registry.claim(&id);

        std::thread::scope(|s| {
            for t in 0..4 {
                let registry = Arc::clone(&registry);
                let id = id.clone();
                s.spawn(move || {
                    for i in 0..250 {
                        registry.mutate(&id, |job| job.downloaded += 1);
                        if i % 50 == 0 {
                            let _ = registry.get(&id);
                        }
                    }
                    t
                });
            }
        });
        assert_eq!(registry.get(&id).unwrap().downloaded, 1000);
    }
}
