//! Drive one job from `pending` to a terminal state.

mod guard;

use crate::downloader::JobFailed;
use crate::job::{Job, JobId, JobOutcome};
use crate::progress::{parse_destination, parse_progress};
use crate::runner::RunError;

use super::Shared;
use guard::TerminalGuard;

/// Claims `job_id`, runs it and records the terminal state.
///
/// Returns `None` when the job was not pending (unknown, already claimed or
/// already finished); otherwise the terminal snapshot, as `Err` for a
/// failed job.
pub(crate) async fn run_job(shared: &Shared, job_id: &JobId) -> Option<Result<Job, JobFailed>> {
    let Some(job) = shared.registry.claim(job_id) else {
        tracing::debug!(job_id = %job_id, "job no longer pending; skipped");
        return None;
    };
    let cancel = shared.control.token(job_id);
    let guard = TerminalGuard::new(shared, job_id);

    if cancel.is_cancelled() {
        return fail(
            guard,
            RunError::Cancelled {
                output: String::new(),
            },
        );
    }

    tracing::info!(job_id = %job_id, url = %job.url, "download started");
    let result = shared
        .runner
        .run(&job.url, &job.options, &cancel, |line| {
            if let Some(delta) = parse_progress(line) {
                shared.registry.apply_progress(job_id, &delta);
            } else if let Some(path) = parse_destination(line) {
                shared.registry.set_destination(job_id, path);
            }
        })
        .await;

    match result {
        Ok(output) => {
            tracing::debug!(job_id = %job_id, lines = output.line_count(), "yt-dlp exited cleanly");
            guard.finish(JobOutcome::Completed).map(Ok)
        }
        Err(e) => fail(guard, e),
    }
}

fn fail(guard: TerminalGuard<'_>, source: RunError) -> Option<Result<Job, JobFailed>> {
    let job = guard.finish(JobOutcome::Failed(source.diagnostic()))?;
    Some(Err(JobFailed {
        job: Box::new(job),
        source,
    }))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::job::{DownloadOptions, JobStatus};
    use crate::runner::ProcessRunner;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn shared_with_script(dir: &TempDir, body: &str) -> Arc<Shared> {
        let script = dir.path().join("yt-dlp.sh");
        std::fs::write(&script, body).unwrap();
        let runner = ProcessRunner::with_binary("/bin/sh")
            .leading_args([script.to_string_lossy().into_owned()]);
        Arc::new(Shared::new(runner, None))
    }

    #[tokio::test]
    async fn progress_lines_update_the_registry() {
        let dir = TempDir::new().unwrap();
        let shared = shared_with_script(
            &dir,
            "echo '[download] Destination: /tmp/out/My Clip.mp4'\n\
             echo '[download]  42.0% of 10.00MiB at 1.00MiB/s ETA 00:06'\n",
        );
        let id = shared
            .registry
            .create("https://www.example.com/v/1", DownloadOptions::default());
        let job = run_job(&shared, &id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 1.0);
        assert_eq!(job.title, "My Clip");
        assert_eq!(job.file_path, "/tmp/out/My Clip.mp4");
        assert_eq!(job.speed, "1.00MiB/s");
        assert_eq!(job.file_size, 10 * 1024 * 1024);
        assert!(run_job(&shared, &id).await.is_none(), "terminal jobs are not rerun");
    }

    #[tokio::test]
    async fn cancelled_before_claim_fails_without_spawning() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("spawned");
        let shared = shared_with_script(&dir, &format!("touch '{}'\n", marker.display()));
        let id = shared
            .registry
            .create("https://example.com/v", DownloadOptions::default());
        shared.control.register(&id);
        shared.control.cancel(&id);

        let failed = run_job(&shared, &id).await.unwrap().unwrap_err();
        assert_eq!(failed.job.status, JobStatus::Failed);
        assert_eq!(failed.job.error, "download cancelled");
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn aborted_driver_leaves_the_job_failed() {
        let dir = TempDir::new().unwrap();
        let shared = shared_with_script(&dir, "echo '[download]   1.0% of 1.00MiB'\nexec sleep 30\n");
        let id = shared
            .registry
            .create("https://example.com/v", DownloadOptions::default());

        let task = tokio::spawn({
            let shared = Arc::clone(&shared);
            let id = id.clone();
            async move {
                run_job(&shared, &id).await;
            }
        });
        while shared.registry.get(&id).unwrap().progress == 0.0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        task.abort();
        let _ = task.await;

        let job = shared.registry.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error, guard::ABANDONED);
    }

    #[tokio::test]
    async fn unknown_job_is_skipped() {
        let dir = TempDir::new().unwrap();
        let shared = shared_with_script(&dir, "exit 0\n");
        assert!(run_job(&shared, &JobId::from("dl_1")).await.is_none());
    }
}
