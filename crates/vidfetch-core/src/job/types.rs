//! Job identifier, status and the job record itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use super::options::{non_empty, DownloadOptions};
use crate::progress::ProgressDelta;

/// High-water mark for issued ids, in nanoseconds since the epoch.
static LAST_ID_NANOS: AtomicU64 = AtomicU64::new(0);

/// Opaque job identifier of the form `dl_<unix-nanos>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Allocates a new id from the wall clock. Ids are strictly increasing
    /// within a process, even when several are issued in the same clock tick.
    pub fn generate() -> Self {
        let now = Utc::now()
            .timestamp_nanos_opt()
            .map(|n| n.max(0) as u64)
            .unwrap_or_default();
        let mut prev = LAST_ID_NANOS.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match LAST_ID_NANOS.compare_exchange_weak(
                prev,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return JobId(format!("dl_{next}")),
                Err(actual) => prev = actual,
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        JobId(s.to_string())
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        JobId(s)
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Downloading,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Downloading => "downloading",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// `completed` and `failed` admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// How the external process ended for a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    /// Carries the diagnostic text stored in the job's `error` field.
    Failed(String),
}

/// One tracked download request and its lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub platform: String,
    pub status: JobStatus,
    /// Fraction complete in [0.0, 1.0].
    pub progress: f64,
    #[serde(default)]
    pub speed: String,
    #[serde(default)]
    pub eta: String,
    /// Total size in bytes as reported by the tool (0 when unknown).
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub downloaded: u64,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub thumbnail: String,
    /// Media duration in seconds (0 when unknown).
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub quality: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub subtitle_count: usize,
    #[serde(default)]
    pub subtitle_langs: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: String,
    /// Snapshot of the options the job was created with (used for retry).
    #[serde(default)]
    pub options: DownloadOptions,
}

impl Job {
    /// New `pending` job with a fresh id.
    pub fn new(url: &str, options: DownloadOptions) -> Self {
        let requested = if options.wants_subtitles() {
            options.subtitle_langs.clone()
        } else {
            Vec::new()
        };
        Job {
            id: JobId::generate(),
            url: url.to_string(),
            title: String::new(),
            platform: platform_from_url(url).unwrap_or_default(),
            status: JobStatus::Pending,
            progress: 0.0,
            speed: String::new(),
            eta: String::new(),
            file_size: 0,
            downloaded: 0,
            file_path: String::new(),
            thumbnail: String::new(),
            duration: 0,
            quality: non_empty(&options.format).unwrap_or_default().to_string(),
            format: non_empty(&options.video_format)
                .unwrap_or_default()
                .to_string(),
            subtitle_count: requested.len(),
            subtitle_langs: requested,
            created_at: Utc::now(),
            completed_at: None,
            error: String::new(),
            options,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// `pending` -> `downloading`. Returns false (and changes nothing) from any other state.
    pub(crate) fn begin(&mut self) -> bool {
        if self.status != JobStatus::Pending {
            return false;
        }
        self.status = JobStatus::Downloading;
        true
    }

    /// Applies one parsed progress line. Ignored unless downloading; the
    /// fraction never moves backwards.
    pub(crate) fn apply_progress(&mut self, delta: &ProgressDelta) {
        if self.status != JobStatus::Downloading {
            return;
        }
        self.progress = self.progress.max(delta.fraction.clamp(0.0, 1.0));
        if let Some(eta) = &delta.eta {
            self.eta.clone_from(eta);
        }
        if let Some(speed) = &delta.speed {
            self.speed.clone_from(speed);
        }
        if let Some(total) = delta.total_bytes {
            self.file_size = total;
            let done = (delta.fraction.clamp(0.0, 1.0) * total as f64).round() as u64;
            self.downloaded = self.downloaded.max(done).min(total);
        }
    }

    /// Records where the tool is writing; the title is taken from the file stem.
    pub(crate) fn set_destination(&mut self, path: &str) {
        if self.status != JobStatus::Downloading {
            return;
        }
        self.file_path = path.to_string();
        if let Some(stem) = Path::new(path).file_stem().and_then(|s| s.to_str()) {
            self.title = stem.to_string();
        }
    }

    /// Moves to a terminal state. Returns false if the job was already terminal,
    /// or if `Completed` is reported for a job that never started.
    pub(crate) fn finish(&mut self, outcome: JobOutcome) -> bool {
        match (self.status, outcome) {
            (JobStatus::Completed | JobStatus::Failed, _) => false,
            (JobStatus::Pending, JobOutcome::Completed) => false,
            (_, JobOutcome::Completed) => {
                self.status = JobStatus::Completed;
                self.progress = 1.0;
                if self.file_size > 0 {
                    self.downloaded = self.file_size;
                }
                self.completed_at = Some(Utc::now());
                true
            }
            (_, JobOutcome::Failed(reason)) => {
                self.status = JobStatus::Failed;
                self.error = reason;
                self.completed_at = Some(Utc::now());
                true
            }
        }
    }
}

/// Host of `url` without a leading `www.`, e.g. `youtube.com`.
fn platform_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}
