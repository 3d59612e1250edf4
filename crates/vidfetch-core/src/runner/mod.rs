//! Process runner: builds the yt-dlp argument vector for a job, runs the
//! tool, and streams its combined output to the caller line by line.

mod args;
mod process;

use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::job::DownloadOptions;
use crate::locate::{BinaryLocator, FixedLocator, LocateError};
use crate::progress::OutputLog;

pub use args::{
    build_args, format_choice, FormatChoice, AUDIO_FORMAT, BROWSER_HEADERS,
    DEFAULT_COOKIE_BROWSER, DEFAULT_FORMAT, DEFAULT_USER_AGENT,
};

/// Why a run did not succeed.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Locate(#[from] LocateError),
    #[error("failed to start {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("yt-dlp exited with {status}")]
    Exited { status: ExitStatus, output: String },
    #[error("download cancelled")]
    Cancelled { output: String },
    #[error("waiting for yt-dlp: {0}")]
    Io(#[from] std::io::Error),
}

impl RunError {
    /// Text stored as the failed job's `error`: the captured output for
    /// process failures, the error message otherwise.
    pub fn diagnostic(&self) -> String {
        match self {
            RunError::Exited { output, .. } if !output.trim().is_empty() => output.clone(),
            RunError::Cancelled { output } if !output.trim().is_empty() => {
                format!("{self}\n{output}")
            }
            other => other.to_string(),
        }
    }

    /// Captured output, when the process got far enough to produce any.
    pub fn output(&self) -> Option<&str> {
        match self {
            RunError::Exited { output, .. } | RunError::Cancelled { output } => Some(output),
            _ => None,
        }
    }
}

/// Runs yt-dlp for one job at a time; shareable across workers.
///
/// The binary path is resolved through the locator on first use and cached
/// for every later run.
pub struct ProcessRunner {
    locator: Arc<dyn BinaryLocator>,
    binary: OnceCell<PathBuf>,
    leading_args: Vec<String>,
}

impl std::fmt::Debug for ProcessRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRunner")
            .field("binary", &self.binary.get())
            .field("leading_args", &self.leading_args)
            .finish_non_exhaustive()
    }
}

impl ProcessRunner {
    pub fn new(locator: Arc<dyn BinaryLocator>) -> Self {
        Self {
            locator,
            binary: OnceCell::new(),
            leading_args: Vec::new(),
        }
    }

    /// Runner with a known binary path; the locator is never consulted.
    pub fn with_binary(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let runner = Self::new(Arc::new(FixedLocator(path.clone())));
        let _ = runner.binary.set(path);
        runner
    }

    /// Arguments placed before the generated ones, e.g. `-m yt_dlp` when the
    /// binary is a Python interpreter.
    pub fn leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Seeds the binary cache. Returns false if a path was already cached.
    pub fn set_binary(&self, path: impl Into<PathBuf>) -> bool {
        self.binary.set(path.into()).is_ok()
    }

    /// Cached binary path, resolving it through the locator on first use.
    /// The lookup touches the filesystem, so it runs on the blocking pool.
    pub async fn binary(&self) -> Result<PathBuf, LocateError> {
        self.binary
            .get_or_try_init(|| async {
                let locator = Arc::clone(&self.locator);
                let path = tokio::task::spawn_blocking(move || locator.locate()).await??;
                tracing::info!(path = %path.display(), "yt-dlp located");
                Ok::<_, LocateError>(path)
            })
            .await
            .cloned()
    }

    /// Runs one download and returns the tool's full output on success.
    ///
    /// Every output line (stdout and stderr) is passed to `on_line` as it
    /// arrives. Cancelling `cancel` kills the process.
    pub async fn run<F>(
        &self,
        url: &str,
        options: &DownloadOptions,
        cancel: &CancellationToken,
        on_line: F,
    ) -> Result<OutputLog, RunError>
    where
        F: FnMut(&str),
    {
        let binary = self.binary().await?;
        let mut argv = self.leading_args.clone();
        argv.extend(build_args(url, options));
        tracing::debug!(binary = %binary.display(), args = ?argv, "spawning yt-dlp");
        process::run_streaming(&binary, &argv, cancel, on_line).await
    }
}
