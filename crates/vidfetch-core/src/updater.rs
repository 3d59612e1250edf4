//! yt-dlp self-update and version queries.
//!
//! Update checks are debounced: a second [`Updater::check_and_update`] within
//! the interval returns [`UpdateStatus::Skipped`] without running the tool.
//! With [`Updater::persist_last_check`] the time of the last check survives
//! across processes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output, Stdio};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Release channel passed to the tool's updater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateChannel {
    #[default]
    Stable,
    Nightly,
}

impl UpdateChannel {
    fn args(self) -> &'static [&'static str] {
        match self {
            UpdateChannel::Stable => &["-U"],
            UpdateChannel::Nightly => &["--update-to", "nightly"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    /// Checked recently; the tool was not run.
    Skipped,
    UpToDate,
    /// Carries the updater's output.
    Updated(String),
}

impl fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateStatus::Skipped => f.write_str("Skipped (recently checked)"),
            UpdateStatus::UpToDate => f.write_str("Up to date"),
            UpdateStatus::Updated(output) => write!(f, "Updated: {}", output.trim()),
        }
    }
}

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("failed to start {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("update failed ({status}): {output}")]
    Failed { status: ExitStatus, output: String },
    #[error("version query failed ({status})")]
    Version { status: ExitStatus },
}

#[derive(Debug)]
pub struct Updater {
    binary: PathBuf,
    leading_args: Vec<String>,
    interval: Duration,
    last_check: Mutex<Option<DateTime<Utc>>>,
    stamp: Option<PathBuf>,
}

impl Updater {
    pub fn new(binary: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            binary: binary.into(),
            leading_args: Vec::new(),
            interval,
            last_check: Mutex::new(None),
            stamp: None,
        }
    }

    /// `~/.local/state/vidfetch/last_update_check`.
    pub fn default_stamp_path() -> anyhow::Result<PathBuf> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("vidfetch")?;
        Ok(xdg_dirs
            .get_state_home()
            .join("vidfetch")
            .join("last_update_check"))
    }

    /// Loads the last check time from `path` and records every new check
    /// there. A missing or unreadable file counts as "never checked".
    pub fn persist_last_check(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        *self
            .last_check
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner) = read_stamp(&path);
        self.stamp = Some(path);
        self
    }

    /// Arguments placed before the updater flags (see `ProcessRunner::leading_args`).
    pub fn leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Claims the current check slot; false if the last check is too recent.
    fn begin_check(&self) -> bool {
        let mut last = self.last_check.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now();
        let recent = last.is_some_and(|at| {
            (now - at)
                .to_std()
                .is_ok_and(|elapsed| elapsed < self.interval)
        });
        if recent {
            return false;
        }
        *last = Some(now);
        if let Some(path) = &self.stamp {
            if let Err(e) = write_stamp(path, now) {
                tracing::warn!(path = %path.display(), "failed to record update check: {}", e);
            }
        }
        true
    }

    async fn output(&self, args: &[&str]) -> Result<Output, UpdateError> {
        Command::new(&self.binary)
            .args(&self.leading_args)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| UpdateError::Spawn {
                program: self.binary.clone(),
                source,
            })
    }

    /// Runs the tool's updater for `channel` unless a check ran within the interval.
    pub async fn check_and_update(&self, channel: UpdateChannel) -> Result<UpdateStatus, UpdateError> {
        if !self.begin_check() {
            tracing::debug!("update check skipped; checked recently");
            return Ok(UpdateStatus::Skipped);
        }
        tracing::info!(?channel, "checking for yt-dlp updates");
        let out = self.output(channel.args()).await?;
        let mut text = String::from_utf8_lossy(&out.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&out.stderr));
        if !out.status.success() {
            return Err(UpdateError::Failed {
                status: out.status,
                output: text,
            });
        }
        let lower = text.to_ascii_lowercase();
        if lower.contains("up-to-date") || lower.contains("up to date") {
            return Ok(UpdateStatus::UpToDate);
        }
        tracing::info!("yt-dlp updated");
        Ok(UpdateStatus::Updated(text))
    }

    /// `yt-dlp --version`, trimmed.
    pub async fn version(&self) -> Result<String, UpdateError> {
        let out = self.output(&["--version"]).await?;
        if !out.status.success() {
            return Err(UpdateError::Version { status: out.status });
        }
        Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
    }
}

fn read_stamp(path: &Path) -> Option<DateTime<Utc>> {
    let text = fs::read_to_string(path).ok()?;
    DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .map(|at| at.with_timezone(&Utc))
}

fn write_stamp(path: &Path, at: DateTime<Utc>) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, at.to_rfc3339())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Updater running `body` through `/bin/sh`.
    fn fake(dir: &TempDir, body: &str, interval: Duration) -> Updater {
        let script = dir.path().join("yt-dlp.sh");
        std::fs::write(&script, body).unwrap();
        Updater::new("/bin/sh", interval).leading_args([script.to_string_lossy().into_owned()])
    }

    #[tokio::test]
    async fn second_check_within_interval_is_skipped() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("calls");
        let updater = fake(
            &dir,
            &format!("echo \"$@\" >> '{}'\necho 'Updated yt-dlp to stable@2024.10.07'\n", log.display()),
            Duration::from_secs(3600),
        );
        let first = updater.check_and_update(UpdateChannel::Stable).await.unwrap();
        assert!(matches!(first, UpdateStatus::Updated(ref out) if out.contains("2024.10.07")));
        let second = updater.check_and_update(UpdateChannel::Stable).await.unwrap();
        assert_eq!(second, UpdateStatus::Skipped);
        assert_eq!(std::fs::read_to_string(&log).unwrap(), "-U\n");
    }

    #[tokio::test]
    async fn zero_interval_never_skips_and_nightly_uses_update_to() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("calls");
        let updater = fake(
            &dir,
            &format!("echo \"$@\" >> '{}'\necho 'yt-dlp is up to date (nightly@2024.10.07)'\n", log.display()),
            Duration::ZERO,
        );
        for _ in 0..2 {
            let status = updater.check_and_update(UpdateChannel::Nightly).await.unwrap();
            assert_eq!(status, UpdateStatus::UpToDate);
        }
        assert_eq!(
            std::fs::read_to_string(&log).unwrap(),
            "--update-to nightly\n--update-to nightly\n"
        );
    }

    #[tokio::test]
    async fn last_check_is_shared_through_the_stamp_file() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("calls");
        let stamp = dir.path().join("state").join("last_update_check");
        let body = format!("echo \"$@\" >> '{}'\necho 'yt-dlp is up to date'\n", log.display());

        let first = fake(&dir, &body, Duration::from_secs(3600)).persist_last_check(&stamp);
        assert_eq!(
            first.check_and_update(UpdateChannel::Stable).await.unwrap(),
            UpdateStatus::UpToDate
        );
        assert!(read_stamp(&stamp).is_some());

        let second = fake(&dir, &body, Duration::from_secs(3600)).persist_last_check(&stamp);
        assert_eq!(
            second.check_and_update(UpdateChannel::Stable).await.unwrap(),
            UpdateStatus::Skipped
        );
        assert_eq!(std::fs::read_to_string(&log).unwrap(), "-U\n");
    }

    #[tokio::test]
    async fn unreadable_stamp_counts_as_never_checked() {
        let dir = TempDir::new().unwrap();
        let stamp = dir.path().join("last_update_check");
        std::fs::write(&stamp, "yesterday-ish").unwrap();
        let updater = fake(&dir, "echo 'yt-dlp is up to date'\n", Duration::from_secs(3600))
            .persist_last_check(&stamp);
        assert_eq!(
            updater.check_and_update(UpdateChannel::Stable).await.unwrap(),
            UpdateStatus::UpToDate
        );
        assert!(read_stamp(&stamp).is_some());
    }

    #[tokio::test]
    async fn failed_update_carries_output() {
        let dir = TempDir::new().unwrap();
        let updater = fake(&dir, "echo 'ERROR: network unreachable' >&2\nexit 1\n", Duration::ZERO);
        let err = updater.check_and_update(UpdateChannel::Stable).await.unwrap_err();
        match err {
            UpdateError::Failed { output, .. } => assert!(output.contains("network unreachable")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn version_is_trimmed() {
        let dir = TempDir::new().unwrap();
        let updater = fake(&dir, "echo '  2024.10.07  '\n", Duration::ZERO);
        assert_eq!(updater.version().await.unwrap(), "2024.10.07");
    }

    #[test]
    fn status_display() {
        assert_eq!(UpdateStatus::Skipped.to_string(), "Skipped (recently checked)");
        assert_eq!(UpdateStatus::UpToDate.to_string(), "Up to date");
        assert_eq!(
            UpdateStatus::Updated("Updated yt-dlp\n".to_string()).to_string(),
            "Updated: Updated yt-dlp"
        );
    }
}
