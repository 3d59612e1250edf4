//! Wiring shared by the commands: runner, history store and its hook.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use vidfetch_core::config::VidfetchConfig;
use vidfetch_core::history::History;
use vidfetch_core::locate::{BinaryLocator, SystemLocator};
use vidfetch_core::runner::ProcessRunner;
use vidfetch_core::updater::Updater;
use vidfetch_core::{CompletionHook, Job};

fn locator(cfg: &VidfetchConfig) -> SystemLocator {
    SystemLocator::new(cfg.ytdlp_path.clone())
}

/// Runner that resolves yt-dlp lazily on the first job.
pub fn runner(cfg: &VidfetchConfig) -> ProcessRunner {
    ProcessRunner::new(Arc::new(locator(cfg))).leading_args(cfg.ytdlp_leading_args.clone())
}

/// Updater for the located binary; fails if yt-dlp cannot be found.
pub fn updater(cfg: &VidfetchConfig) -> Result<Updater> {
    let binary = locator(cfg).locate()?;
    Ok(Updater::new(binary, cfg.update_interval()).leading_args(cfg.ytdlp_leading_args.clone()))
}

/// Updater whose debounce persists across runs; `force` ignores the interval.
pub fn self_updater(cfg: &VidfetchConfig, force: bool) -> Result<Updater> {
    let binary = locator(cfg).locate()?;
    let interval = if force {
        Duration::ZERO
    } else {
        cfg.update_interval()
    };
    Ok(Updater::new(binary, interval)
        .leading_args(cfg.ytdlp_leading_args.clone())
        .persist_last_check(Updater::default_stamp_path()?))
}

pub fn open_history(cfg: &VidfetchConfig) -> Result<Arc<History>> {
    let path: PathBuf = match &cfg.history_file {
        Some(path) => path.clone(),
        None => History::default_path()?,
    };
    let history = History::open(&path).with_context(|| format!("open history {}", path.display()))?;
    Ok(Arc::new(history))
}

/// Appends every finished job to `history`; write errors are logged, not fatal.
pub fn history_hook(history: Arc<History>) -> CompletionHook {
    CompletionHook::new(move |job: Job| {
        let id = job.id.clone();
        if let Err(e) = history.add(job) {
            tracing::warn!(job_id = %id, "failed to save history: {:#}", e);
        }
    })
}
