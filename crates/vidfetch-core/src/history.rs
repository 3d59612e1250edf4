//! Download history persisted as JSON (`~/.local/state/vidfetch/history.json`).
//!
//! Most recent first; the whole file is rewritten on every add.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::job::Job;

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    #[serde(default)]
    downloads: Vec<Job>,
    #[serde(default)]
    last_sync: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct History {
    path: PathBuf,
    state: Mutex<HistoryFile>,
}

impl History {
    /// Default path for the history file.
    pub fn default_path() -> Result<PathBuf> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("vidfetch")?;
        Ok(xdg_dirs.get_state_home().join("vidfetch").join("history.json"))
    }

    /// Loads the history at `path`; a missing file is an empty history.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("parse history: {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HistoryFile::default(),
            Err(e) => return Err(e).with_context(|| format!("read history: {}", path.display())),
        };
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Prepends `job` and rewrites the file.
    pub fn add(&self, job: Job) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.downloads.insert(0, job);
        state.last_sync = Some(Utc::now());
        save(&self.path, &state)
    }

    /// Copy of every archived job, most recent first.
    pub fn get(&self) -> Vec<Job> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .downloads
            .clone()
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).last_sync
    }
}

/// Writes to a sibling temp file and renames it over `path`.
fn save(path: &Path, state: &HistoryFile) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create dir: {}", parent.display()))?;
    }
    let json = serde_json::to_vec_pretty(state).context("serialize history")?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).with_context(|| format!("write history: {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("replace history: {}", path.display()))?;
    Ok(())
}
