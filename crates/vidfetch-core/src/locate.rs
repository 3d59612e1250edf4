//! Locating the yt-dlp executable.
//!
//! The runner only depends on the [`BinaryLocator`] trait; [`SystemLocator`]
//! checks an explicitly configured path, then `PATH`, then previously
//! cached `yt-dlp-*` binaries under the XDG cache dir.

use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[cfg(windows)]
const BINARY_NAME: &str = "yt-dlp.exe";
#[cfg(not(windows))]
const BINARY_NAME: &str = "yt-dlp";

/// Prefix of cached binaries (e.g. `yt-dlp-2024.08.06`).
const CACHED_PREFIX: &str = "yt-dlp-";

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("configured yt-dlp path {} does not exist", .0.display())]
    Missing(PathBuf),
    #[error("yt-dlp not found (searched: {})", .searched.join(", "))]
    NotFound { searched: Vec<String> },
    #[error("yt-dlp lookup did not finish: {0}")]
    Interrupted(#[from] tokio::task::JoinError),
}

/// Resolves a usable yt-dlp executable path.
pub trait BinaryLocator: Send + Sync {
    fn locate(&self) -> Result<PathBuf, LocateError>;
}

/// Always returns the same path; spawn reports it if the path is unusable.
#[derive(Debug, Clone)]
pub struct FixedLocator(pub PathBuf);

impl BinaryLocator for FixedLocator {
    fn locate(&self) -> Result<PathBuf, LocateError> {
        Ok(self.0.clone())
    }
}

/// Searches configured path, `PATH`, then the cache directory.
#[derive(Debug, Clone)]
pub struct SystemLocator {
    configured: Option<PathBuf>,
    search_path: Option<OsString>,
    cache_dir: Option<PathBuf>,
}

impl SystemLocator {
    pub fn new(configured: Option<PathBuf>) -> Self {
        Self {
            configured,
            search_path: std::env::var_os("PATH"),
            cache_dir: default_cache_dir(),
        }
    }

    /// Override the directories searched in place of `PATH`.
    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    fn from_search_path(&self) -> Option<PathBuf> {
        let paths = self.search_path.as_ref()?;
        std::env::split_paths(paths)
            .map(|dir| dir.join(BINARY_NAME))
            .find(|candidate| candidate.is_file())
    }

    fn from_cache(&self) -> Option<PathBuf> {
        let dir = self.cache_dir.as_ref()?;
        let mut cached: Vec<PathBuf> = fs::read_dir(dir)
            .ok()?
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                name.starts_with(CACHED_PREFIX) && !name.ends_with(".tmp")
            })
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        cached.sort();
        cached.pop()
    }
}

impl BinaryLocator for SystemLocator {
    fn locate(&self) -> Result<PathBuf, LocateError> {
        if let Some(path) = &self.configured {
            if path.is_file() {
                return Ok(path.clone());
            }
            return Err(LocateError::Missing(path.clone()));
        }
        if let Some(path) = self.from_search_path() {
            tracing::debug!(path = %path.display(), "found yt-dlp on PATH");
            return Ok(path);
        }
        if let Some(path) = self.from_cache() {
            tracing::info!(path = %path.display(), "using cached yt-dlp");
            return Ok(path);
        }
        let mut searched = vec!["PATH".to_string()];
        if let Some(dir) = &self.cache_dir {
            searched.push(dir.display().to_string());
        }
        Err(LocateError::NotFound { searched })
    }
}

/// `$XDG_CACHE_HOME/vidfetch`, if the base directories can be resolved.
pub fn default_cache_dir() -> Option<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("vidfetch").ok()?;
    Some(xdg_dirs.get_cache_home().join("vidfetch"))
}
