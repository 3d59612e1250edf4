use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::job::{DEFAULT_OUTPUT_DIR, DEFAULT_OUTPUT_TEMPLATE};
use crate::updater::UpdateChannel;

/// Global configuration loaded from `~/.config/vidfetch/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VidfetchConfig {
    /// Number of pool workers, i.e. downloads running at once.
    pub max_concurrent: usize,
    /// Ids the intake queue holds before pushes are deferred.
    pub queue_capacity: usize,
    /// Used when a job does not name its own output directory.
    pub output_dir: PathBuf,
    /// yt-dlp output template used when a job does not supply one.
    pub output_template: String,
    /// Explicit yt-dlp path; if unset, PATH and the cache dir are searched.
    pub ytdlp_path: Option<PathBuf>,
    /// Arguments placed before the generated ones (e.g. `["-m", "yt_dlp"]`
    /// when `ytdlp_path` is a Python interpreter).
    pub ytdlp_leading_args: Vec<String>,
    pub update_channel: UpdateChannel,
    /// Minimum time between two self-update checks.
    pub update_interval_hours: u64,
    /// History file; defaults to `~/.local/state/vidfetch/history.json`.
    pub history_file: Option<PathBuf>,
}

impl Default for VidfetchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            queue_capacity: 100,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            output_template: DEFAULT_OUTPUT_TEMPLATE.to_string(),
            ytdlp_path: None,
            ytdlp_leading_args: Vec::new(),
            update_channel: UpdateChannel::default(),
            update_interval_hours: 24,
            history_file: None,
        }
    }
}

impl VidfetchConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_hours.saturating_mul(3600))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("vidfetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<VidfetchConfig> {
    load_or_init_at(&config_path()?)
}

/// Same as [`load_or_init`] for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<VidfetchConfig> {
    if !path.exists() {
        let default_cfg = VidfetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("write {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: VidfetchConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
