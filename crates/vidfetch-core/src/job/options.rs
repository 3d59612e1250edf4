//! Per-job download options, snapshotted into the job at creation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Output directory used when the caller leaves it empty.
pub const DEFAULT_OUTPUT_DIR: &str = "./downloads";

/// yt-dlp output template used when the caller leaves it empty.
pub const DEFAULT_OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Subtitle language selector meaning "every available track".
pub const ALL_SUBTITLE_LANGS: &str = "all";

/// Options for one download. Immutable once a job has been created from them.
///
/// String options use `None` (or an empty string, which is treated the same)
/// for "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadOptions {
    /// Format selector or preset: `best`, `1080p`, `720p`, `audio`, or a raw yt-dlp selector.
    pub format: Option<String>,
    /// Container for merged video output (`mp4`, `mkv`, `webm`).
    pub video_format: Option<String>,
    pub audio_only: bool,

    pub download_subs: bool,
    pub download_auto_subs: bool,
    pub subtitle_langs: Vec<String>,
    pub embed_subtitles: bool,
    /// Conversion target for subtitle files (`srt`, `vtt`, `ass`).
    pub subtitle_format: Option<String>,
    pub external_sub_files: bool,

    pub output_dir: PathBuf,
    pub output_template: String,

    pub no_playlist: bool,
    /// 1-based first playlist item; 0 means from the start.
    pub playlist_start: u32,
    /// 1-based last playlist item; 0 means to the end.
    pub playlist_end: u32,

    pub use_cookies: bool,
    /// Browser to read cookies from; `chrome` when unset.
    pub browser_name: Option<String>,
    pub proxy_url: Option<String>,
    /// Passed through verbatim, e.g. `2M`.
    pub rate_limit: Option<String>,
    pub user_agent: Option<String>,
    /// TLS impersonation target, e.g. `chrome`.
    pub impersonate: Option<String>,
}

impl DownloadOptions {
    /// Fills every missing field that has a default, using `output_dir` and
    /// `output_template` as the fallbacks for the output location.
    ///
    /// Missing options are defaulted, never rejected.
    pub fn normalized(mut self, output_dir: &Path, output_template: &str) -> Self {
        if self.output_dir.as_os_str().is_empty() {
            tracing::debug!(dir = %output_dir.display(), "defaulting output directory");
            self.output_dir = output_dir.to_path_buf();
        }
        if self.output_template.trim().is_empty() {
            tracing::debug!(template = output_template, "defaulting output template");
            self.output_template = output_template.to_string();
        }
        self.subtitle_langs.retain(|lang| !lang.trim().is_empty());
        if self.subtitle_langs.is_empty() {
            self.subtitle_langs.push(ALL_SUBTITLE_LANGS.to_string());
        }
        self
    }

    /// True if any subtitle track is to be fetched.
    pub fn wants_subtitles(&self) -> bool {
        self.download_subs || self.download_auto_subs || self.external_sub_files
    }

    /// Output path handed to the tool: `output_dir` joined with `output_template`.
    pub fn output_path(&self) -> PathBuf {
        let template = if self.output_template.trim().is_empty() {
            DEFAULT_OUTPUT_TEMPLATE
        } else {
            self.output_template.as_str()
        };
        self.output_dir.join(template)
    }
}

/// Treats `Some("")` (and whitespace) like `None`.
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
