//! CLI for the vidfetch download engine.

mod commands;
mod engine;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use vidfetch_core::config;
use vidfetch_core::DownloadOptions;

use commands::{run_batch, run_get, run_history, run_update, run_version};

/// Top-level CLI for vidfetch.
#[derive(Debug, Parser)]
#[command(name = "vidfetch")]
#[command(about = "vidfetch: concurrent media downloads driven by yt-dlp", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download one URL and wait for it, printing progress.
    Get {
        /// Page or media URL understood by yt-dlp.
        url: String,
        #[command(flatten)]
        download: DownloadArgs,
    },

    /// Download several URLs concurrently on the worker pool.
    Batch {
        /// URLs to download.
        #[arg(required = true)]
        urls: Vec<String>,
        /// Run up to N downloads at once (default: max_concurrent from config).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
        #[command(flatten)]
        download: DownloadArgs,
    },

    /// Show archived downloads, most recent first.
    History {
        /// Show at most N entries.
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
    },

    /// Print the yt-dlp version.
    Version,

    /// Update yt-dlp in place. Skipped if the last check is more recent
    /// than `update_interval_hours`.
    Update {
        /// Track the nightly channel instead of the configured one.
        #[arg(long)]
        nightly: bool,
        /// Check now even if the last check was recent.
        #[arg(long)]
        force: bool,
    },
}

/// Per-download options shared by `get` and `batch`.
#[derive(Debug, Clone, Args)]
pub struct DownloadArgs {
    /// Output directory (default: output_dir from config).
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,
    /// Format preset (best, 1080p, 720p, audio) or a raw yt-dlp selector.
    #[arg(long, default_value = "best")]
    pub format: String,
    /// Extract audio only.
    #[arg(long)]
    pub audio_only: bool,
    /// Do not download subtitles.
    #[arg(long)]
    pub no_subs: bool,
    /// Keep subtitles as separate files instead of embedding them.
    #[arg(long)]
    pub no_embed: bool,
    /// Subtitle languages, comma separated.
    #[arg(long, value_delimiter = ',', default_value = "all")]
    pub sub_langs: Vec<String>,
    /// Read cookies from this browser's profile (chrome, firefox, ...).
    #[arg(long, value_name = "BROWSER")]
    pub cookies_from: Option<String>,
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,
    /// Bandwidth cap passed to yt-dlp, e.g. 2M.
    #[arg(long, value_name = "RATE")]
    pub limit_rate: Option<String>,
    /// Download only the video when the URL points into a playlist.
    #[arg(long)]
    pub no_playlist: bool,
}

impl DownloadArgs {
    pub fn to_options(&self) -> DownloadOptions {
        let subs = !self.no_subs;
        DownloadOptions {
            format: Some(self.format.clone()),
            audio_only: self.audio_only,
            download_subs: subs,
            download_auto_subs: subs,
            embed_subtitles: subs && !self.no_embed,
            external_sub_files: subs && self.no_embed,
            subtitle_langs: self.sub_langs.clone(),
            subtitle_format: Some("srt".to_string()),
            output_dir: self.out.clone().unwrap_or_default(),
            no_playlist: self.no_playlist,
            use_cookies: self.cookies_from.is_some(),
            browser_name: self.cookies_from.clone(),
            proxy_url: self.proxy.clone(),
            rate_limit: self.limit_rate.clone(),
            ..Default::default()
        }
    }
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Get { url, download } => run_get(&cfg, &url, &download).await?,
            CliCommand::Batch {
                urls,
                jobs,
                download,
            } => run_batch(&cfg, &urls, jobs, &download).await?,
            CliCommand::History { limit } => run_history(&cfg, limit)?,
            CliCommand::Version => run_version(&cfg).await?,
            CliCommand::Update { nightly, force } => run_update(&cfg, nightly, force).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
