//! `vidfetch version` – print the yt-dlp version.

use anyhow::Result;
use vidfetch_core::config::VidfetchConfig;

use crate::cli::engine::updater;

pub async fn run_version(cfg: &VidfetchConfig) -> Result<()> {
    let version = updater(cfg)?.version().await?;
    println!("yt-dlp {version}");
    Ok(())
}
