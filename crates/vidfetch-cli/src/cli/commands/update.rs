//! `vidfetch update` – run yt-dlp's self-update.

use anyhow::Result;
use vidfetch_core::config::VidfetchConfig;
use vidfetch_core::updater::UpdateChannel;

use crate::cli::engine::self_updater;

pub async fn run_update(cfg: &VidfetchConfig, nightly: bool, force: bool) -> Result<()> {
    let channel = if nightly {
        UpdateChannel::Nightly
    } else {
        cfg.update_channel
    };
    let status = self_updater(cfg, force)?.check_and_update(channel).await?;
    println!("{status}");
    Ok(())
}
