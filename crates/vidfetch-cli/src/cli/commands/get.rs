//! `vidfetch get <url>` – download one URL synchronously.

use anyhow::Result;
use std::io::Write;
use std::time::Instant;
use vidfetch_core::config::VidfetchConfig;
use vidfetch_core::{Downloader, JobStatus};

use super::{or_dash, PROGRESS_INTERVAL};
use crate::cli::engine::{history_hook, open_history, runner};
use crate::cli::DownloadArgs;

pub async fn run_get(cfg: &VidfetchConfig, url: &str, download: &DownloadArgs) -> Result<()> {
    let history = open_history(cfg)?;
    let dl = Downloader::start(cfg, runner(cfg), Some(history_hook(history)));
    let options = download.to_options();
    println!("Starting download for: {url}");

    let start = Instant::now();
    let result = {
        let run = dl.run_synchronously(url, options);
        tokio::pin!(run);
        let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
        loop {
            tokio::select! {
                res = &mut run => break res,
                _ = ticker.tick() => print_progress(&dl),
            }
        }
    };
    println!();
    // Flushes the history hook.
    dl.shutdown().await;

    match result {
        Ok(job) => {
            println!("Download completed in {:.1?}", start.elapsed());
            if !job.file_path.is_empty() {
                println!("Saved to: {}", job.file_path);
            }
            Ok(())
        }
        Err(failed) => {
            eprintln!("{}", failed.job.error.trim_end());
            Err(failed.into())
        }
    }
}

fn print_progress(dl: &Downloader) {
    let Some(job) = dl
        .all_jobs()
        .into_iter()
        .rev()
        .find(|j| j.status == JobStatus::Downloading)
    else {
        return;
    };
    print!(
        "\rProgress: {:.1}% | Speed: {} | ETA: {} | Status: {}   ",
        job.progress * 100.0,
        or_dash(&job.speed),
        or_dash(&job.eta),
        job.status
    );
    let _ = std::io::stdout().flush();
}
