//! `vidfetch batch <url>...` – run several downloads on the worker pool.

use anyhow::{bail, Result};
use std::io::Write;
use vidfetch_core::config::VidfetchConfig;
use vidfetch_core::{Downloader, Job, JobStatus};

use super::{or_dash, PROGRESS_INTERVAL};
use crate::cli::engine::{history_hook, open_history, runner};
use crate::cli::DownloadArgs;

pub async fn run_batch(
    cfg: &VidfetchConfig,
    urls: &[String],
    jobs: Option<usize>,
    download: &DownloadArgs,
) -> Result<()> {
    let mut cfg = cfg.clone();
    if let Some(n) = jobs {
        cfg.max_concurrent = n.max(1);
    }
    let history = open_history(&cfg)?;
    let dl = Downloader::start(&cfg, runner(&cfg), Some(history_hook(history)));
    let options = download.to_options();

    let mut ids = Vec::with_capacity(urls.len());
    for url in urls {
        let id = dl.enqueue(url, options.clone())?;
        println!("Queued {id} {url}");
        ids.push(id);
    }

    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
    let finished: Vec<Job> = loop {
        ticker.tick().await;
        let snapshot: Vec<Job> = ids.iter().filter_map(|id| dl.job(id)).collect();
        let done = snapshot.iter().filter(|j| j.is_terminal()).count();
        let running = snapshot
            .iter()
            .filter(|j| j.status == JobStatus::Downloading)
            .count();
        print!("\r{done}/{} done, {running} running   ", snapshot.len());
        let _ = std::io::stdout().flush();
        if done == snapshot.len() {
            break snapshot;
        }
    };
    println!();
    // Flushes the history hook.
    dl.shutdown().await;

    println!("{:<24} {:<11} {:<7} {}", "ID", "STATUS", "PROG", "TITLE / URL");
    for job in &finished {
        let label = if job.title.is_empty() { &job.url } else { &job.title };
        println!(
            "{:<24} {:<11} {:<7} {}",
            job.id,
            job.status,
            format!("{:.0}%", job.progress * 100.0),
            label
        );
        if job.status == JobStatus::Failed {
            let reason = job.error.lines().last().unwrap_or_default();
            println!("{:<24} {}", "", or_dash(reason));
        }
    }

    let failed = finished
        .iter()
        .filter(|j| j.status == JobStatus::Failed)
        .count();
    if failed > 0 {
        bail!("{failed} of {} downloads failed", finished.len());
    }
    Ok(())
}
