//! `vidfetch history` – list archived downloads.

use anyhow::Result;
use vidfetch_core::config::VidfetchConfig;

use super::or_dash;
use crate::cli::engine::open_history;

pub fn run_history(cfg: &VidfetchConfig, limit: Option<usize>) -> Result<()> {
    let history = open_history(cfg)?;
    let jobs = history.get();
    if jobs.is_empty() {
        println!("No downloads in history.");
        return Ok(());
    }
    println!("{:<20} {:<10} {:<16} {}", "FINISHED", "STATUS", "PLATFORM", "TITLE / URL");
    for job in jobs.iter().take(limit.unwrap_or(usize::MAX)) {
        let finished = job
            .completed_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        let label = if job.title.is_empty() { &job.url } else { &job.title };
        println!(
            "{:<20} {:<10} {:<16} {}",
            finished,
            job.status,
            or_dash(&job.platform),
            label
        );
    }
    Ok(())
}
