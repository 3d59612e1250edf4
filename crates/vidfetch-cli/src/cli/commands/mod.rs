//! CLI command handlers, one file per command.

mod batch;
mod get;
mod history;
mod update;
mod version;

use std::time::Duration;

pub use batch::run_batch;
pub use get::run_get;
pub use history::run_history;
pub use update::run_update;
pub use version::run_version;

/// How often running downloads are reported.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// `-` for fields yt-dlp has not reported yet.
fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}
