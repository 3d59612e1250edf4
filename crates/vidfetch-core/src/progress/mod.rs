//! Progress parsing for yt-dlp's line-oriented output.
//!
//! The tool has no machine-readable progress protocol we can rely on, so
//! `[download]` lines are matched with patterns; anything else is kept in
//! the [`OutputLog`] only.

mod log;
mod parse;

pub use log::OutputLog;
pub use parse::{parse_destination, parse_progress, parse_size, ProgressDelta};
