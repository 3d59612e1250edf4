pub mod config;
pub mod logging;

pub mod control;
pub mod downloader;
pub mod history;
pub mod job;
pub mod locate;
pub mod progress;
pub mod registry;
pub mod runner;
pub mod scheduler;
pub mod updater;

pub use downloader::{Downloader, EngineError, JobFailed, ProgressSnapshot};
pub use job::{DownloadOptions, Job, JobId, JobStatus};
pub use scheduler::CompletionHook;
