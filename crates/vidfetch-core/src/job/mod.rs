//! Job records and the options they are created from.
//!
//! A job is created `pending`, claimed into `downloading` by exactly one
//! driver, and ends in exactly one of `completed` or `failed`.

pub mod options;
pub mod types;

pub use options::*;
pub use types::*;
