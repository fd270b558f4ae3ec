//! Command-line front-end
//!
//! Argument parsing, ledger discovery, the duplicate prompt and the event
//! presenter. The pipeline itself lives in [`crate::services`].

pub mod args;
pub mod commands;
pub mod discovery;
pub mod presenter;
pub mod prompt;

pub use args::{Args, Command, UploadArgs};
pub use commands::CommandOutcome;
