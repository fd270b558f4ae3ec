//! # spedup Common Library
//!
//! Shared code for the spedup ingestion client:
//! - Event types (IngestEvent enum) and the EventBus
//! - Configuration loading and resolution
//! - Upload session id generation
//! - Human-readable byte, rate and duration formatting

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;
pub mod session_id;

pub use error::{Error, Result};
