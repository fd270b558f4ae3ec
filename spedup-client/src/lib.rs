//! spedup-client library interface
//!
//! Client side of the fiscal ledger ingestion pipeline: filters large SPED
//! ledgers down to the records the server needs, uploads them in chunks,
//! waits for the resulting import jobs and triggers consolidation.
//!
//! Exposed as a library so the integration tests can drive the pipeline
//! against a scripted API.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ClientError, ClientResult};
