//! Test Helper Utilities
//!
//! Shared utilities for the spedup-client integration tests

#![allow(dead_code)]

pub mod fake_api;
pub mod fixtures;

// Re-export commonly used items
pub use fake_api::{Call, FakeIngestApi, ListFailure};
pub use fixtures::{
    ledger_content, small_pipeline, write_irrelevant, write_ledger, InstantSleeper,
};
