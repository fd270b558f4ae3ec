//! Ledger file discovery for the `upload` command
//!
//! Paths named on the command line are taken as given; directories are
//! walked recursively for `.txt` ledgers. The resulting list keeps the
//! command-line order, with each directory's files sorted by path.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Extension of SPED ledger exports
pub const LEDGER_EXTENSION: &str = "txt";

/// Discovery errors
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
}

/// Expand files and directories into an ordered, de-duplicated file list
pub fn discover_ledgers(paths: &[PathBuf]) -> Result<Vec<PathBuf>, DiscoveryError> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for path in paths {
        if !path.exists() {
            return Err(DiscoveryError::PathNotFound(path.clone()));
        }

        let found = if path.is_dir() {
            walk_directory(path)
        } else {
            vec![path.clone()]
        };

        for file in found {
            if seen.insert(file.clone()) {
                files.push(file);
            }
        }
    }

    tracing::debug!("{} ledger files selected", files.len());
    Ok(files)
}

fn walk_directory(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Error accessing entry: {}", e);
                None
            }
        })
        .filter(|e| e.file_type().is_file() && is_ledger(e.path()))
        .map(|e| e.into_path())
        .collect();

    files.sort();
    files
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn is_ledger(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(LEDGER_EXTENSION))
        .unwrap_or(false)
}
