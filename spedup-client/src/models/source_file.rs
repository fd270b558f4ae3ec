//! Handle to a ledger file selected by the operator

use std::path::{Path, PathBuf};

/// Immutable handle to a ledger file on disk
///
/// The contents are never loaded as a whole; stages read it through
/// sequential windows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Location on disk
    pub path: PathBuf,
    /// Display name (file name component)
    pub name: String,
    /// Total size in bytes when the handle was opened
    pub size: u64,
}

impl SourceFile {
    /// Open a handle, reading the size from the file system
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("not a regular file: {}", path.display()),
            ));
        }

        Ok(Self {
            path: path.to_path_buf(),
            name: display_name(path),
            size: metadata.len(),
        })
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_reads_name_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("efd_2024_01.txt");
        std::fs::write(&path, b"|0000|abc|\n").unwrap();

        let file = SourceFile::open(&path).await.unwrap();
        assert_eq!(file.name, "efd_2024_01.txt");
        assert_eq!(file.size, 11);
        assert_eq!(file.path, path);
    }

    #[tokio::test]
    async fn test_open_rejects_directories_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SourceFile::open(dir.path()).await.is_err());
        assert!(SourceFile::open(dir.path().join("missing.txt")).await.is_err());
    }
}
