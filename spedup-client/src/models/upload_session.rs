//! Chunked upload session
//!
//! A session splits an already filtered payload into fixed-size chunks at
//! plain byte offsets. Chunks do not follow line boundaries: the server
//! reassembles the opaque bytes in index order before parsing.

use std::ops::Range;

/// Ephemeral upload session for one file run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    /// Correlates every chunk of this upload on the server
    pub upload_id: String,
    /// Bytes per chunk (the last chunk may be shorter)
    pub chunk_size: usize,
    /// Total payload length in bytes
    pub total_bytes: usize,
    /// `ceil(total_bytes / chunk_size)`
    pub total_chunks: usize,
}

impl UploadSession {
    /// Create a session with a freshly generated id
    ///
    /// `chunk_size` must be non-zero (validated by the pipeline config).
    pub fn new(total_bytes: usize, chunk_size: usize) -> Self {
        Self::with_id(spedup_common::session_id::generate(), total_bytes, chunk_size)
    }

    /// Create a session with an explicit id
    pub fn with_id(upload_id: String, total_bytes: usize, chunk_size: usize) -> Self {
        Self {
            upload_id,
            chunk_size,
            total_bytes,
            total_chunks: total_bytes.div_ceil(chunk_size),
        }
    }

    /// Byte range of chunk `index` within the payload
    pub fn chunk_range(&self, index: usize) -> Range<usize> {
        let start = (index * self.chunk_size).min(self.total_bytes);
        let end = (start + self.chunk_size).min(self.total_bytes);
        start..end
    }

    /// Byte ranges of all chunks, in send order
    pub fn chunk_ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.total_chunks).map(move |i| self.chunk_range(i))
    }

    /// True if `index` is the chunk whose response carries the job id
    pub fn is_last_chunk(&self, index: usize) -> bool {
        index + 1 == self.total_chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: usize = 1024 * 1024;

    #[test]
    fn test_four_and_a_half_mib_in_two_mib_chunks() {
        let total = 4 * MIB + MIB / 2;
        let session = UploadSession::with_id("s".to_string(), total, 2 * MIB);

        assert_eq!(session.total_chunks, 3);
        let ranges: Vec<_> = session.chunk_ranges().collect();
        assert_eq!(ranges[0], 0..2 * MIB);
        assert_eq!(ranges[1], 2 * MIB..4 * MIB);
        assert_eq!(ranges[2].len(), MIB / 2);
        assert!(session.is_last_chunk(2));
        assert!(!session.is_last_chunk(1));
    }

    #[test]
    fn test_chunk_count_and_coverage() {
        for (len, size) in [(1, 1), (10, 3), (9, 3), (1, 100), (1000, 7), (2 * MIB, 2 * MIB)] {
            let session = UploadSession::with_id("s".to_string(), len, size);
            assert_eq!(session.total_chunks, (len + size - 1) / size, "len={len} size={size}");

            let ranges: Vec<_> = session.chunk_ranges().collect();
            assert_eq!(ranges.iter().map(|r| r.len()).sum::<usize>(), len);
            assert!(ranges.windows(2).all(|w| w[0].end == w[1].start));
            assert!(ranges.iter().all(|r| !r.is_empty()));
        }
    }

    #[test]
    fn test_empty_payload_has_no_chunks() {
        let session = UploadSession::with_id("s".to_string(), 0, 1024);
        assert_eq!(session.total_chunks, 0);
        assert_eq!(session.chunk_ranges().count(), 0);
    }

    #[test]
    fn test_new_generates_distinct_ids() {
        let a = UploadSession::new(10, 4);
        let b = UploadSession::new(10, 4);
        assert_ne!(a.upload_id, b.upload_id);
    }
}
