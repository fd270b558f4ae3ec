//! Output of the record filter

/// Filtered payload plus scan counters for one file
///
/// Invariants: `filtered_len() <= source length` and
/// `lines_retained <= lines_scanned`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterResult {
    /// Retained lines, each followed by its newline terminator
    pub data: Vec<u8>,
    /// Non-empty record lines seen (lines starting with the delimiter)
    pub lines_scanned: u64,
    /// Lines whose tag is in the allow-list
    pub lines_retained: u64,
}

impl FilterResult {
    /// Length of the filtered payload in bytes
    pub fn filtered_len(&self) -> u64 {
        self.data.len() as u64
    }

    /// True when no record survived filtering
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate over retained lines, without terminators
    pub fn lines(&self) -> impl Iterator<Item = &[u8]> {
        self.data
            .split(|&b| b == b'\n')
            .filter(|line| !line.is_empty())
    }
}
