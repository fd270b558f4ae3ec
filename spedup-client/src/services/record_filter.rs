//! Streaming record filter
//!
//! Reads a ledger file in fixed-size windows and keeps only the records
//! whose type tag is allow-listed. Lines split across window boundaries are
//! reassembled through a carry-over buffer, so memory use is bounded by one
//! window plus the longest line regardless of file size, and the result does
//! not depend on the window size.
//!
//! A record line looks like `|C100|0|1|...|`: it starts with the field
//! delimiter and its second field is the record tag.

use crate::error::{ClientError, ClientResult};
use crate::models::{FilterResult, SourceFile};
use spedup_common::events::{EventBus, IngestEvent};
use std::collections::HashSet;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

/// Field delimiter of ledger records
pub const FIELD_DELIMITER: u8 = b'|';

/// Counters after each processed window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub bytes_scanned: u64,
    pub lines_scanned: u64,
    pub lines_retained: u64,
}

/// Incremental line reassembly and classification
///
/// Feed windows in order with [`push_window`](Self::push_window); the last
/// window must be flagged `is_final` so an unterminated trailing line is
/// processed.
#[derive(Debug)]
pub struct LineReassembler<'a> {
    allowed: &'a HashSet<Vec<u8>>,
    carry: Vec<u8>,
    result: FilterResult,
    bytes_scanned: u64,
}

impl<'a> LineReassembler<'a> {
    pub fn new(allowed: &'a HashSet<Vec<u8>>) -> Self {
        Self {
            allowed,
            carry: Vec::new(),
            result: FilterResult::default(),
            bytes_scanned: 0,
        }
    }

    /// Process one window of raw bytes
    pub fn push_window(&mut self, window: &[u8], is_final: bool) {
        self.bytes_scanned += window.len() as u64;
        self.carry.extend_from_slice(window);

        if is_final {
            let combined = std::mem::take(&mut self.carry);
            self.process(&combined);
            return;
        }

        // Everything up to and including the last newline is processable,
        // the tail waits for the next window
        if let Some(pos) = self.carry.iter().rposition(|&b| b == b'\n') {
            let tail = self.carry.split_off(pos + 1);
            let processable = std::mem::replace(&mut self.carry, tail);
            self.process(&processable);
        }
    }

    /// Current counters
    pub fn stats(&self) -> ScanStats {
        ScanStats {
            bytes_scanned: self.bytes_scanned,
            lines_scanned: self.result.lines_scanned,
            lines_retained: self.result.lines_retained,
        }
    }

    /// Bytes currently held back waiting for a newline
    pub fn carry_len(&self) -> usize {
        self.carry.len()
    }

    /// Finish and hand over the result
    ///
    /// Any pending carry-over is processed as the final line.
    pub fn finish(mut self) -> FilterResult {
        if !self.carry.is_empty() {
            let combined = std::mem::take(&mut self.carry);
            self.process(&combined);
        }
        self.result
    }

    fn process(&mut self, text: &[u8]) {
        for raw in text.split_inclusive(|&b| b == b'\n') {
            let terminated = raw.last() == Some(&b'\n');
            let mut line = if terminated { &raw[..raw.len() - 1] } else { raw };
            if line.last() == Some(&b'\r') {
                line = &line[..line.len() - 1];
            }

            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            if line[0] != FIELD_DELIMITER {
                continue;
            }

            self.result.lines_scanned += 1;

            if self.allowed.contains(record_tag(line)) {
                self.result.data.extend_from_slice(line);
                if terminated {
                    self.result.data.push(b'\n');
                }
                self.result.lines_retained += 1;
            }
        }
    }
}

/// Tag of a record line: the text between the first and second delimiter
pub fn record_tag(line: &[u8]) -> &[u8] {
    line.get(1..)
        .and_then(|rest| rest.split(|&b| b == FIELD_DELIMITER).next())
        .unwrap_or(&[])
}

/// Allow-list filter over ledger files
#[derive(Debug, Clone)]
pub struct RecordFilter {
    allowed: HashSet<Vec<u8>>,
    window_size: usize,
}

impl RecordFilter {
    /// Create a filter for the given record tags
    ///
    /// `window_size` is clamped to at least one byte.
    pub fn new<I, S>(allowed_records: I, window_size: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: allowed_records
                .into_iter()
                .map(|tag| tag.as_ref().as_bytes().to_vec())
                .collect(),
            window_size: window_size.max(1),
        }
    }

    /// Filter an in-memory buffer, window by window
    pub fn filter_bytes(&self, data: &[u8]) -> FilterResult {
        let mut reassembler = LineReassembler::new(&self.allowed);
        let mut windows = data.chunks(self.window_size).peekable();
        while let Some(window) = windows.next() {
            reassembler.push_window(window, windows.peek().is_none());
        }
        reassembler.finish()
    }

    /// Filter `total_len` bytes from an async reader
    ///
    /// `on_window` is called with the running counters after every window.
    /// Cancellation is checked between windows.
    pub async fn filter_reader<R, F>(
        &self,
        reader: R,
        total_len: u64,
        cancel: &CancellationToken,
        mut on_window: F,
    ) -> ClientResult<FilterResult>
    where
        R: AsyncRead + Unpin,
        F: FnMut(ScanStats),
    {
        let mut reader = reader.take(total_len);
        let mut reassembler = LineReassembler::new(&self.allowed);
        let mut window = vec![0u8; self.window_size];
        let mut offset: u64 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(ClientError::Cancelled);
            }

            let filled = read_window(&mut reader, &mut window).await?;
            offset += filled as u64;
            let is_final = filled < window.len() || offset >= total_len;

            reassembler.push_window(&window[..filled], is_final);
            on_window(reassembler.stats());

            if is_final {
                break;
            }
        }

        Ok(reassembler.finish())
    }

    /// Filter a ledger file, emitting scan progress on the event bus
    pub async fn filter_file(
        &self,
        file: &SourceFile,
        events: &EventBus,
        cancel: &CancellationToken,
    ) -> ClientResult<FilterResult> {
        let handle = tokio::fs::File::open(&file.path).await?;

        tracing::debug!(
            file = %file.name,
            size = file.size,
            window_size = self.window_size,
            "Scanning ledger file"
        );

        let result = self
            .filter_reader(handle, file.size, cancel, |stats| {
                events.emit_lossy(IngestEvent::ScanProgress {
                    file_name: file.name.clone(),
                    bytes_scanned: stats.bytes_scanned,
                    bytes_total: file.size,
                    lines_scanned: stats.lines_scanned,
                    lines_retained: stats.lines_retained,
                });
            })
            .await?;

        tracing::info!(
            file = %file.name,
            lines_scanned = result.lines_scanned,
            lines_retained = result.lines_retained,
            source_bytes = file.size,
            filtered_bytes = result.filtered_len(),
            "Scan completed"
        );

        events.emit_lossy(IngestEvent::ScanCompleted {
            file_name: file.name.clone(),
            lines_scanned: result.lines_scanned,
            lines_retained: result.lines_retained,
            source_bytes: file.size,
            filtered_bytes: result.filtered_len(),
        });

        Ok(result)
    }
}

/// Fill `buf` from `reader`, stopping early only at end of input
async fn read_window<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
