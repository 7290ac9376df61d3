//! Record splitting over an arbitrarily-chunked byte stream.
//!
//! Transport fragments carry no meaning: one fragment may hold zero, one, or
//! many complete records, and one record may span any number of fragments.
//! [`RecordSplitter`] re-frames the stream on newline boundaries, carrying
//! at most one incomplete trailing record between pushes.

/// Decode-level failures produced while re-framing the stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SplitError {
    /// The carried partial record outgrew the configured cap. Protects
    /// against a misbehaving upstream that never terminates a record.
    #[error("buffered record exceeded maximum size ({limit} bytes)")]
    RecordTooLong { limit: usize },
    /// A completed record was not valid UTF-8.
    #[error("completed record is not valid UTF-8")]
    InvalidUtf8,
}

/// Accumulates byte fragments and emits complete newline-terminated records.
#[derive(Debug)]
pub struct RecordSplitter {
    carry: Vec<u8>,
    max_record_bytes: usize,
}

impl RecordSplitter {
    #[must_use]
    pub fn new(max_record_bytes: usize) -> Self {
        Self {
            carry: Vec::new(),
            max_record_bytes,
        }
    }

    /// Absorb one fragment and return every record it completed, in order.
    ///
    /// Empty and all-whitespace segments (consecutive newlines, keepalive
    /// blank lines) are discarded without error. UTF-8 is validated per
    /// completed record, so a multi-byte character split across fragments
    /// is fine as long as the record itself is well formed.
    pub fn push(&mut self, fragment: &[u8]) -> Result<Vec<String>, SplitError> {
        self.carry.extend_from_slice(fragment);

        let mut records = Vec::new();
        while let Some(pos) = self.carry.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.carry.drain(..=pos).collect();
            let line = &line[..line.len() - 1];
            let line = line.strip_suffix(b"\r").unwrap_or(line);

            let record = std::str::from_utf8(line).map_err(|_| SplitError::InvalidUtf8)?;
            let record = record.trim();
            if !record.is_empty() {
                records.push(record.to_string());
            }
        }

        if self.carry.len() > self.max_record_bytes {
            return Err(SplitError::RecordTooLong {
                limit: self.max_record_bytes,
            });
        }

        Ok(records)
    }

    /// True when no partial record is being carried.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.carry.is_empty()
    }

    /// Consume the splitter at end-of-stream.
    ///
    /// A leftover partial record means the stream was truncated; it is
    /// returned (lossily decoded, for diagnostics) rather than parsed.
    /// Whitespace-only leftovers are a clean end.
    #[must_use]
    pub fn finish(self) -> Option<String> {
        if self.carry.iter().all(u8::is_ascii_whitespace) {
            return None;
        }
        Some(String::from_utf8_lossy(&self.carry).into_owned())
    }
}
