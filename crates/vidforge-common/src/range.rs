//! HTTP `Range` header parsing.
//!
//! Only the single-range `bytes` form is understood:
//! - `bytes=0-499`
//! - `bytes=500-` (to end of file)
//! - `bytes=-500` (last 500 bytes)
//!
//! Anything else, including multi-range lists, is rejected with
//! [`Error::InvalidRange`] so the caller can answer 416.

use crate::error::{Error, Result};

/// A satisfiable, inclusive byte interval within an asset.
///
/// Invariant: `start < total_size`, and `start <= end < total_size` when
/// `end` is present. `end == None` means "through the last byte".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: Option<u64>,
    pub total_size: u64,
}

impl ByteRange {
    /// Build a range, checking it against the asset size.
    pub fn new(start: u64, end: Option<u64>, total_size: u64) -> Result<Self> {
        if start >= total_size {
            return Err(Error::invalid_range(
                total_size,
                format!("start {start} is beyond the last byte"),
            ));
        }
        if let Some(end) = end {
            if start > end {
                return Err(Error::invalid_range(
                    total_size,
                    format!("start {start} is greater than end {end}"),
                ));
            }
            if end >= total_size {
                return Err(Error::invalid_range(
                    total_size,
                    format!("end {end} is beyond the last byte"),
                ));
            }
        }
        Ok(Self {
            start,
            end,
            total_size,
        })
    }

    /// Index of the last byte included in the range.
    pub fn last_byte(&self) -> u64 {
        self.end.unwrap_or(self.total_size - 1)
    }

    /// Number of bytes covered by the range. Always at least 1.
    pub fn length(&self) -> u64 {
        self.last_byte() - self.start + 1
    }

    /// Value for the `Content-Range` header of a 206 response.
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.last_byte(), self.total_size)
    }

    /// Value for the `Content-Range` header of a 416 response.
    pub fn unsatisfied(total_size: u64) -> String {
        format!("bytes */{total_size}")
    }
}

/// Parse an optional `Range` header value against an asset of `total_size`
/// bytes.
///
/// Returns `Ok(None)` when no header was sent (serve the full asset). An end
/// position past the last byte is clamped; a start position past it is an
/// error.
pub fn parse_range(header: Option<&str>, total_size: u64) -> Result<Option<ByteRange>> {
    let Some(header) = header else {
        return Ok(None);
    };

    let invalid = |reason: &str| Error::invalid_range(total_size, reason);

    let (unit, spec) = header
        .trim()
        .split_once('=')
        .ok_or_else(|| invalid("missing '=' after range unit"))?;
    if !unit.trim().eq_ignore_ascii_case("bytes") {
        return Err(invalid("only the bytes unit is supported"));
    }
    if spec.contains(',') {
        return Err(invalid("multiple ranges are not supported"));
    }

    let (start, end) = spec
        .split_once('-')
        .ok_or_else(|| invalid("missing '-' in range"))?;
    let start = start.trim();
    let end = end.trim();

    match (start.is_empty(), end.is_empty()) {
        // bytes=-500 (last 500 bytes)
        (true, false) => {
            let suffix_len =
                parse_position(end).ok_or_else(|| invalid("suffix length is not a number"))?;
            if suffix_len == 0 {
                return Err(invalid("suffix length must be positive"));
            }
            if total_size == 0 {
                return Err(invalid("asset is empty"));
            }
            let start = total_size.saturating_sub(suffix_len);
            ByteRange::new(start, Some(total_size - 1), total_size).map(Some)
        }
        // bytes=500- (from 500 to end)
        (false, true) => {
            let start = parse_position(start).ok_or_else(|| invalid("start is not a number"))?;
            ByteRange::new(start, None, total_size).map(Some)
        }
        // bytes=0-499
        (false, false) => {
            let start = parse_position(start).ok_or_else(|| invalid("start is not a number"))?;
            let end = parse_position(end).ok_or_else(|| invalid("end is not a number"))?;
            if start >= total_size {
                return Err(invalid(&format!("start {start} is beyond the last byte")));
            }
            if start > end {
                return Err(invalid(&format!("start {start} is greater than end {end}")));
            }
            let end = end.min(total_size - 1);
            ByteRange::new(start, Some(end), total_size).map(Some)
        }
        // bytes=- (invalid)
        (true, true) => Err(invalid("range has neither start nor end")),
    }
}

/// Parse a byte position, accepting ASCII digits only (no sign, no spaces).
fn parse_position(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
