//! Codec error types.

/// Errors produced while decoding a history buffer.
///
/// A decode error is scoped to the single buffer that produced it; callers
/// should fall back to the snapshot value rather than tear down the reader.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The buffer ended before a varint's terminating byte.
    #[error("truncated varint starting at byte {offset}")]
    Truncated {
        /// Offset of the first byte of the unterminated varint.
        offset: usize,
    },

    /// A varint carried more than 64 bits of payload.
    #[error("varint starting at byte {offset} overflows 64 bits")]
    Overflow {
        /// Offset of the first byte of the oversized varint.
        offset: usize,
    },

    /// A field segment claims more bytes than the buffer holds.
    #[error("segment for field `{field}` needs {len} bytes at offset {offset}, buffer has {total}")]
    SegmentOverrun {
        /// Field whose segment overran.
        field: String,
        /// Offset where the segment body starts.
        offset: usize,
        /// Declared segment length.
        len: usize,
        /// Total buffer length.
        total: usize,
    },

    /// Bytes remain after the last field segment.
    #[error("{remaining} trailing bytes after the last field segment")]
    Trailing {
        /// Number of unconsumed bytes.
        remaining: usize,
    },

    /// A sample time failed to advance past its predecessor.
    #[error("field `{field}` sample time {time} does not advance past {previous}")]
    NonMonotonic {
        /// Field containing the bad sample.
        field: String,
        /// Time of the preceding sample.
        previous: u64,
        /// Offending time.
        time: u64,
    },

    /// A time delta moved a sample outside the representable range.
    #[error("field `{field}` sample time out of range")]
    TimeOutOfRange {
        /// Field containing the bad sample.
        field: String,
    },
}

/// Errors produced while recording samples.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// An update arrived with a time earlier than an already recorded sample.
    #[error("sample time {time} regresses behind recorded time {previous}")]
    TimeRegressed {
        /// Latest recorded sample time.
        previous: u64,
        /// Rejected time.
        time: u64,
    },
}
