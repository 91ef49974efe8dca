//! Persisted documents and the batch submitted by writers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a stored position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionId(pub u64);

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "position#{}", self.0)
    }
}

/// Identifier of a cursor entry in a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CursorId(pub u64);

/// Packed history covering `[start, server_time)` of its record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredHistory {
    /// Server time (ms) of the start of the covered span.
    pub start: u64,
    /// Buffer produced by `HistoricalObject::pack`.
    pub buffer: Vec<u8>,
}

/// Latest snapshot and history of one tracked entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord<T> {
    /// Version number of the last applied operation.
    pub version_number: u64,
    /// Latest quantized value; `None` until the first write.
    pub current: Option<T>,
    /// Server time (ms) up to which `history` is complete.
    pub server_time: u64,
    /// Motion recorded by the last flush, if anything changed.
    pub history: Option<StoredHistory>,
}

impl<T> PositionRecord<T> {
    /// A record that has never been written.
    pub fn empty(server_time: u64) -> Self {
        Self {
            version_number: 0,
            current: None,
            server_time,
            history: None,
        }
    }
}

/// One writer-side sample, timed relative to its batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation<T> {
    /// Milliseconds since the batch started.
    pub batch_time_ms: u64,
    /// Writer-assigned version number.
    pub version_number: u64,
    /// Sampled value.
    pub new_value: T,
}

/// Payload of the submit entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionBatch<T> {
    /// Target position; a new one is created when absent or unknown.
    pub position_id: Option<PositionId>,
    /// Wall-clock duration the batch covered on the writer.
    pub batch_duration_ms: u64,
    /// Throttled samples in batch-time order.
    pub operations: Vec<Operation<T>>,
}

/// A cursor visible in a zone. Owner identity is never exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorEntry {
    /// Cursor identifier.
    pub cursor_id: CursorId,
    /// Zone the cursor belongs to.
    pub zone: String,
    /// Position replayed for this cursor.
    pub position_id: PositionId,
}
