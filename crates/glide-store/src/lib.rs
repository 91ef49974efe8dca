//! Position storage for Glide.
//!
//! [`MemoryStore`] implements the submit and fetch entry points writers and
//! readers talk to. Drivers depend on the [`PositionSource`] and
//! [`BatchSink`] traits, so a different backend can be substituted at
//! composition time.

mod error;
pub mod record;
pub mod store;
pub mod time;

pub use error::{OrderingViolation, StoreError};
pub use record::{
    CursorEntry, CursorId, Operation, PositionBatch, PositionId, PositionRecord, StoredHistory,
};
pub use store::{BatchSink, MemoryStore, PositionSource, StoreStats};
pub use time::{ManualClock, SystemClock, TimeSource, TokioClock};
