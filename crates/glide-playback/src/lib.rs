//! Reader side of Glide: smooth replay of a writer's past motion.
//!
//! [`PlaybackClock`] turns the server-time intervals covered by successive
//! fetches into a replay time that always moves forward and stays inside the
//! configured buffer window. [`FieldSampleCursor`] turns that replay time into
//! field values. [`PositionReplay`] combines both for one position, and
//! [`ReplayDriver`] runs it on a frame timer.

pub mod clock;
pub mod cursor;
pub mod driver;
pub mod replay;

pub use clock::{PlaybackClock, ServerTimeInterval};
pub use cursor::{FieldSampleCursor, FieldValues};
pub use driver::{ReplayDriver, ReplayFrame, ReplayHandle};
pub use replay::PositionReplay;
