//! Writer side of Glide: raw samples in, throttled batches out.
//!
//! [`BatchCollector`] accumulates raw samples between flushes and thins them
//! to the minimum sample spacing. [`Recorder`] drives a collector from a
//! sample channel and a flush timer, handing each batch to a
//! [`BatchSink`](glide_store::BatchSink).

pub mod collector;
pub mod recorder;

pub use collector::BatchCollector;
pub use recorder::{Recorder, RecorderHandle};
