//! Quantized delta time-series codec for continuously moving values.
//!
//! A [`HistoricalObject`] accumulates per-field samples on the writer side and
//! packs them into a compact byte buffer. [`decode`] turns such a buffer back
//! into a [`SampleRecord`] of per-field [`History`] blocks. The buffer layout
//! is defined entirely by the [`FieldConfig`] both sides agree on; there is no
//! embedded schema.

pub mod codec;
pub mod decoder;
pub mod encoder;
mod error;
pub mod field;
pub mod history;
pub mod quantize;

pub use decoder::decode;
pub use encoder::HistoricalObject;
pub use error::{DecodeError, EncodeError};
pub use field::{FieldConfig, FieldSpec, Position, TrackedValue};
pub use history::{History, Sample, SampleRecord};
pub use quantize::{dequantize, quantize};
