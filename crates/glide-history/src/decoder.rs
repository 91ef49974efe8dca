//! Reader-side parsing of history buffers.

use crate::codec::{read_signed, read_varint};
use crate::error::DecodeError;
use crate::field::{FieldConfig, FieldSpec};
use crate::history::{History, Sample, SampleRecord};
use crate::quantize::dequantize;

/// Decode a buffer produced by [`HistoricalObject::pack`](crate::HistoricalObject::pack).
///
/// The buffer must consist of exactly one segment per field of `fields`;
/// anything shorter or longer is rejected.
///
/// # Errors
///
/// Any [`DecodeError`] describing where the buffer stopped making sense.
pub fn decode(fields: &FieldConfig, buf: &[u8]) -> Result<SampleRecord, DecodeError> {
    let mut record = SampleRecord::default();
    let mut pos = 0usize;

    for spec in fields {
        let len = read_varint(buf, &mut pos)?;
        let end = usize::try_from(len)
            .ok()
            .and_then(|len| pos.checked_add(len))
            .filter(|&end| end <= buf.len())
            .ok_or_else(|| DecodeError::SegmentOverrun {
                field: spec.name.clone(),
                offset: pos,
                len: usize::try_from(len).unwrap_or(usize::MAX),
                total: buf.len(),
            })?;
        if end == pos {
            continue;
        }
        let history = decode_segment(spec, &buf[..end], pos)?;
        record.insert(spec.name.clone(), history);
        pos = end;
    }

    if pos != buf.len() {
        return Err(DecodeError::Trailing {
            remaining: buf.len() - pos,
        });
    }
    Ok(record)
}

/// Decode one field segment occupying `buf[start..]`.
fn decode_segment(spec: &FieldSpec, buf: &[u8], start: usize) -> Result<History, DecodeError> {
    let bits = spec.precision_bits;
    let mut pos = start;
    let initial = read_signed(buf, &mut pos)?;

    let mut samples = Vec::new();
    let mut prev_time: Option<u64> = None;
    let mut value = initial;
    while pos < buf.len() {
        let dt = read_signed(buf, &mut pos)?;
        let dv = read_signed(buf, &mut pos)?;

        let time = prev_time
            .unwrap_or(0)
            .checked_add_signed(dt)
            .ok_or_else(|| DecodeError::TimeOutOfRange {
                field: spec.name.clone(),
            })?;
        if let Some(previous) = prev_time
            && time <= previous
        {
            return Err(DecodeError::NonMonotonic {
                field: spec.name.clone(),
                previous,
                time,
            });
        }
        value = value.wrapping_add(dv);
        samples.push(Sample {
            time,
            value: dequantize(value, bits),
        });
        prev_time = Some(time);
    }

    Ok(History {
        initial_value: dequantize(initial, bits),
        samples,
    })
}
