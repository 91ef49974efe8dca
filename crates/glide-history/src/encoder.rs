//! Writer-side accumulation of quantized samples.
//!
//! Buffer layout, per field in [`FieldConfig`](crate::FieldConfig) order:
//!
//! ```text
//! varint segment_len            0 when the field recorded nothing
//! segment:
//!   signed initial_value        quantized
//!   (signed dt, signed dv)*     until the segment ends
//! ```
//!
//! The first `dt` is relative to time zero; each `dv` is relative to the
//! previous value, starting from `initial_value`.

use std::marker::PhantomData;

use crate::codec::{write_signed, write_varint};
use crate::error::EncodeError;
use crate::field::TrackedValue;
use crate::quantize::{dequantize, quantize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QuantizedSample {
    time: u64,
    value: i64,
}

/// Per-field running value and the samples recorded since the last pack.
#[derive(Debug, Clone, Default)]
struct FieldTrack {
    precision_bits: u8,
    running: Option<i64>,
    initial: Option<i64>,
    samples: Vec<QuantizedSample>,
}

impl FieldTrack {
    /// Returns whether a sample was written.
    fn record(&mut self, time: u64, value: i64) -> bool {
        if self.running == Some(value) {
            return false;
        }
        if self.initial.is_none() {
            self.initial = Some(self.running.unwrap_or(value));
        }
        match self.samples.last_mut() {
            Some(last) if last.time == time => last.value = value,
            _ => self.samples.push(QuantizedSample { time, value }),
        }
        self.running = Some(value);
        true
    }

    fn encode_segment(&self, out: &mut Vec<u8>) {
        let Some(initial) = self.initial.filter(|_| !self.samples.is_empty()) else {
            return;
        };
        write_signed(out, initial);
        let mut prev_time = 0u64;
        let mut prev_value = initial;
        for sample in &self.samples {
            write_signed(out, sample.time.wrapping_sub(prev_time) as i64);
            write_signed(out, sample.value.wrapping_sub(prev_value));
            prev_time = sample.time;
            prev_value = sample.value;
        }
    }

    /// Forget recorded samples. The running value carries over.
    fn reset(&mut self) {
        self.initial = None;
        self.samples.clear();
    }
}

/// Accumulates quantized samples of one tracked entity between flushes.
///
/// Each field deduplicates against its own running value, so an idle or
/// slow-moving value records almost nothing.
#[derive(Debug, Clone)]
pub struct HistoricalObject<T: TrackedValue> {
    tracks: Vec<FieldTrack>,
    last_time: Option<u64>,
    _value: PhantomData<T>,
}

impl<T: TrackedValue> HistoricalObject<T> {
    /// Start tracking from `current`, or from nothing for an entity that has
    /// never been written (its first update is always recorded).
    pub fn new(current: Option<&T>) -> Self {
        let config = T::field_config();
        let seed = current.map(TrackedValue::to_fields);
        let tracks = config
            .iter()
            .enumerate()
            .map(|(i, spec)| FieldTrack {
                precision_bits: spec.precision_bits,
                running: seed
                    .as_ref()
                    .and_then(|values| values.get(i))
                    .map(|&v| quantize(v, spec.precision_bits)),
                initial: None,
                samples: Vec::new(),
            })
            .collect();
        Self {
            tracks,
            last_time: None,
            _value: PhantomData,
        }
    }

    /// Record `value` at `time`. Fields whose quantized value is unchanged
    /// are left alone.
    ///
    /// # Errors
    ///
    /// [`EncodeError::TimeRegressed`] if `time` is earlier than a sample
    /// already recorded; nothing is modified in that case.
    pub fn update(&mut self, time: u64, value: &T) -> Result<(), EncodeError> {
        if let Some(previous) = self.last_time
            && time < previous
        {
            return Err(EncodeError::TimeRegressed { previous, time });
        }
        let mut recorded = false;
        for (track, raw) in self.tracks.iter_mut().zip(value.to_fields()) {
            recorded |= track.record(time, quantize(raw, track.precision_bits));
        }
        if recorded {
            self.last_time = Some(time);
        }
        Ok(())
    }

    /// Total samples recorded across all fields.
    pub fn sample_count(&self) -> usize {
        self.tracks.iter().map(|t| t.samples.len()).sum()
    }

    /// Serialize the samples recorded since the last pack and start a new
    /// history from the current values. `None` when nothing changed, so
    /// callers never persist an empty history.
    pub fn pack(&mut self) -> Option<Vec<u8>> {
        if self.sample_count() == 0 {
            return None;
        }
        let mut out = Vec::new();
        let mut segment = Vec::new();
        let samples = self.sample_count();
        for track in &mut self.tracks {
            segment.clear();
            track.encode_segment(&mut segment);
            track.reset();
            write_varint(&mut out, segment.len() as u64);
            out.extend_from_slice(&segment);
        }
        tracing::trace!(
            samples,
            bytes = out.len(),
            "packed history"
        );
        Some(out)
    }

    /// Latest quantized value of every field, or `None` while any field has
    /// never been set.
    pub fn current(&self) -> Option<T> {
        let values = self
            .tracks
            .iter()
            .map(|t| t.running.map(|q| dequantize(q, t.precision_bits)))
            .collect::<Option<Vec<f64>>>()?;
        Some(T::from_fields(&values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode;
    use crate::field::Position;

    #[test]
    fn test_repeated_value_records_once() {
        let mut obj = HistoricalObject::<Position>::new(None);
        obj.update(0, &Position::new(3.0, 4.0)).unwrap();
        obj.update(10, &Position::new(3.0, 4.0)).unwrap();
        assert_eq!(obj.sample_count(), 2, "one sample per field");

        obj.update(20, &Position::new(3.001, 4.0)).unwrap();
        assert_eq!(obj.sample_count(), 2, "sub-grid jitter quantizes away");
    }

    #[test]
    fn test_pack_is_none_after_only_duplicates_of_seed() {
        let seed = Position::new(5.0, 5.0);
        let mut obj = HistoricalObject::new(Some(&seed));
        assert!(obj.pack().is_none());
        obj.update(1, &seed).unwrap();
        obj.update(2, &seed).unwrap();
        assert_eq!(obj.sample_count(), 0);
        assert!(obj.pack().is_none());
        assert_eq!(obj.current(), Some(seed));
    }

    #[test]
    fn test_only_changed_fields_record() {
        let mut obj = HistoricalObject::new(Some(&Position::new(0.0, 0.0)));
        obj.update(5, &Position::new(1.0, 0.0)).unwrap();
        let record = decode(Position::field_config(), &obj.pack().unwrap()).unwrap();
        assert_eq!(record["x"].samples.len(), 1);
        assert_eq!(record["x"].initial_value, 0.0);
        assert!(!record.contains_key("y"));
    }

    #[test]
    fn test_time_regression_is_rejected_without_side_effects() {
        let mut obj = HistoricalObject::<Position>::new(None);
        obj.update(100, &Position::new(1.0, 1.0)).unwrap();
        let err = obj.update(50, &Position::new(2.0, 2.0)).unwrap_err();
        assert_eq!(
            err,
            EncodeError::TimeRegressed {
                previous: 100,
                time: 50
            }
        );
        assert_eq!(obj.sample_count(), 2);
        assert_eq!(obj.current(), Some(Position::new(1.0, 1.0)));
    }

    #[test]
    fn test_same_time_update_overwrites_last_sample() {
        let mut obj = HistoricalObject::new(Some(&Position::new(0.0, 0.0)));
        obj.update(7, &Position::new(1.0, 0.0)).unwrap();
        obj.update(7, &Position::new(2.0, 0.0)).unwrap();
        let record = decode(Position::field_config(), &obj.pack().unwrap()).unwrap();
        let x = &record["x"];
        assert_eq!(x.samples.len(), 1);
        assert_eq!(x.samples[0].time, 7);
        assert_eq!(x.samples[0].value, 2.0);
    }

    #[test]
    fn test_current_is_quantized() {
        let mut obj = HistoricalObject::<Position>::new(None);
        assert!(obj.current().is_none());
        obj.update(0, &Position::new(0.123_456, 99.999_999)).unwrap();
        let current = obj.current().unwrap();
        assert_eq!(current.x, 32.0 / 256.0);
        assert_eq!(current.y, 100.0);
    }

    #[test]
    fn test_idle_value_packs_small() {
        let mut obj = HistoricalObject::new(Some(&Position::new(0.0, 0.0)));
        for t in 0..1000u64 {
            // Moves once every 100 ms, otherwise idle.
            let x = (t / 100) as f64;
            obj.update(1_700_000_000_000 + t * 4, &Position::new(x, 0.0)).unwrap();
        }
        assert_eq!(obj.sample_count(), 9);
        let buf = obj.pack().unwrap();
        assert!(buf.len() < 64, "9 samples should pack tightly, got {}", buf.len());
    }

    #[test]
    fn test_second_pack_without_updates_is_none() {
        let mut obj = HistoricalObject::new(Some(&Position::new(0.0, 0.0)));
        obj.update(10, &Position::new(1.0, 0.0)).unwrap();
        assert!(obj.pack().is_some());
        assert_eq!(obj.sample_count(), 0);
        assert!(obj.pack().is_none());
        assert_eq!(obj.current(), Some(Position::new(1.0, 0.0)));
    }

    #[test]
    fn test_history_after_pack_starts_from_running_value() {
        let mut obj = HistoricalObject::new(Some(&Position::new(0.0, 0.0)));
        obj.update(10, &Position::new(1.0, 0.0)).unwrap();
        obj.pack().unwrap();

        obj.update(20, &Position::new(1.0, 0.0)).unwrap();
        assert_eq!(obj.sample_count(), 0, "unchanged value after pack is deduplicated");
        obj.update(30, &Position::new(2.0, 0.0)).unwrap();
        let record = decode(Position::field_config(), &obj.pack().unwrap()).unwrap();
        let x = &record["x"];
        assert_eq!(x.initial_value, 1.0);
        assert_eq!(x.samples.len(), 1);
        assert_eq!(x.samples[0].time, 30);
        assert_eq!(x.samples[0].value, 2.0);
        assert!(!record.contains_key("y"));
    }
}
