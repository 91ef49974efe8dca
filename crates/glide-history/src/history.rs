//! Decoded per-field timelines.

use std::hash::Hasher;

use rustc_hash::{FxHashMap, FxHasher};
use serde::{Deserialize, Serialize};

/// One recorded value of a field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Server time in milliseconds.
    pub time: u64,
    /// Grid value at `time`.
    pub value: f64,
}

/// A field's timeline for the span covered by one buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    /// Value in effect before the first sample.
    pub initial_value: f64,
    /// Samples in strictly increasing time order.
    pub samples: Vec<Sample>,
}

impl History {
    /// Value in effect at the end of the block.
    pub fn last_value(&self) -> f64 {
        self.samples
            .last()
            .map_or(self.initial_value, |s| s.value)
    }

    /// Value in effect at `time` within this block alone.
    pub fn value_at(&self, time: u64) -> f64 {
        let idx = self.samples.partition_point(|s| s.time <= time);
        idx.checked_sub(1)
            .map_or(self.initial_value, |i| self.samples[i].value)
    }

    /// Non-cryptographic content hash over the initial value and every
    /// sample. Two blocks with the same hash are treated as the same fetch.
    pub fn content_hash(&self) -> u64 {
        let mut hasher = FxHasher::default();
        hasher.write_u64(self.initial_value.to_bits());
        hasher.write_usize(self.samples.len());
        for sample in &self.samples {
            hasher.write_u64(sample.time);
            hasher.write_u64(sample.value.to_bits());
        }
        hasher.finish()
    }
}

/// Decoded buffer: field name to that field's history.
///
/// Fields that did not change during the buffer's span are absent.
pub type SampleRecord = FxHashMap<String, History>;

#[cfg(test)]
mod tests {
    use super::*;

    fn block(initial: f64, samples: &[(u64, f64)]) -> History {
        History {
            initial_value: initial,
            samples: samples
                .iter()
                .map(|&(time, value)| Sample { time, value })
                .collect(),
        }
    }

    #[test]
    fn test_value_at_steps_through_samples() {
        let h = block(1.0, &[(10, 2.0), (20, 3.0)]);
        assert_eq!(h.value_at(0), 1.0);
        assert_eq!(h.value_at(9), 1.0);
        assert_eq!(h.value_at(10), 2.0);
        assert_eq!(h.value_at(19), 2.0);
        assert_eq!(h.value_at(500), 3.0);
        assert_eq!(h.last_value(), 3.0);
        assert_eq!(block(4.0, &[]).last_value(), 4.0);
    }

    #[test]
    fn test_content_hash_tracks_content_not_identity() {
        let a = block(0.0, &[(1, 1.0), (2, 2.0)]);
        let b = a.clone();
        assert_eq!(a.content_hash(), b.content_hash());

        let shifted = block(0.0, &[(1, 1.0), (3, 2.0)]);
        let revalued = block(0.0, &[(1, 1.0), (2, 2.5)]);
        let reseeded = block(0.5, &[(1, 1.0), (2, 2.0)]);
        for other in [&shifted, &revalued, &reseeded] {
            assert_ne!(a.content_hash(), other.content_hash());
        }
    }
}
