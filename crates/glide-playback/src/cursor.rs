//! Forward-only lookup of field values in received history blocks.

use std::collections::VecDeque;

use glide_history::{History, SampleRecord, TrackedValue};
use rustc_hash::FxHashMap;

/// Field name to replayed value.
pub type FieldValues = FxHashMap<String, f64>;

#[derive(Debug, Clone)]
struct Block {
    hash: u64,
    history: History,
}

/// Received blocks of one field and how far replay has consumed them.
#[derive(Debug, Clone, Default)]
struct FieldQueue {
    blocks: VecDeque<Block>,
    next_sample: usize,
    running: Option<f64>,
}

impl FieldQueue {
    fn push(&mut self, history: History) {
        let hash = history.content_hash();
        if self.blocks.back().is_some_and(|last| last.hash == hash) {
            return;
        }
        self.blocks.push_back(Block { hash, history });
    }

    fn value_at(&mut self, time: f64) -> Option<f64> {
        let mut value = self
            .running
            .or_else(|| self.blocks.front().map(|b| b.history.initial_value))?;

        while let Some(front) = self.blocks.front() {
            let samples = &front.history.samples;
            while let Some(sample) = samples.get(self.next_sample) {
                if sample.time as f64 > time {
                    self.running = Some(value);
                    return Some(value);
                }
                value = sample.value;
                self.next_sample += 1;
            }
            // Keep the last block so duplicates of it are still recognized.
            if self.blocks.len() == 1 {
                break;
            }
            self.blocks.pop_front();
            self.next_sample = 0;
        }

        self.running = Some(value);
        Some(value)
    }
}

/// Per-field cursor over decoded history blocks.
///
/// Blocks are consumed in arrival order and never revisited, so the cost of
/// a query is proportional to the samples it passes over.
#[derive(Debug, Clone, Default)]
pub struct FieldSampleCursor {
    fields: FxHashMap<String, FieldQueue>,
    last_query: Option<f64>,
}

impl FieldSampleCursor {
    /// Create an empty cursor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the blocks of a decoded buffer. A block identical to the last
    /// one queued for its field is skipped.
    pub fn receive(&mut self, record: SampleRecord) {
        for (name, history) in record {
            self.fields.entry(name).or_default().push(history);
        }
    }

    /// Value of every field with history at `time`.
    ///
    /// A `time` earlier than the previous query is treated as the previous
    /// query time.
    pub fn query(&mut self, time: f64) -> FieldValues {
        let time = self.last_query.map_or(time, |last| last.max(time));
        self.last_query = Some(time);
        self.fields
            .iter_mut()
            .filter_map(|(name, queue)| queue.value_at(time).map(|v| (name.clone(), v)))
            .collect()
    }

    /// [`query`](Self::query) merged over `baseline`; fields without history
    /// keep their baseline value.
    pub fn query_merged<T: TrackedValue>(&mut self, time: f64, baseline: &T) -> T {
        let replayed = self.query(time);
        let mut values = baseline.to_fields();
        for (slot, spec) in values.iter_mut().zip(T::field_config()) {
            if let Some(&v) = replayed.get(&spec.name) {
                *slot = v;
            }
        }
        T::from_fields(&values)
    }

    /// Number of blocks retained for `field`.
    pub fn block_count(&self, field: &str) -> usize {
        self.fields.get(field).map_or(0, |q| q.blocks.len())
    }
}
