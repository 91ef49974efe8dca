//! Batch accumulation and throttling between flushes.

use std::mem;

use glide_store::{Operation, PositionBatch, PositionId};

#[derive(Debug, Clone)]
struct RawSample<T> {
    dt: u64,
    value: T,
}

#[derive(Debug, Clone)]
struct Batch<T> {
    start: u64,
    samples: Vec<RawSample<T>>,
}

impl<T> Batch<T> {
    fn starting_at(start: u64) -> Self {
        Self {
            start,
            samples: Vec::new(),
        }
    }
}

/// Collects raw samples for one position and turns them into batches.
#[derive(Debug, Clone)]
pub struct BatchCollector<T> {
    position_id: Option<PositionId>,
    min_sample_duration: u64,
    next_version: u64,
    batch: Batch<T>,
    latest: Option<T>,
}

impl<T: Clone> BatchCollector<T> {
    /// Start collecting at `start_ms`.
    ///
    /// Without a `position_id`, flushed batches are discarded until one is
    /// assigned with [`set_position_id`](Self::set_position_id).
    pub fn new(position_id: Option<PositionId>, start_ms: u64, min_sample_duration: u64) -> Self {
        Self {
            position_id,
            min_sample_duration,
            next_version: 1,
            batch: Batch::starting_at(start_ms),
            latest: None,
        }
    }

    /// Position the batches are submitted for.
    pub fn position_id(&self) -> Option<PositionId> {
        self.position_id
    }

    /// Change the target position.
    pub fn set_position_id(&mut self, position_id: PositionId) {
        self.position_id = Some(position_id);
    }

    /// Append a raw sample taken at `now_ms`. Never throttled here.
    pub fn record(&mut self, now_ms: u64, value: T) {
        self.batch.samples.push(RawSample {
            dt: now_ms.saturating_sub(self.batch.start),
            value: value.clone(),
        });
        self.latest = Some(value);
    }

    /// Most recent locally recorded value.
    pub fn current_position(&self) -> Option<&T> {
        self.latest.as_ref()
    }

    /// Raw samples waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.batch.samples.len()
    }

    /// Swap in a fresh batch starting at `now_ms` and return the old one,
    /// thinned so kept samples are at least `min_sample_duration` apart.
    ///
    /// Returns `None` when nothing was recorded or no position is assigned.
    pub fn flush(&mut self, now_ms: u64) -> Option<PositionBatch<T>> {
        let batch = mem::replace(&mut self.batch, Batch::starting_at(now_ms));
        if batch.samples.is_empty() {
            return None;
        }
        let Some(position_id) = self.position_id else {
            tracing::debug!(
                "Discarding {} samples: no position assigned",
                batch.samples.len()
            );
            return None;
        };

        let raw_count = batch.samples.len();
        let mut operations: Vec<Operation<T>> = Vec::with_capacity(raw_count);
        for sample in batch.samples {
            if let Some(last) = operations.last()
                && sample.dt.saturating_sub(last.batch_time_ms) < self.min_sample_duration
            {
                continue;
            }
            operations.push(Operation {
                batch_time_ms: sample.dt,
                version_number: self.next_version,
                new_value: sample.value,
            });
            self.next_version += 1;
        }

        tracing::trace!(
            "Flushed {} of {raw_count} samples for {position_id}",
            operations.len()
        );
        Some(PositionBatch {
            position_id: Some(position_id),
            batch_duration_ms: now_ms.saturating_sub(batch.start),
            operations,
        })
    }
}
