//! In-memory position store with the submit and fetch entry points.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use glide_config::StoreConfig;
use glide_history::{HistoricalObject, TrackedValue};
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;

use crate::error::{OrderingViolation, StoreError};
use crate::record::{
    CursorEntry, CursorId, PositionBatch, PositionId, PositionRecord, StoredHistory,
};
use crate::time::TimeSource;

/// Read side of the store, polled by replaying readers.
pub trait PositionSource<T>: Send + Sync {
    /// Fetch a position. `None` means it does not exist.
    fn load_position(
        &self,
        id: PositionId,
    ) -> impl Future<Output = Option<PositionRecord<T>>> + Send;
}

/// Write side of the store, fed by the flush timer.
pub trait BatchSink<T>: Send + Sync {
    /// Apply a batch, creating the position if needed, and return its id.
    fn submit_position_batch(
        &self,
        batch: PositionBatch<T>,
    ) -> impl Future<Output = Result<PositionId, StoreError>> + Send;
}

/// Monotonic id source shared by positions and cursors.
struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// Counters for flushed batches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Batches applied.
    pub batches: u64,
    /// Batches that produced a history buffer.
    pub flushes: u64,
    /// Total bytes of history written.
    pub history_bytes: u64,
}

#[derive(Default)]
struct StatCounters {
    batches: AtomicU64,
    flushes: AtomicU64,
    history_bytes: AtomicU64,
}

/// Positions and zone cursors kept in memory.
///
/// Every call takes the table lock for its whole duration, so a read issued
/// after a submit completes observes that submit.
pub struct MemoryStore<T> {
    positions: RwLock<FxHashMap<PositionId, PositionRecord<T>>>,
    cursors: RwLock<Vec<CursorEntry>>,
    ids: IdGenerator,
    clock: Arc<dyn TimeSource>,
    config: StoreConfig,
    stats: StatCounters,
}

impl<T> MemoryStore<T>
where
    T: TrackedValue + Send + Sync + 'static,
{
    /// Create an empty store reading server time from `clock`.
    pub fn new(clock: Arc<dyn TimeSource>, config: StoreConfig) -> Self {
        Self {
            positions: RwLock::new(FxHashMap::default()),
            cursors: RwLock::new(Vec::new()),
            ids: IdGenerator::new(),
            clock,
            config,
            stats: StatCounters::default(),
        }
    }

    /// Current server time in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Insert a position with no value and no history.
    pub async fn create_empty_position(&self) -> PositionId {
        let id = PositionId(self.ids.next_id());
        let record = PositionRecord::empty(self.clock.now_ms());
        self.positions.write().await.insert(id, record);
        tracing::debug!("Created {id}");
        id
    }

    /// Fetch a position. `None` means it does not exist.
    pub async fn load_position(&self, id: PositionId) -> Option<PositionRecord<T>> {
        self.positions.read().await.get(&id).cloned()
    }

    /// Create a fresh position and register a cursor for it in `zone`.
    ///
    /// Every call registers a new cursor, so a client that joins twice shows
    /// up twice. Callers keep the returned entry instead of joining again.
    pub async fn join_zone(&self, zone: &str) -> CursorEntry {
        let position_id = self.create_empty_position().await;
        let entry = CursorEntry {
            cursor_id: CursorId(self.ids.next_id()),
            zone: zone.to_string(),
            position_id,
        };
        self.cursors.write().await.push(entry.clone());
        tracing::info!("Cursor {:?} joined zone '{zone}' with {position_id}", entry.cursor_id);
        entry
    }

    /// Cursors registered in `zone`, in join order.
    pub async fn list_cursors(&self, zone: &str) -> Vec<CursorEntry> {
        self.cursors
            .read()
            .await
            .iter()
            .filter(|entry| entry.zone == zone)
            .cloned()
            .collect()
    }

    /// Apply a writer batch.
    ///
    /// Batch-relative times are mapped onto `[start, end]` of server time,
    /// where `start` never precedes the end of the previous flush. The
    /// record is replaced with the new snapshot, the new history buffer
    /// (if anything changed) and `server_time = end`.
    pub async fn submit_position_batch(
        &self,
        batch: PositionBatch<T>,
    ) -> Result<PositionId, StoreError> {
        let mut positions = self.positions.write().await;
        let now = self.clock.now_ms();

        let id = match batch.position_id {
            Some(id) if positions.contains_key(&id) => id,
            requested => {
                let id = PositionId(self.ids.next_id());
                if let Some(unknown) = requested {
                    tracing::warn!("Unknown {unknown}, creating {id}");
                }
                id
            }
        };
        let record = positions
            .entry(id)
            .or_insert_with(|| PositionRecord::empty(now));

        let duration = batch.batch_duration_ms;
        let earliest = now.saturating_sub(duration);
        let start = if record.history.is_some() {
            earliest.max(record.server_time)
        } else {
            earliest
        };
        let end = start.saturating_add(duration).min(now).max(start);
        let scaling = if duration == 0 {
            0.0
        } else {
            (end - start) as f64 / duration as f64
        };

        let mut version_number = record.version_number;
        let mut history = HistoricalObject::new(record.current.as_ref());
        for op in &batch.operations {
            if self.config.enforce_version_order && op.version_number < version_number {
                return Err(OrderingViolation::VersionRegressed {
                    previous: version_number,
                    version: op.version_number,
                }
                .into());
            }
            version_number = op.version_number;
            // Ops stamped past the batch duration land at `end`.
            let offset = (scaling * op.batch_time_ms as f64).round() as u64;
            let server_time = start.saturating_add(offset).min(end);
            history.update(server_time, &op.new_value)?;
        }

        let buffer = history.pack();
        self.stats.batches.fetch_add(1, Ordering::Relaxed);
        if let Some(buffer) = &buffer {
            self.stats.flushes.fetch_add(1, Ordering::Relaxed);
            self.stats
                .history_bytes
                .fetch_add(buffer.len() as u64, Ordering::Relaxed);
            tracing::debug!(
                "Flushing {} ops in {:.2}KiB",
                batch.operations.len(),
                buffer.len() as f64 / 1024.0
            );
        }

        *record = PositionRecord {
            version_number,
            current: history.current().or(record.current.take()),
            server_time: end,
            history: buffer.map(|buffer| StoredHistory { start, buffer }),
        };
        Ok(id)
    }

    /// Snapshot of the flush counters.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            batches: self.stats.batches.load(Ordering::Relaxed),
            flushes: self.stats.flushes.load(Ordering::Relaxed),
            history_bytes: self.stats.history_bytes.load(Ordering::Relaxed),
        }
    }
}

impl<T> PositionSource<T> for MemoryStore<T>
where
    T: TrackedValue + Send + Sync + 'static,
{
    async fn load_position(&self, id: PositionId) -> Option<PositionRecord<T>> {
        MemoryStore::load_position(self, id).await
    }
}

impl<T> BatchSink<T> for MemoryStore<T>
where
    T: TrackedValue + Send + Sync + 'static,
{
    async fn submit_position_batch(
        &self,
        batch: PositionBatch<T>,
    ) -> Result<PositionId, StoreError> {
        MemoryStore::submit_position_batch(self, batch).await
    }
}

impl<T, S> PositionSource<T> for Arc<S>
where
    S: PositionSource<T>,
{
    fn load_position(
        &self,
        id: PositionId,
    ) -> impl Future<Output = Option<PositionRecord<T>>> + Send {
        S::load_position(self, id)
    }
}

impl<T, S> BatchSink<T> for Arc<S>
where
    S: BatchSink<T>,
{
    fn submit_position_batch(
        &self,
        batch: PositionBatch<T>,
    ) -> impl Future<Output = Result<PositionId, StoreError>> + Send {
        S::submit_position_batch(self, batch)
    }
}
