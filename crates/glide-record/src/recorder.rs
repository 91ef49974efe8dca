//! Flush-timer driver around a [`BatchCollector`].

use std::sync::Arc;
use std::time::Duration;

use glide_config::Knobs;
use glide_store::{BatchSink, PositionId, TimeSource};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::collector::BatchCollector;

/// Capacity of the raw sample channel.
const SAMPLE_CHANNEL_CAPACITY: usize = 1024;

/// Task state of a running recorder.
pub struct Recorder<T, S> {
    sink: Arc<S>,
    clock: Arc<dyn TimeSource>,
    collector: BatchCollector<T>,
    flush_period: Duration,
    samples_rx: mpsc::Receiver<(u64, T)>,
    latest_tx: watch::Sender<Option<T>>,
    shutdown_rx: watch::Receiver<bool>,
}

/// Control handle returned by [`Recorder::spawn`].
pub struct RecorderHandle<T> {
    samples_tx: mpsc::Sender<(u64, T)>,
    clock: Arc<dyn TimeSource>,
    latest_rx: watch::Receiver<Option<T>>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl<T, S> Recorder<T, S>
where
    T: Clone + Send + Sync + 'static,
    S: BatchSink<T> + 'static,
{
    /// Start recording for `position_id`, flushing every
    /// `knobs.flush_frequency` milliseconds into `sink`.
    pub fn spawn(
        sink: Arc<S>,
        clock: Arc<dyn TimeSource>,
        position_id: Option<PositionId>,
        knobs: &Knobs,
    ) -> RecorderHandle<T> {
        let (samples_tx, samples_rx) = mpsc::channel(SAMPLE_CHANNEL_CAPACITY);
        let (latest_tx, latest_rx) = watch::channel(None);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let recorder = Self {
            sink,
            collector: BatchCollector::new(
                position_id,
                clock.now_ms(),
                knobs.min_sample_duration,
            ),
            clock: Arc::clone(&clock),
            flush_period: knobs.flush_period(),
            samples_rx,
            latest_tx,
            shutdown_rx,
        };
        let task = tokio::spawn(recorder.run());

        RecorderHandle {
            samples_tx,
            clock,
            latest_rx,
            shutdown_tx,
            task,
        }
    }

    async fn run(self) {
        let Self {
            sink,
            clock,
            mut collector,
            flush_period,
            mut samples_rx,
            latest_tx,
            mut shutdown_rx,
        } = self;
        let (ids_tx, mut ids_rx) = mpsc::unbounded_channel();

        let mut ticker = time::interval_at(Instant::now() + flush_period, flush_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                Some((now_ms, value)) = samples_rx.recv() => {
                    collector.record(now_ms, value);
                    latest_tx.send_replace(collector.current_position().cloned());
                }
                Some(id) = ids_rx.recv() => {
                    if collector.position_id() != Some(id) {
                        tracing::info!("Recording now targets {id}");
                        collector.set_position_id(id);
                    }
                }
                _ = ticker.tick() => {
                    let Some(batch) = collector.flush(clock.now_ms()) else {
                        continue;
                    };
                    let sink = Arc::clone(&sink);
                    let ids_tx = ids_tx.clone();
                    tokio::spawn(async move {
                        match S::submit_position_batch(&sink, batch).await {
                            Ok(id) => {
                                let _ = ids_tx.send(id);
                            }
                            Err(e) => tracing::warn!("Failed to submit batch: {e}"),
                        }
                    });
                }
                result = shutdown_rx.changed() => {
                    if result.is_err() || *shutdown_rx.borrow() {
                        tracing::debug!("Recorder shutting down");
                        break;
                    }
                }
            }
        }
    }
}

impl<T> RecorderHandle<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Record a raw sample stamped with the current time.
    ///
    /// Returns `false` once the recorder has stopped.
    pub async fn record(&self, value: T) -> bool {
        let now_ms = self.clock.now_ms();
        self.samples_tx.send((now_ms, value)).await.is_ok()
    }

    /// Most recent locally recorded value, ahead of anything flushed.
    pub fn current_position(&self) -> Option<T> {
        self.latest_rx.borrow().clone()
    }

    /// Stop the flush timer. Pending samples are dropped.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Stop and wait for the driver task to exit.
    pub async fn stop(self) {
        self.shutdown();
        if let Err(e) = self.task.await {
            tracing::error!("Recorder task failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glide_config::StoreConfig;
    use glide_history::Position;
    use glide_store::{MemoryStore, TokioClock};

    fn setup() -> (Arc<dyn TimeSource>, Arc<MemoryStore<Position>>) {
        let clock: Arc<dyn TimeSource> = Arc::new(TokioClock::starting_at(100_000));
        let store = Arc::new(MemoryStore::new(Arc::clone(&clock), StoreConfig::default()));
        (clock, store)
    }

    #[tokio::test(start_paused = true)]
    async fn test_samples_reach_store_after_flush() {
        let (clock, store) = setup();
        let id = store.create_empty_position().await;
        let handle = Recorder::spawn(Arc::clone(&store), clock, Some(id), &Knobs::default());

        for i in 0..10 {
            assert!(handle.record(Position::new(i as f64, 2.0 * i as f64)).await);
            time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(handle.current_position(), Some(Position::new(9.0, 18.0)));
        assert!(store.load_position(id).await.unwrap().current.is_none());

        time::sleep(Duration::from_millis(1_000)).await;
        let record = store.load_position(id).await.unwrap();
        assert_eq!(record.current, Some(Position::new(9.0, 18.0)));
        assert!(record.history.is_some());

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_recorder_submits_nothing() {
        let (clock, store) = setup();
        let id = store.create_empty_position().await;
        let handle = Recorder::<Position, _>::spawn(
            Arc::clone(&store),
            clock,
            Some(id),
            &Knobs::default(),
        );

        time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(store.stats().batches, 0);
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_flush_after_shutdown() {
        let (clock, store) = setup();
        let id = store.create_empty_position().await;
        let handle = Recorder::spawn(Arc::clone(&store), clock, Some(id), &Knobs::default());

        handle.record(Position::new(1.0, 1.0)).await;
        time::sleep(Duration::from_millis(100)).await;
        handle.shutdown();
        time::sleep(Duration::from_millis(2_000)).await;

        assert_eq!(store.stats().batches, 0);
        assert!(!handle.record(Position::new(2.0, 2.0)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_position_is_replaced_by_created_one() {
        let (clock, store) = setup();
        let handle = Recorder::spawn(
            Arc::clone(&store),
            clock,
            Some(PositionId(777)),
            &Knobs::default(),
        );

        handle.record(Position::new(1.0, 1.0)).await;
        time::sleep(Duration::from_millis(1_100)).await;
        handle.record(Position::new(2.0, 1.0)).await;
        time::sleep(Duration::from_millis(1_000)).await;

        // Both flushes land on the single position created by the first one.
        assert_eq!(store.stats().batches, 2);
        let record = store.load_position(PositionId(1)).await.unwrap();
        assert_eq!(record.current, Some(Position::new(2.0, 1.0)));
        handle.stop().await;
    }
}
