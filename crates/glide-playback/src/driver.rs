//! Frame-timer driver polling the store for one position.

use std::sync::Arc;
use std::time::Duration;

use glide_config::Knobs;
use glide_history::TrackedValue;
use glide_store::{PositionId, PositionSource, TimeSource};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::replay::PositionReplay;

/// What a reader renders for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayFrame<T> {
    /// Replayed value, `None` while the position has never been written.
    pub value: Option<T>,
    /// Replay time the value was taken at.
    pub replay_time: Option<f64>,
    /// Buffered server time ahead of the replay head, in ms.
    pub buffer_health: f64,
    /// Client time minus replay time, in ms.
    pub clock_skew: f64,
}

impl<T> Default for ReplayFrame<T> {
    fn default() -> Self {
        Self {
            value: None,
            replay_time: None,
            buffer_health: 0.0,
            clock_skew: 0.0,
        }
    }
}

/// Task state of a running replay.
pub struct ReplayDriver<T, S> {
    source: Arc<S>,
    position_id: PositionId,
    clock: Arc<dyn TimeSource>,
    knobs: Knobs,
    frame_interval: Duration,
    replay: PositionReplay<T>,
    frames_tx: watch::Sender<ReplayFrame<T>>,
    shutdown_rx: watch::Receiver<bool>,
}

/// Control handle returned by [`ReplayDriver::spawn`].
pub struct ReplayHandle<T> {
    position_id: PositionId,
    frames_rx: watch::Receiver<ReplayFrame<T>>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl<T, S> ReplayDriver<T, S>
where
    T: TrackedValue + Send + Sync + 'static,
    S: PositionSource<T> + 'static,
{
    /// Replay `position_id` from `source`, rendering a frame every
    /// `frame_interval`.
    pub fn spawn(
        source: Arc<S>,
        position_id: PositionId,
        clock: Arc<dyn TimeSource>,
        knobs: Knobs,
        frame_interval: Duration,
    ) -> ReplayHandle<T> {
        let (frames_tx, frames_rx) = watch::channel(ReplayFrame::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let driver = Self {
            source,
            position_id,
            clock,
            knobs,
            frame_interval,
            replay: PositionReplay::new(),
            frames_tx,
            shutdown_rx,
        };
        let task = tokio::spawn(driver.run());

        ReplayHandle {
            position_id,
            frames_rx,
            shutdown_tx,
            task,
        }
    }

    async fn run(mut self) {
        let mut ticker = time::interval(self.frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut shutdown_rx = self.shutdown_rx.clone();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.render_frame().await {
                        break;
                    }
                }
                result = shutdown_rx.changed() => {
                    if result.is_err() || *shutdown_rx.borrow() {
                        tracing::debug!("Replay of {} shutting down", self.position_id);
                        break;
                    }
                }
            }
        }
    }

    /// Poll, advance and publish. Returns `false` when replay must stop.
    async fn render_frame(&mut self) -> bool {
        let record = S::load_position(&self.source, self.position_id).await;
        if let Err(e) = self.replay.observe(record.as_ref()) {
            tracing::error!("Stopping replay of {}: {e}", self.position_id);
            return false;
        }

        let value = self.replay.frame(self.clock.now_ms() as f64, &self.knobs);
        let clock = self.replay.clock();
        let frame = ReplayFrame {
            value,
            replay_time: clock.replay_time(),
            buffer_health: clock.buffer_health(),
            clock_skew: clock.clock_skew(),
        };
        tracing::trace!(
            position = %self.position_id,
            replay_time = ?frame.replay_time,
            buffer_health = frame.buffer_health,
            "frame"
        );
        self.frames_tx.send_replace(frame);
        true
    }
}

impl<T: Clone> ReplayHandle<T> {
    /// Position being replayed.
    pub fn position_id(&self) -> PositionId {
        self.position_id
    }

    /// Most recently published frame.
    pub fn latest(&self) -> ReplayFrame<T> {
        self.frames_rx.borrow().clone()
    }

    /// Receiver notified on every published frame.
    pub fn frames(&self) -> watch::Receiver<ReplayFrame<T>> {
        self.frames_rx.clone()
    }

    /// Whether the driver task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop rendering frames.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Stop and wait for the driver task to exit.
    pub async fn stop(self) {
        self.shutdown();
        if let Err(e) = self.task.await {
            tracing::error!("Replay task failed: {e}");
        }
    }
}
