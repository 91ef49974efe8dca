//! Replay of one stored position.

use glide_config::Knobs;
use glide_history::{TrackedValue, decode};
use glide_store::{OrderingViolation, PositionRecord};

use crate::clock::{PlaybackClock, ServerTimeInterval};
use crate::cursor::FieldSampleCursor;

/// Clock and cursor for one subscribed position.
#[derive(Debug, Clone)]
pub struct PositionReplay<T> {
    clock: PlaybackClock,
    cursor: FieldSampleCursor,
    snapshot: Option<T>,
    last_server_time: Option<u64>,
    snapshot_only: bool,
}

impl<T: TrackedValue> Default for PositionReplay<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TrackedValue> PositionReplay<T> {
    /// Create a replay with nothing observed.
    pub fn new() -> Self {
        Self {
            clock: PlaybackClock::new(),
            cursor: FieldSampleCursor::new(),
            snapshot: None,
            last_server_time: None,
            snapshot_only: false,
        }
    }

    /// Feed the latest fetch result.
    ///
    /// `None` (position missing) clears the snapshot so nothing renders. A
    /// record whose `server_time` was already observed changes nothing. A
    /// history buffer that fails to decode is logged and the replay shows
    /// the snapshot until the next good fetch.
    ///
    /// # Errors
    ///
    /// [`OrderingViolation`] when the record's span ends before one already
    /// observed.
    pub fn observe(&mut self, record: Option<&PositionRecord<T>>) -> Result<(), OrderingViolation> {
        let Some(record) = record else {
            self.snapshot = None;
            return Ok(());
        };
        self.snapshot.clone_from(&record.current);
        if self.last_server_time == Some(record.server_time) {
            return Ok(());
        }

        if let (Some(interval), Some(history)) =
            (ServerTimeInterval::from_record(record), &record.history)
        {
            match decode(T::field_config(), &history.buffer) {
                Ok(samples) => {
                    self.clock.receive(interval)?;
                    self.cursor.receive(samples);
                    self.snapshot_only = false;
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to decode history ending at {}: {e}; showing snapshot",
                        record.server_time
                    );
                    self.snapshot_only = true;
                }
            }
        }
        self.last_server_time = Some(record.server_time);
        Ok(())
    }

    /// Value to render at client time `client_now`, or `None` when nothing
    /// has been written yet.
    pub fn frame(&mut self, client_now: f64, knobs: &Knobs) -> Option<T> {
        let snapshot = self.snapshot.as_ref()?;
        if self.snapshot_only {
            return Some(snapshot.clone());
        }
        match self.clock.advance(client_now, knobs) {
            Some(replay_time) => Some(self.cursor.query_merged(replay_time, snapshot)),
            None => Some(snapshot.clone()),
        }
    }

    /// The replay clock, for diagnostics.
    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    /// Latest fetched snapshot.
    pub fn snapshot(&self) -> Option<&T> {
        self.snapshot.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glide_history::{HistoricalObject, Position};
    use glide_store::StoredHistory;

    fn record_from(
        seed: Option<Position>,
        samples: &[(u64, f64, f64)],
        start: u64,
        server_time: u64,
    ) -> PositionRecord<Position> {
        let mut history = HistoricalObject::new(seed.as_ref());
        for &(time, x, y) in samples {
            history.update(time, &Position::new(x, y)).unwrap();
        }
        PositionRecord {
            version_number: samples.len() as u64,
            current: history.current().or(seed),
            server_time,
            history: history.pack().map(|buffer| StoredHistory { start, buffer }),
        }
    }

    fn relaxed_knobs() -> Knobs {
        Knobs {
            min_server_buffer_age_soft: 0.0,
            max_server_buffer_age_soft: 10_000.0,
            max_server_buffer_age_hard: 10_000.0,
            ..Knobs::default()
        }
    }

    #[test]
    fn test_missing_position_renders_nothing() {
        let mut replay = PositionReplay::<Position>::new();
        replay.observe(None).unwrap();
        assert!(replay.frame(0.0, &Knobs::default()).is_none());
    }

    #[test]
    fn test_empty_position_renders_nothing() {
        let mut replay = PositionReplay::<Position>::new();
        replay.observe(Some(&PositionRecord::empty(1_000))).unwrap();
        assert!(replay.frame(0.0, &Knobs::default()).is_none());
    }

    #[test]
    fn test_snapshot_without_history_renders_snapshot() {
        let mut replay = PositionReplay::new();
        let record = PositionRecord {
            version_number: 1,
            current: Some(Position::new(3.0, 4.0)),
            server_time: 1_000,
            history: None,
        };
        replay.observe(Some(&record)).unwrap();
        assert_eq!(replay.frame(0.0, &Knobs::default()), Some(Position::new(3.0, 4.0)));
    }

    #[test]
    fn test_replays_recorded_motion_in_order() {
        let mut replay = PositionReplay::new();
        let record = record_from(
            None,
            &[(1_000, 0.0, 0.0), (1_200, 10.0, 0.0), (1_600, 20.0, 5.0)],
            1_000,
            2_000,
        );
        replay.observe(Some(&record)).unwrap();
        let knobs = relaxed_knobs();

        assert_eq!(replay.frame(0.0, &knobs), Some(Position::new(0.0, 0.0)));
        assert_eq!(replay.frame(300.0, &knobs), Some(Position::new(10.0, 0.0)));
        assert_eq!(replay.frame(700.0, &knobs), Some(Position::new(20.0, 5.0)));
    }

    #[test]
    fn test_second_fetch_continues_from_first() {
        let mut replay = PositionReplay::new();
        let knobs = relaxed_knobs();
        let first = record_from(None, &[(1_000, 1.0, 1.0)], 1_000, 2_000);
        replay.observe(Some(&first)).unwrap();
        replay.frame(0.0, &knobs);

        let second = record_from(first.current, &[(2_500, 2.0, 1.0)], 2_000, 3_000);
        replay.observe(Some(&second)).unwrap();
        assert_eq!(replay.clock().interval_count(), 2);
        assert_eq!(replay.frame(1_400.0, &knobs), Some(Position::new(1.0, 1.0)));
        assert_eq!(replay.frame(1_600.0, &knobs), Some(Position::new(2.0, 1.0)));
    }

    #[test]
    fn test_refetch_of_same_record_is_ignored() {
        let mut replay = PositionReplay::new();
        let record = record_from(None, &[(1_000, 1.0, 1.0)], 1_000, 2_000);
        replay.observe(Some(&record)).unwrap();
        replay.observe(Some(&record)).unwrap();
        assert_eq!(replay.clock().interval_count(), 1);
    }

    #[test]
    fn test_regressing_record_is_violation() {
        let mut replay = PositionReplay::new();
        replay
            .observe(Some(&record_from(None, &[(1_000, 1.0, 1.0)], 1_000, 2_000)))
            .unwrap();
        let stale = record_from(None, &[(500, 1.0, 1.0)], 500, 1_500);
        assert!(matches!(
            replay.observe(Some(&stale)),
            Err(OrderingViolation::IntervalRegressed { .. })
        ));
    }

    #[test]
    fn test_corrupt_history_falls_back_to_snapshot() {
        let mut replay = PositionReplay::new();
        let mut record = record_from(None, &[(1_000, 1.0, 1.0), (1_500, 9.0, 9.0)], 1_000, 2_000);
        if let Some(history) = record.history.as_mut() {
            history.buffer.truncate(history.buffer.len() - 1);
        }
        replay.observe(Some(&record)).unwrap();
        assert_eq!(replay.frame(0.0, &Knobs::default()), Some(Position::new(9.0, 9.0)));
        assert_eq!(replay.clock().interval_count(), 0);
    }
}
