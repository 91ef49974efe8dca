//! Adaptive replay clock over acknowledged server-time intervals.

use std::collections::VecDeque;

use glide_config::Knobs;
use glide_store::{OrderingViolation, PositionRecord};

/// Half-open span of server time covered by one fetched history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerTimeInterval {
    /// Start of the span in ms.
    pub start_ts: u64,
    /// End of the span in ms.
    pub end_ts: u64,
}

impl ServerTimeInterval {
    /// Create an interval.
    pub const fn new(start_ts: u64, end_ts: u64) -> Self {
        Self { start_ts, end_ts }
    }

    /// Span covered by a record's history, if it has one.
    pub fn from_record<T>(record: &PositionRecord<T>) -> Option<Self> {
        record
            .history
            .as_ref()
            .map(|history| Self::new(history.start, record.server_time))
    }

    /// Length of the span in ms.
    pub fn duration(&self) -> u64 {
        self.end_ts.saturating_sub(self.start_ts)
    }
}

/// Synthesizes a forward-only replay time trailing the freshest server time.
///
/// Replay runs at `slow_rate` when less than `min_server_buffer_age_soft` of
/// buffer remains, at `fast_rate` when more than `max_server_buffer_age_soft`
/// is buffered, and jumps ahead whenever it falls more than
/// `max_server_buffer_age_hard` behind. Gaps between intervals are skipped.
#[derive(Debug, Clone, Default)]
pub struct PlaybackClock {
    intervals: VecDeque<ServerTimeInterval>,
    prev_client_ts: Option<f64>,
    prev_server_ts: Option<f64>,
    buffered_duration: u64,
}

impl PlaybackClock {
    /// Create a clock with no intervals.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a newly acknowledged interval.
    ///
    /// An interval ending where the last one ended is a duplicate and is
    /// ignored.
    ///
    /// # Errors
    ///
    /// [`OrderingViolation::IntervalRegressed`] if it ends before the last
    /// accepted interval.
    pub fn receive(&mut self, interval: ServerTimeInterval) -> Result<(), OrderingViolation> {
        if let Some(last) = self.intervals.back() {
            if last.end_ts == interval.end_ts {
                return Ok(());
            }
            if last.end_ts > interval.end_ts {
                return Err(OrderingViolation::IntervalRegressed {
                    previous_end_ts: last.end_ts,
                    end_ts: interval.end_ts,
                });
            }
        }
        self.buffered_duration += interval.duration();
        self.intervals.push_back(interval);
        Ok(())
    }

    /// Advance to client time `client_now` and return the replay time, or
    /// `None` before any interval has been received.
    pub fn advance(&mut self, client_now: f64, knobs: &Knobs) -> Option<f64> {
        let first_start = self.intervals.front()?.start_ts as f64;
        let last_end = self.intervals.back()?.end_ts as f64;
        if self.prev_client_ts == Some(client_now) {
            return self.prev_server_ts;
        }

        // First advance starts at the beginning of the buffer.
        let prev_client_ts = self.prev_client_ts.unwrap_or(client_now);
        let prev_server_ts = self.prev_server_ts.unwrap_or(first_start);

        let depth = last_end - prev_server_ts;
        let rate = if depth < knobs.min_server_buffer_age_soft {
            knobs.slow_rate
        } else if depth > knobs.max_server_buffer_age_soft {
            knobs.fast_rate
        } else {
            1.0
        };
        let elapsed = (client_now - prev_client_ts).max(0.0);
        let mut server_ts =
            (prev_server_ts + elapsed * rate).max(last_end - knobs.max_server_buffer_age_hard);

        let mut chosen = None;
        for (i, interval) in self.intervals.iter().enumerate() {
            if (interval.end_ts as f64) < server_ts {
                continue;
            }
            if server_ts < interval.start_ts as f64 {
                // Gap in server coverage: skip ahead to the next interval.
                server_ts = interval.start_ts as f64;
            }
            chosen = Some(i);
            break;
        }
        let chosen = chosen.unwrap_or_else(|| {
            server_ts = last_end;
            self.intervals.len() - 1
        });

        self.trim_before(chosen.saturating_sub(1));
        self.prev_client_ts = Some(client_now);
        self.prev_server_ts = Some(server_ts);
        Some(server_ts)
    }

    /// Drop the first `count` intervals; replay never returns to them.
    fn trim_before(&mut self, count: usize) {
        for interval in self.intervals.drain(..count) {
            self.buffered_duration -= interval.duration();
        }
    }

    /// Buffered server time ahead of the replay head, in ms.
    pub fn buffer_health(&self) -> f64 {
        let (Some(first), Some(last)) = (self.intervals.front(), self.intervals.back()) else {
            return 0.0;
        };
        last.end_ts as f64 - self.prev_server_ts.unwrap_or(first.start_ts as f64)
    }

    /// Offset between client time and replay time at the last advance.
    pub fn clock_skew(&self) -> f64 {
        match (self.prev_client_ts, self.prev_server_ts) {
            (Some(client), Some(server)) => client - server,
            _ => 0.0,
        }
    }

    /// Last replay time returned by [`advance`](Self::advance).
    pub fn replay_time(&self) -> Option<f64> {
        self.prev_server_ts
    }

    /// Total length of the retained intervals, in ms.
    pub fn buffered_duration(&self) -> u64 {
        self.buffered_duration
    }

    /// Number of retained intervals.
    pub fn interval_count(&self) -> usize {
        self.intervals.len()
    }
}
