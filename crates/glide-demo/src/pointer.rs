//! Synthetic pointer motion for the simulated writer.

use std::f64::consts::TAU;

use glide_history::Position;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

/// Container size the pointer moves within, in pixels.
const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 600.0;

/// A Lissajous sweep with hand jitter and occasional pauses.
pub struct PointerPath {
    rng: Xoshiro256StarStar,
    paused_until_ms: u64,
    last: Position,
}

impl PointerPath {
    /// Start at the container centre with jitter seeded from `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Xoshiro256StarStar::seed_from_u64(seed),
            paused_until_ms: 0,
            last: Position::new(WIDTH / 2.0, HEIGHT / 2.0),
        }
    }

    /// Pointer position `elapsed_ms` into the scenario.
    pub fn sample(&mut self, elapsed_ms: u64) -> Position {
        if elapsed_ms < self.paused_until_ms {
            return self.last;
        }
        // Roughly one pause every few seconds, so replay sees idle stretches.
        if self.rng.random_bool(0.0005) {
            self.paused_until_ms = elapsed_ms + self.rng.random_range(300..1_200);
            return self.last;
        }

        let t = elapsed_ms as f64 / 1000.0;
        let x = WIDTH / 2.0 + 0.4 * WIDTH * (TAU * 0.3 * t).sin();
        let y = HEIGHT / 2.0 + 0.4 * HEIGHT * (TAU * 0.2 * t + 0.5).sin();
        let jitter = self.rng.random_range(-0.75..0.75);
        self.last = Position::new((x + jitter).clamp(0.0, WIDTH), (y - jitter).clamp(0.0, HEIGHT));
        self.last
    }
}
