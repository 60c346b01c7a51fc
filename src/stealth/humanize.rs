//! Human behavior simulation
//!
//! All randomness flows through one seedable generator so a run can be
//! replayed exactly: tests seed it, production seeds from the OS.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::HumanizerConfig;
use crate::scheduler::Session;
use crate::vision::Point;

/// Generates humanized timing, motion and break decisions
pub struct Humanizer {
    rng: StdRng,
    cfg: HumanizerConfig,
}

impl Humanizer {
    /// Create a humanizer seeded from the operating system
    pub fn new(cfg: HumanizerConfig) -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            cfg,
        }
    }

    /// Create a humanizer with a fixed seed (deterministic runs)
    pub fn with_seed(cfg: HumanizerConfig, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            cfg,
        }
    }

    /// Jitter a base wait and stretch it by session fatigue
    ///
    /// The jitter is uniform in the configured bounds; the fatigue
    /// multiplier is non-decreasing in `Session::elapsed_fatigue_factor`
    /// and capped at `max_slowdown`.
    pub fn wait_duration(&mut self, base: Duration, session: &Session) -> Duration {
        let jitter = self
            .rng
            .random_range(self.cfg.jitter_min..=self.cfg.jitter_max);
        let fatigue =
            (1.0 + session.elapsed_fatigue_factor as f64).min(self.cfg.max_slowdown.max(1.0));
        Duration::from_secs_f64(base.as_secs_f64() * jitter * fatigue)
    }

    /// Generate a curved pointer path between two normalized points
    ///
    /// Cubic Bezier with randomized nonzero control-point offsets; the path
    /// starts exactly at `start` and ends exactly at `end`, and is never the
    /// straight-line interpolation when it has more than two points.
    pub fn pointer_path(&mut self, start: Point, end: Point) -> Vec<Point> {
        let count = self
            .rng
            .random_range(self.cfg.path_points_min.max(2)..=self.cfg.path_points_max.max(2));

        let c1 = self.offset_control(lerp(start, end, 1.0 / 3.0));
        let c2 = self.offset_control(lerp(start, end, 2.0 / 3.0));

        let mut points = Vec::with_capacity(count);
        for i in 0..count {
            let t = i as f32 / (count - 1) as f32;
            points.push(cubic_bezier(start, c1, c2, end, t).clamped());
        }
        // Endpoints are exact regardless of float error
        points[0] = start;
        let last = points.len() - 1;
        points[last] = end;
        points
    }

    fn offset_control(&mut self, anchor: Point) -> Point {
        let mut axis = |v: f32| {
            let magnitude = self
                .rng
                .random_range(self.cfg.curve_offset_min..=self.cfg.curve_offset_max);
            let sign = if self.rng.random_bool(0.5) { 1.0 } else { -1.0 };
            v + magnitude * sign
        };
        Point::new(axis(anchor.x), axis(anchor.y))
    }

    /// Nudge a tap point so repeated taps never land on the same pixel
    pub fn tap_offset(&mut self, point: Point) -> Point {
        let r = self.cfg.tap_offset_radius;
        if r <= 0.0 {
            return point;
        }
        Point::new(
            point.x + self.rng.random_range(-r..=r),
            point.y + self.rng.random_range(-r..=r),
        )
        .clamped()
    }

    /// Randomized finger-down time for a tap
    pub fn tap_duration(&mut self) -> Duration {
        let (lo, hi) = self.cfg.tap_duration_ms;
        Duration::from_millis(self.rng.random_range(lo..=hi.max(lo)))
    }

    /// Decide whether the session should pause for a break
    ///
    /// The probability rises quadratically as the stint approaches its
    /// planned duration and reaches certainty at the planned end, so a
    /// break always eventually happens but never on a fixed schedule.
    pub fn should_take_break(&mut self, session: &Session) -> bool {
        if session.stint_elapsed() >= session.planned_duration {
            return true;
        }
        let progress = session.stint_elapsed().as_secs_f64()
            / session.planned_duration.as_secs_f64().max(f64::MIN_POSITIVE);
        let p = self.cfg.break_base_probability
            + progress * progress * self.cfg.break_ramp_probability;
        self.rng.random_bool(p.clamp(0.0, 1.0))
    }

    /// Randomized break length
    pub fn next_break_duration(&mut self) -> Duration {
        let (lo, hi) = self.cfg.break_secs;
        Duration::from_secs(self.rng.random_range(lo..=hi.max(lo)))
    }

    /// Draw true with the given probability
    ///
    /// Used for occasional optional behavior a player only sometimes does.
    pub fn chance(&mut self, probability: f64) -> bool {
        self.rng.random_bool(probability.clamp(0.0, 1.0))
    }

    /// Pick a random element of a slice
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.rng.random_range(0..items.len());
        Some(&items[idx])
    }
}

fn lerp(a: Point, b: Point, t: f32) -> Point {
    Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
}

fn cubic_bezier(p0: Point, p1: Point, p2: Point, p3: Point, t: f32) -> Point {
    let u = 1.0 - t;
    let (uu, tt) = (u * u, t * t);
    let (uuu, ttt) = (uu * u, tt * t);
    Point::new(
        uuu * p0.x + 3.0 * uu * t * p1.x + 3.0 * u * tt * p2.x + ttt * p3.x,
        uuu * p0.y + 3.0 * uu * t * p1.y + 3.0 * u * tt * p2.y + ttt * p3.y,
    )
}
