//! Live session state
//!
//! One `Session` exists per run, created at bot start and destroyed at stop.
//! It is the sole carrier of "how far into this run are we" state: the
//! humanizer reads it for fatigue-scaled pacing and break decisions, the
//! scheduler mutates it from task outcomes. Tasks only ever see it read-only.

use std::time::{Duration, Instant};

/// Session state owned exclusively by the scheduler
#[derive(Debug, Clone)]
pub struct Session {
    /// When the run started
    started_at: Instant,
    /// When the current stint (time since the last break) started
    stint_started_at: Instant,
    /// How long the current stint is planned to last before a break
    pub planned_duration: Duration,
    /// Fatigue multiplier input, grows with stint time, capped by config
    pub elapsed_fatigue_factor: f32,
    /// Set while the bot is on a break
    pub break_until: Option<Instant>,
    /// Successful actions performed this run
    pub action_count: u32,
    /// Failures since the last successful action
    pub consecutive_failures: u32,
}

impl Session {
    /// Start a new session with the given planned stint duration
    pub fn new(planned_duration: Duration) -> Self {
        let now = Instant::now();
        Self {
            started_at: now,
            stint_started_at: now,
            planned_duration,
            elapsed_fatigue_factor: 0.0,
            break_until: None,
            action_count: 0,
            consecutive_failures: 0,
        }
    }

    /// Time since the run started
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Time since the last break (or run start)
    pub fn stint_elapsed(&self) -> Duration {
        self.stint_started_at.elapsed()
    }

    /// Recompute the fatigue factor from stint time
    ///
    /// Fatigue ramps linearly to `cap` over `full_after`, so a long stint
    /// slows humanized waits the way a tiring operator would.
    pub fn refresh_fatigue(&mut self, full_after: Duration, cap: f32) {
        let full = full_after.as_secs_f32().max(1.0);
        let ramp = self.stint_elapsed().as_secs_f32() / full * cap;
        self.elapsed_fatigue_factor = ramp.min(cap);
    }

    /// Reset stint tracking after a break, with a fresh planned duration
    pub fn begin_stint(&mut self, planned_duration: Duration) {
        self.stint_started_at = Instant::now();
        self.planned_duration = planned_duration;
        self.elapsed_fatigue_factor = 0.0;
        self.break_until = None;
    }

    /// Record a successful action
    pub fn record_success(&mut self) {
        self.action_count += 1;
        self.consecutive_failures = 0;
    }

    /// Record a failed action
    pub fn record_failure(&mut self) {
        self.consecutive_failures += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatigue_ramp_is_capped() {
        let mut session = Session::new(Duration::from_secs(3600));
        session.refresh_fatigue(Duration::from_secs(3600), 1.0);
        // Fresh session: essentially no fatigue
        assert!(session.elapsed_fatigue_factor < 0.01);

        // Zero ramp duration is clamped, never a divide-by-zero
        session.refresh_fatigue(Duration::ZERO, 1.0);
        assert!(session.elapsed_fatigue_factor <= 1.0);
    }

    #[test]
    fn test_outcome_counters() {
        let mut session = Session::new(Duration::from_secs(60));
        session.record_failure();
        session.record_failure();
        assert_eq!(session.consecutive_failures, 2);

        session.record_success();
        assert_eq!(session.consecutive_failures, 0);
        assert_eq!(session.action_count, 1);
    }

    #[test]
    fn test_begin_stint_resets_fatigue() {
        let mut session = Session::new(Duration::from_secs(60));
        session.elapsed_fatigue_factor = 1.5;
        session.break_until = Some(Instant::now());

        session.begin_stint(Duration::from_secs(120));
        assert_eq!(session.elapsed_fatigue_factor, 0.0);
        assert!(session.break_until.is_none());
        assert_eq!(session.planned_duration, Duration::from_secs(120));
    }
}
