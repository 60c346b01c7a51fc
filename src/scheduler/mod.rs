//! Task scheduling and the main control loop
//!
//! The scheduler owns everything that runs: the device channel, the task
//! registry, the session, the humanizer and the stats sink. One loop, one
//! thread; external callers influence it only through the control channel,
//! and the loop honors those signals at cycle checkpoints rather than by
//! preemption. Nothing is interrupted mid-gesture.

pub mod session;

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub use session::Session;

use crate::config::SchedulerConfig;
use crate::control::{ControlReceiver, ControlSignal};
use crate::device::DeviceControl;
use crate::license::LicenseGate;
use crate::stats::{ActionEvent, StatsSink};
use crate::stealth::Humanizer;
use crate::tasks::{AbortCause, ActionOutcome, Task, TaskCtx};
use crate::vision::{Matcher, TemplateStore};

/// Lifecycle state of the bot loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    Starting,
    Running,
    OnBreak,
    Paused,
    Stopping,
    Stopped,
}

/// Scheduling metadata for one registered task
#[derive(Debug, Clone)]
pub struct TaskDescriptor {
    pub name: &'static str,
    pub priority: f64,
    pub cooldown: Duration,
    pub enabled: bool,
    pub last_run_at: Option<Instant>,
    pub run_count: u32,
    pub failure_count: u32,
    /// Failures since this task last succeeded; dampens its selection weight
    pub recent_failures: u32,
}

impl TaskDescriptor {
    pub fn new(name: &'static str, priority: f64, cooldown: Duration) -> Self {
        Self {
            name,
            priority,
            cooldown,
            enabled: true,
            last_run_at: None,
            run_count: 0,
            failure_count: 0,
            recent_failures: 0,
        }
    }

    /// Whether this task may be considered for selection right now
    pub fn ready(&self, now: Instant) -> bool {
        if !self.enabled || self.priority <= 0.0 {
            return false;
        }
        match self.last_run_at {
            Some(last) => now.duration_since(last) >= self.cooldown,
            None => true,
        }
    }

    /// Selection weight, discounted by recent failures
    pub fn weight(&self) -> f64 {
        self.priority / (1.0 + self.recent_failures as f64)
    }
}

/// Sample an index proportionally to the given weights
///
/// Returns `None` when no weight is positive.
pub fn pick_weighted(rng: &mut StdRng, weights: &[f64]) -> Option<usize> {
    let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
    if total <= 0.0 {
        return None;
    }
    let mut roll = rng.random_range(0.0..total);
    for (i, &w) in weights.iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        if roll < w {
            return Some(i);
        }
        roll -= w;
    }
    // Float rounding can exhaust the roll; fall back to the last positive weight
    weights.iter().rposition(|w| *w > 0.0)
}

struct TaskEntry {
    task: Task,
    descriptor: TaskDescriptor,
}

/// The bot's main loop
pub struct Scheduler {
    cfg: SchedulerConfig,
    entries: Vec<TaskEntry>,
    session: Session,
    humanizer: Humanizer,
    matcher: Matcher,
    templates: TemplateStore,
    device: Box<dyn DeviceControl>,
    license: Box<dyn LicenseGate>,
    stats: Box<dyn StatsSink>,
    control: ControlReceiver,
    rng: StdRng,
    state: BotState,
    cycle_count: u64,
}

impl Scheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cfg: SchedulerConfig,
        registry: Vec<(Task, TaskDescriptor)>,
        templates: TemplateStore,
        humanizer: Humanizer,
        device: Box<dyn DeviceControl>,
        license: Box<dyn LicenseGate>,
        stats: Box<dyn StatsSink>,
        control: ControlReceiver,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let matcher = Matcher::new(templates.reference_width());
        let entries = registry
            .into_iter()
            .map(|(task, descriptor)| TaskEntry { task, descriptor })
            .collect();
        Self {
            cfg,
            entries,
            session: Session::new(Duration::ZERO),
            humanizer,
            matcher,
            templates,
            device,
            license,
            stats,
            control,
            rng,
            state: BotState::Starting,
            cycle_count: 0,
        }
    }

    pub fn state(&self) -> BotState {
        self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run the loop until stopped
    ///
    /// Blocks the calling thread. Returns cleanly on a stop signal, a
    /// device channel failure or license expiry.
    pub fn run(&mut self) {
        let stint = self.random_stint();
        self.session.begin_stint(stint);
        self.state = BotState::Running;
        log::info!(
            "Bot started with {} tasks, first stint {}s",
            self.entries.len(),
            stint.as_secs()
        );

        while self.state != BotState::Stopping {
            self.drain_control();
            match self.state {
                BotState::Stopping => break,
                BotState::Paused => {
                    std::thread::sleep(Duration::from_millis(self.cfg.pause_poll_ms.max(1)));
                    continue;
                }
                _ => {}
            }

            if self.cycle_count % self.cfg.license_check_interval.max(1) == 0
                && !self.license.is_valid()
            {
                log::error!("License is no longer valid, stopping");
                self.stats.record(ActionEvent::now(
                    "license",
                    ActionOutcome::Aborted(AbortCause::LicenseInvalid),
                ));
                self.stats.alert("license invalid, bot stopped");
                self.state = BotState::Stopping;
                break;
            }
            self.cycle_count += 1;

            self.cycle();
        }

        self.state = BotState::Stopped;
        log::info!(
            "Bot stopped after {} cycles, {} successful actions",
            self.cycle_count,
            self.session.action_count
        );
    }

    /// One scheduling cycle: capture, select, execute, record
    fn cycle(&mut self) {
        self.session.refresh_fatigue(
            Duration::from_secs(self.cfg.fatigue_full_after_secs),
            self.cfg.fatigue_cap,
        );

        let frame = match self.device.capture_frame() {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("Screen capture failed: {e}");
                self.stats.record(ActionEvent::now(
                    "capture",
                    ActionOutcome::Aborted(AbortCause::Channel(e.to_string())),
                ));
                self.stats.alert("device channel lost, bot stopped");
                self.state = BotState::Stopping;
                return;
            }
        };

        let now = Instant::now();
        let eligible: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.descriptor.ready(now))
            .filter(|(_, e)| e.task.is_eligible(&frame, &self.matcher, &self.templates))
            .map(|(i, _)| i)
            .collect();

        if eligible.is_empty() {
            log::debug!("No eligible task this cycle");
            self.interruptible_sleep(self.cfg.idle_delay());
            return;
        }

        let weights: Vec<f64> = eligible
            .iter()
            .map(|&i| self.entries[i].descriptor.weight())
            .collect();
        let Some(pick) = pick_weighted(&mut self.rng, &weights) else {
            self.interruptible_sleep(self.cfg.idle_delay());
            return;
        };
        let idx = eligible[pick];

        let task = self.entries[idx].task.clone();
        log::info!("Running task '{}'", task.name());
        let outcome = {
            let mut ctx = TaskCtx {
                device: &mut *self.device,
                matcher: &self.matcher,
                templates: &self.templates,
                humanizer: &mut self.humanizer,
                session: &self.session,
                step_retries: self.cfg.step_retries,
                retry_delay: self.cfg.retry_delay(),
                tap_delay: self.cfg.tap_delay(),
                swipe_duration: self.cfg.swipe_duration(),
            };
            task.execute(&mut ctx)
        };
        self.apply_outcome(idx, outcome);
        if self.state == BotState::Stopping {
            return;
        }

        if self.session.consecutive_failures >= self.cfg.failure_ceiling.max(1) {
            log::warn!(
                "{} consecutive failures, pausing for operator attention",
                self.session.consecutive_failures
            );
            self.stats.alert("consecutive failure ceiling reached, bot paused");
            self.session.consecutive_failures = 0;
            self.state = BotState::Paused;
            return;
        }

        if self.humanizer.should_take_break(&self.session) {
            self.take_break();
            return;
        }

        let delay = self.humanizer.wait_duration(self.cfg.task_delay(), &self.session);
        self.interruptible_sleep(delay);
    }

    fn apply_outcome(&mut self, idx: usize, outcome: ActionOutcome) {
        let now = Instant::now();
        let entry = &mut self.entries[idx];
        let name = entry.descriptor.name;
        log::debug!("Task '{name}' finished: {outcome:?}");

        match &outcome {
            ActionOutcome::Success => {
                entry.descriptor.last_run_at = Some(now);
                entry.descriptor.run_count += 1;
                entry.descriptor.recent_failures = 0;
                self.session.record_success();
            }
            ActionOutcome::Failed(reason) => {
                log::warn!("Task '{name}' failed: {reason}");
                entry.descriptor.last_run_at = Some(now);
                entry.descriptor.failure_count += 1;
                entry.descriptor.recent_failures += 1;
                self.session.record_failure();
            }
            ActionOutcome::NotApplicable => {
                // Cooldown still applies so the task is not re-polled immediately
                entry.descriptor.last_run_at = Some(now);
            }
            ActionOutcome::Aborted(cause) => {
                log::error!("Task '{name}' aborted the run: {cause:?}");
                self.stats.alert("run aborted, bot stopped");
                self.state = BotState::Stopping;
            }
        }
        self.stats.record(ActionEvent::now(name, outcome));
    }

    /// Pause all activity for a humanized break, then start a fresh stint
    fn take_break(&mut self) {
        let duration = self.humanizer.next_break_duration();
        log::info!("Taking a break for {}s", duration.as_secs());
        self.state = BotState::OnBreak;
        self.session.break_until = Some(Instant::now() + duration);

        let end = Instant::now() + duration;
        while Instant::now() < end {
            self.drain_control();
            if self.state != BotState::OnBreak {
                // Stop and pause signals cut the break short
                self.session.break_until = None;
                return;
            }
            let remaining = end.saturating_duration_since(Instant::now());
            std::thread::sleep(remaining.min(Duration::from_millis(self.cfg.sleep_slice_ms.max(1))));
        }

        self.state = BotState::Running;
        let stint = self.random_stint();
        self.session.begin_stint(stint);
        log::info!("Break over, next stint {}s", stint.as_secs());
    }

    /// Sleep in slices, checking the control channel between slices
    fn interruptible_sleep(&mut self, total: Duration) {
        let end = Instant::now() + total;
        loop {
            self.drain_control();
            if self.state == BotState::Stopping || self.state == BotState::Paused {
                return;
            }
            let remaining = end.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return;
            }
            std::thread::sleep(remaining.min(Duration::from_millis(self.cfg.sleep_slice_ms.max(1))));
        }
    }

    /// Apply all pending control signals
    fn drain_control(&mut self) {
        while let Some(signal) = self.control.poll() {
            match signal {
                ControlSignal::Pause => {
                    if matches!(self.state, BotState::Running | BotState::OnBreak) {
                        log::info!("Pause requested");
                        self.state = BotState::Paused;
                    }
                }
                ControlSignal::Resume => {
                    if self.state == BotState::Paused {
                        log::info!("Resuming");
                        self.state = BotState::Running;
                    }
                }
                ControlSignal::Stop => {
                    log::info!("Stop requested");
                    self.state = BotState::Stopping;
                }
                ControlSignal::SetTaskEnabled { task, enabled } => {
                    self.configure_task(&task, |d| d.enabled = enabled);
                }
                ControlSignal::SetTaskPriority { task, priority } => {
                    self.configure_task(&task, |d| d.priority = priority);
                }
            }
        }
    }

    fn configure_task(&mut self, name: &str, apply: impl FnOnce(&mut TaskDescriptor)) {
        match self.entries.iter_mut().find(|e| e.descriptor.name == name) {
            Some(entry) => {
                apply(&mut entry.descriptor);
                log::info!("Task '{}' reconfigured: {:?}", name, entry.descriptor);
            }
            None => log::warn!("Control signal for unknown task '{name}'"),
        }
    }

    fn random_stint(&mut self) -> Duration {
        let lo = self.cfg.stint_min_secs;
        let hi = self.cfg.stint_max_secs.max(lo);
        Duration::from_secs(self.rng.random_range(lo..=hi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_ready_respects_cooldown() {
        let mut d = TaskDescriptor::new("gather", 1.0, Duration::from_secs(300));
        let now = Instant::now();
        assert!(d.ready(now));

        d.last_run_at = Some(now);
        assert!(!d.ready(now));
        assert!(d.ready(now + Duration::from_secs(300)));

        d.enabled = false;
        assert!(!d.ready(now + Duration::from_secs(600)));
    }

    #[test]
    fn test_descriptor_weight_dampened_by_failures() {
        let mut d = TaskDescriptor::new("train", 2.0, Duration::ZERO);
        assert_eq!(d.weight(), 2.0);
        d.recent_failures = 1;
        assert_eq!(d.weight(), 1.0);
        d.recent_failures = 3;
        assert_eq!(d.weight(), 0.5);
    }

    #[test]
    fn test_pick_weighted_matches_ratio() {
        let mut rng = StdRng::seed_from_u64(99);
        let weights = [2.0, 1.0];

        let mut first = 0usize;
        let draws = 10_000;
        for _ in 0..draws {
            if pick_weighted(&mut rng, &weights) == Some(0) {
                first += 1;
            }
        }
        // Expect roughly 2:1; allow a generous band around 2/3
        let share = first as f64 / draws as f64;
        assert!((0.63..0.70).contains(&share), "share was {share}");
    }

    #[test]
    fn test_pick_weighted_skips_nonpositive() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(pick_weighted(&mut rng, &[0.0, 3.0, 0.0]), Some(1));
        }
        assert_eq!(pick_weighted(&mut rng, &[0.0, 0.0]), None);
        assert_eq!(pick_weighted(&mut rng, &[]), None);
    }
}
