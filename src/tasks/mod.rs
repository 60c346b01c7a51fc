//! Game task implementations
//!
//! Each task is a short scripted interaction: locate named UI templates on
//! the screen and tap through them. Tasks report how the attempt ended but
//! never decide what runs next; ordering, cooldowns and retries across runs
//! belong to the scheduler.
//!
//! Inside a task, a template that never shows up is an ordinary failure of
//! that attempt. Only a broken device channel aborts the whole run.

pub mod barbarian;
pub mod chest;
pub mod gather;
pub mod heal;
pub mod help;
pub mod quest;
pub mod research;
pub mod train;
pub mod upgrade;

use std::time::Duration;

use serde::Serialize;

use crate::device::{DeviceControl, DeviceError};
use crate::scheduler::Session;
use crate::stealth::Humanizer;
use crate::vision::{Frame, MatchResult, Matcher, Point, TemplateStore};

pub use barbarian::BarbarianTask;
pub use chest::ChestTask;
pub use gather::GatherTask;
pub use heal::HealTask;
pub use help::HelpTask;
pub use quest::QuestTask;
pub use research::ResearchTask;
pub use train::TrainTask;
pub use upgrade::UpgradeTask;

/// Why a run was aborted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AbortCause {
    /// The device channel failed; the run cannot continue
    Channel(String),
    /// The license expired or became invalid
    LicenseInvalid,
}

/// How one task attempt ended
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ActionOutcome {
    /// The task completed its interaction
    Success,
    /// The attempt did not complete; the reason names what went wrong
    Failed(String),
    /// Preconditions were not met; nothing was attempted
    NotApplicable,
    /// The run must stop
    Aborted(AbortCause),
}

/// A failed step inside a running task
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("template '{0}' not found")]
    NotFound(String),
    #[error("timed out waiting for template '{0}'")]
    Timeout(String),
    #[error("device channel failed: {0}")]
    Channel(#[from] DeviceError),
}

impl StepError {
    /// Fold a step failure into the attempt's outcome
    fn into_outcome(self) -> ActionOutcome {
        match self {
            StepError::NotFound(name) | StepError::Timeout(name) => {
                ActionOutcome::Failed(format!("template_not_found:{name}"))
            }
            StepError::Channel(e) => ActionOutcome::Aborted(AbortCause::Channel(e.to_string())),
        }
    }
}

/// Everything a task needs to interact with the game for one attempt
///
/// Borrowed from the scheduler for the duration of a single execution, so
/// a task can never outlive or race the device channel.
pub struct TaskCtx<'a> {
    pub device: &'a mut dyn DeviceControl,
    pub matcher: &'a Matcher,
    pub templates: &'a TemplateStore,
    pub humanizer: &'a mut Humanizer,
    pub session: &'a Session,
    /// How many captures to try before a lookup times out
    pub step_retries: u32,
    /// Base delay between capture retries, before humanization
    pub retry_delay: Duration,
    /// Base delay before each tap, before humanization
    pub tap_delay: Duration,
    /// Base duration for a swipe gesture
    pub swipe_duration: Duration,
}

impl TaskCtx<'_> {
    /// Capture the current screen
    pub fn capture(&mut self) -> Result<Frame, StepError> {
        Ok(self.device.capture_frame()?)
    }

    /// Look up a template once against a fresh capture
    pub fn look_for(&mut self, name: &str) -> Result<MatchResult, StepError> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| StepError::NotFound(name.to_string()))?;
        let frame = self.capture()?;
        Ok(self.matcher.find(&frame, template))
    }

    /// Wait for a template to appear, recapturing between attempts
    pub fn find(&mut self, name: &str) -> Result<MatchResult, StepError> {
        for attempt in 0..self.step_retries.max(1) {
            let result = self.look_for(name)?;
            if result.found {
                return Ok(result);
            }
            if attempt + 1 < self.step_retries.max(1) {
                self.pause(self.retry_delay);
            }
        }
        Err(StepError::Timeout(name.to_string()))
    }

    /// Tap a template if it is currently on screen
    ///
    /// A single capture attempt; returns whether the tap happened. Used for
    /// optional elements where absence is expected and not a failure.
    pub fn try_find_and_tap(&mut self, name: &str) -> Result<bool, StepError> {
        let result = self.look_for(name)?;
        if !result.found {
            return Ok(false);
        }
        self.tap(result.point)?;
        Ok(true)
    }

    /// Wait for a template and tap its center
    pub fn find_and_tap(&mut self, name: &str) -> Result<(), StepError> {
        let result = self.find(name)?;
        self.tap(result.point)
    }

    /// Tap a normalized point with humanized offset, delay and duration
    pub fn tap(&mut self, point: Point) -> Result<(), StepError> {
        self.pause(self.tap_delay);
        let target = self.humanizer.tap_offset(point);
        let duration = self.humanizer.tap_duration();
        self.device.tap(target, duration)?;
        Ok(())
    }

    /// Drag along a humanized curved path between two normalized points
    pub fn scroll(&mut self, start: Point, end: Point) -> Result<(), StepError> {
        let path = self.humanizer.pointer_path(start, end);
        let duration = self.humanizer.wait_duration(self.swipe_duration, self.session);
        self.device.swipe(&path, duration)?;
        Ok(())
    }

    /// Sleep for a humanized stretch of the given base delay
    pub fn pause(&mut self, base: Duration) {
        let wait = self.humanizer.wait_duration(base, self.session);
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
    }
}

/// The set of tasks the agent knows how to run
///
/// A closed enum rather than trait objects: the scheduler matches on the
/// variant for naming and eligibility, and every variant carries its own
/// configured payload.
#[derive(Debug, Clone)]
pub enum Task {
    Gather(GatherTask),
    Train(TrainTask),
    Research(ResearchTask),
    Heal(HealTask),
    Help(HelpTask),
    Chest(ChestTask),
    Quest(QuestTask),
    Barbarian(BarbarianTask),
    Upgrade(UpgradeTask),
}

impl Task {
    /// Stable name used in config, stats and control commands
    pub fn name(&self) -> &'static str {
        match self {
            Task::Gather(_) => "gather",
            Task::Train(_) => "train",
            Task::Research(_) => "research",
            Task::Heal(_) => "heal",
            Task::Help(_) => "help",
            Task::Chest(_) => "chest",
            Task::Quest(_) => "quest",
            Task::Barbarian(_) => "barbarian",
            Task::Upgrade(_) => "upgrade",
        }
    }

    /// Check whether the current screen lets this task start
    ///
    /// Read-only: eligibility never taps or waits, it only inspects the
    /// frame the scheduler already captured for this cycle.
    pub fn is_eligible(
        &self,
        frame: &Frame,
        matcher: &Matcher,
        templates: &TemplateStore,
    ) -> bool {
        let anchor = match self {
            Task::Gather(_) | Task::Barbarian(_) => "map_button",
            Task::Train(_) => "barracks",
            Task::Research(_) => "academy",
            Task::Heal(_) => "hospital",
            Task::Help(_) => "alliance_button",
            Task::Quest(_) => "quests_button",
            // Chests and upgrade indicators are checked wherever they pop up
            Task::Chest(_) | Task::Upgrade(_) => return true,
        };
        templates
            .get(anchor)
            .map(|t| matcher.find(frame, t).found)
            .unwrap_or(false)
    }

    /// Run one attempt of this task
    pub fn execute(&self, ctx: &mut TaskCtx<'_>) -> ActionOutcome {
        let result = match self {
            Task::Gather(t) => t.run(ctx),
            Task::Train(t) => t.run(ctx),
            Task::Research(t) => t.run(ctx),
            Task::Heal(t) => t.run(ctx),
            Task::Help(t) => t.run(ctx),
            Task::Chest(t) => t.run(ctx),
            Task::Quest(t) => t.run(ctx),
            Task::Barbarian(t) => t.run(ctx),
            Task::Upgrade(t) => t.run(ctx),
        };
        match result {
            Ok(outcome) => outcome,
            Err(e) => e.into_outcome(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_error_maps_to_outcome() {
        let failed = StepError::Timeout("march_button".into()).into_outcome();
        assert_eq!(
            failed,
            ActionOutcome::Failed("template_not_found:march_button".into())
        );

        let failed = StepError::NotFound("gather_button".into()).into_outcome();
        assert_eq!(
            failed,
            ActionOutcome::Failed("template_not_found:gather_button".into())
        );

        let aborted = StepError::Channel(DeviceError::NotConnected).into_outcome();
        assert!(matches!(
            aborted,
            ActionOutcome::Aborted(AbortCause::Channel(_))
        ));
    }

    #[test]
    fn test_task_names_are_stable() {
        let task = Task::Heal(HealTask::default());
        assert_eq!(task.name(), "heal");
        let task = Task::Quest(QuestTask { max_claims: 5 });
        assert_eq!(task.name(), "quest");
        let task = Task::Upgrade(UpgradeTask::default());
        assert_eq!(task.name(), "upgrade");
    }
}
