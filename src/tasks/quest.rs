//! Daily quest collection task

use crate::vision::Point;

use super::{ActionOutcome, StepError, TaskCtx};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    OpenLog,
    Claiming { claimed: u32, scrolled: bool },
}

/// Claims completed quests from the quest log
#[derive(Debug, Clone)]
pub struct QuestTask {
    /// Upper bound on claims in a single attempt
    pub max_claims: u32,
}

impl Default for QuestTask {
    fn default() -> Self {
        Self { max_claims: 10 }
    }
}

impl QuestTask {
    pub fn run(&self, ctx: &mut TaskCtx<'_>) -> Result<ActionOutcome, StepError> {
        let mut phase = Phase::OpenLog;
        loop {
            phase = match phase {
                Phase::OpenLog => {
                    ctx.find_and_tap("quests_button")?;
                    Phase::Claiming {
                        claimed: 0,
                        scrolled: false,
                    }
                }
                Phase::Claiming { claimed, scrolled } => {
                    if claimed < self.max_claims && ctx.try_find_and_tap("collect_quest")? {
                        ctx.pause(ctx.retry_delay);
                        Phase::Claiming {
                            claimed: claimed + 1,
                            scrolled,
                        }
                    } else if claimed < self.max_claims && !scrolled {
                        // Completed quests may sit below the fold
                        ctx.scroll(Point::new(0.5, 0.7), Point::new(0.5, 0.3))?;
                        Phase::Claiming {
                            claimed,
                            scrolled: true,
                        }
                    } else if claimed == 0 {
                        log::debug!("No completed quests to claim");
                        return Ok(ActionOutcome::NotApplicable);
                    } else {
                        log::info!("Claimed {claimed} quest rewards");
                        return Ok(ActionOutcome::Success);
                    }
                }
            };
        }
    }
}
