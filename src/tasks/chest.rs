//! Chest and reward collection task

use super::{ActionOutcome, StepError, TaskCtx};

const CHEST_SOURCES: [&str; 3] = ["free_chest", "vip_chest", "daily_objectives"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Look for the next chest source on screen
    CheckSource { index: usize, opened: u32 },
    /// A source was opened; claim whatever it presented
    Claim { index: usize, opened: u32 },
}

/// Claims free chests, VIP chests and daily objective rewards
///
/// Every source is optional; the attempt succeeds if at least one chest
/// was opened and is otherwise not applicable.
#[derive(Debug, Clone, Default)]
pub struct ChestTask;

impl ChestTask {
    pub fn run(&self, ctx: &mut TaskCtx<'_>) -> Result<ActionOutcome, StepError> {
        let mut phase = Phase::CheckSource { index: 0, opened: 0 };
        loop {
            phase = match phase {
                Phase::CheckSource { index, opened } => {
                    let Some(source) = CHEST_SOURCES.get(index).copied() else {
                        if opened == 0 {
                            log::debug!("No chests to collect");
                            return Ok(ActionOutcome::NotApplicable);
                        }
                        log::info!("Collected {opened} chests");
                        return Ok(ActionOutcome::Success);
                    };
                    if ctx.try_find_and_tap(source)? {
                        Phase::Claim { index, opened }
                    } else {
                        Phase::CheckSource {
                            index: index + 1,
                            opened,
                        }
                    }
                }
                Phase::Claim { index, opened } => {
                    let claimed = ctx.try_find_and_tap("open_chest")?
                        || ctx.try_find_and_tap("claim_reward")?;
                    // Let the reward popup settle before the next source
                    ctx.pause(ctx.retry_delay);
                    Phase::CheckSource {
                        index: index + 1,
                        opened: opened + u32::from(claimed),
                    }
                }
            };
        }
    }
}
