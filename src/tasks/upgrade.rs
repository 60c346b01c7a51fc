//! Building upgrade task

use super::{ActionOutcome, StepError, TaskCtx};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    FindBuilding,
    Confirm,
    Speedup,
}

/// Upgrades a building flagged as ready in the city view
///
/// The game marks upgradeable buildings with an indicator and offers a
/// recommended pick; either is accepted. No flagged building is a normal
/// state, reported as not applicable.
#[derive(Debug, Clone)]
pub struct UpgradeTask {
    /// Probability of spending a speedup item after starting an upgrade
    pub speedup_chance: f64,
}

impl Default for UpgradeTask {
    fn default() -> Self {
        Self {
            speedup_chance: 0.3,
        }
    }
}

impl UpgradeTask {
    pub fn run(&self, ctx: &mut TaskCtx<'_>) -> Result<ActionOutcome, StepError> {
        let mut phase = Phase::FindBuilding;
        loop {
            phase = match phase {
                Phase::FindBuilding => {
                    if !ctx.try_find_and_tap("upgrade_indicator")?
                        && !ctx.try_find_and_tap("recommended_button")?
                    {
                        log::debug!("No buildings ready to upgrade");
                        return Ok(ActionOutcome::NotApplicable);
                    }
                    Phase::Confirm
                }
                Phase::Confirm => {
                    ctx.find_and_tap("upgrade_button")?;
                    Phase::Speedup
                }
                Phase::Speedup => {
                    // A player only sometimes burns a speedup here
                    if ctx.humanizer.chance(self.speedup_chance)
                        && ctx.try_find_and_tap("use_speedup")?
                    {
                        ctx.pause(ctx.retry_delay);
                    }
                    log::info!("Building upgrade started");
                    return Ok(ActionOutcome::Success);
                }
            };
        }
    }
}
