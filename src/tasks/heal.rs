//! Troop healing task

use super::{ActionOutcome, StepError, TaskCtx};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    OpenHospital,
    CheckWounded,
    Confirm,
}

/// Heals all wounded troops at the hospital
#[derive(Debug, Clone, Default)]
pub struct HealTask;

impl HealTask {
    pub fn run(&self, ctx: &mut TaskCtx<'_>) -> Result<ActionOutcome, StepError> {
        let mut phase = Phase::OpenHospital;
        loop {
            phase = match phase {
                Phase::OpenHospital => {
                    ctx.find_and_tap("hospital")?;
                    Phase::CheckWounded
                }
                Phase::CheckWounded => {
                    // No heal button means no wounded troops, not a failure
                    if !ctx.try_find_and_tap("heal_all_button")? {
                        log::debug!("No wounded troops to heal");
                        return Ok(ActionOutcome::NotApplicable);
                    }
                    Phase::Confirm
                }
                Phase::Confirm => {
                    ctx.find_and_tap("confirm_heal")?;
                    log::info!("Healing started");
                    return Ok(ActionOutcome::Success);
                }
            };
        }
    }
}
