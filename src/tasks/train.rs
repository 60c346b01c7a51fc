//! Troop training task

use super::{ActionOutcome, StepError, TaskCtx};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    OpenBarracks,
    OpenTraining,
    ChooseTroop,
    SetQuantity,
    Confirm,
}

/// Queues a batch of troops at the training building
#[derive(Debug, Clone)]
pub struct TrainTask {
    /// Troop type to queue, e.g. "infantry", "cavalry", "archer", "siege"
    pub troop: String,
}

impl Default for TrainTask {
    fn default() -> Self {
        Self {
            troop: "infantry".to_string(),
        }
    }
}

impl TrainTask {
    pub fn run(&self, ctx: &mut TaskCtx<'_>) -> Result<ActionOutcome, StepError> {
        let mut phase = Phase::OpenBarracks;
        loop {
            phase = match phase {
                Phase::OpenBarracks => {
                    ctx.find_and_tap("barracks")?;
                    Phase::OpenTraining
                }
                Phase::OpenTraining => {
                    ctx.find_and_tap("train_button")?;
                    Phase::ChooseTroop
                }
                Phase::ChooseTroop => {
                    ctx.find_and_tap(&format!("{}_icon", self.troop))?;
                    Phase::SetQuantity
                }
                Phase::SetQuantity => {
                    // Queue as many as resources allow
                    ctx.find_and_tap("max_button")?;
                    Phase::Confirm
                }
                Phase::Confirm => {
                    ctx.find_and_tap("train_confirm")?;
                    log::info!("Queued {} training", self.troop);
                    return Ok(ActionOutcome::Success);
                }
            };
        }
    }
}
