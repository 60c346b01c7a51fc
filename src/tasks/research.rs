//! Technology research task

use super::{ActionOutcome, StepError, TaskCtx};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    OpenAcademy,
    ChooseTech,
    Confirm,
}

/// Starts the recommended research at the academy if a slot is free
#[derive(Debug, Clone, Default)]
pub struct ResearchTask;

impl ResearchTask {
    pub fn run(&self, ctx: &mut TaskCtx<'_>) -> Result<ActionOutcome, StepError> {
        let mut phase = Phase::OpenAcademy;
        loop {
            phase = match phase {
                Phase::OpenAcademy => {
                    ctx.find_and_tap("academy")?;
                    Phase::ChooseTech
                }
                Phase::ChooseTech => {
                    // Prefer the game's recommendation, fall back to any
                    // available tech
                    if !ctx.try_find_and_tap("recommended_research")?
                        && !ctx.try_find_and_tap("research_available")?
                    {
                        return Ok(ActionOutcome::Failed(
                            "template_not_found:recommended_research".to_string(),
                        ));
                    }
                    Phase::Confirm
                }
                Phase::Confirm => {
                    ctx.find_and_tap("research_button")?;
                    log::info!("Research started");
                    return Ok(ActionOutcome::Success);
                }
            };
        }
    }
}
