//! Alliance help task

use super::{ActionOutcome, StepError, TaskCtx};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    OpenAlliance,
    Helping { helped: u32 },
}

/// Presses the alliance help button for pending requests
#[derive(Debug, Clone)]
pub struct HelpTask {
    /// Upper bound on help presses in a single attempt
    pub max_helps: u32,
}

impl Default for HelpTask {
    fn default() -> Self {
        Self { max_helps: 10 }
    }
}

impl HelpTask {
    pub fn run(&self, ctx: &mut TaskCtx<'_>) -> Result<ActionOutcome, StepError> {
        let mut phase = Phase::OpenAlliance;
        loop {
            phase = match phase {
                Phase::OpenAlliance => {
                    ctx.find_and_tap("alliance_button")?;
                    Phase::Helping { helped: 0 }
                }
                Phase::Helping { helped } => {
                    if helped >= self.max_helps || !ctx.try_find_and_tap("help_all_button")? {
                        if helped == 0 {
                            log::debug!("No help requests pending");
                            return Ok(ActionOutcome::NotApplicable);
                        }
                        log::info!("Helped allies {helped} times");
                        return Ok(ActionOutcome::Success);
                    }
                    ctx.pause(ctx.retry_delay);
                    Phase::Helping { helped: helped + 1 }
                }
            };
        }
    }
}
