//! Barbarian attack task

use super::{ActionOutcome, StepError, TaskCtx};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    OpenMap,
    OpenSearch,
    OpenFilter,
    SelectLevel,
    SelectFort,
    ConfirmAttack,
    ChooseCommander,
    March,
}

/// Searches the map for barbarians of a configured level and attacks them
#[derive(Debug, Clone)]
pub struct BarbarianTask {
    /// Barbarian level to filter for
    pub level: u32,
    /// How many attacks to launch in a single attempt
    pub attack_count: u32,
}

impl Default for BarbarianTask {
    fn default() -> Self {
        Self {
            level: 1,
            attack_count: 1,
        }
    }
}

impl BarbarianTask {
    pub fn run(&self, ctx: &mut TaskCtx<'_>) -> Result<ActionOutcome, StepError> {
        if self.attack_count == 0 {
            return Ok(ActionOutcome::Failed("no_attacks_configured".to_string()));
        }
        let level_template = format!("barbarian_level_{}", self.level);

        for attack in 1..=self.attack_count {
            let mut phase = Phase::OpenMap;
            loop {
                phase = match phase {
                    Phase::OpenMap => {
                        ctx.find_and_tap("map_button")?;
                        Phase::OpenSearch
                    }
                    Phase::OpenSearch => {
                        ctx.find_and_tap("search_button")?;
                        Phase::OpenFilter
                    }
                    Phase::OpenFilter => {
                        ctx.find_and_tap("barbarian_filter")?;
                        Phase::SelectLevel
                    }
                    Phase::SelectLevel => {
                        ctx.find_and_tap(&level_template)?;
                        Phase::SelectFort
                    }
                    Phase::SelectFort => {
                        ctx.find_and_tap("barbarian_fort")?;
                        Phase::ConfirmAttack
                    }
                    Phase::ConfirmAttack => {
                        ctx.find_and_tap("attack_button")?;
                        Phase::ChooseCommander
                    }
                    Phase::ChooseCommander => {
                        ctx.find_and_tap("commander_slot")?;
                        Phase::March
                    }
                    Phase::March => {
                        ctx.find_and_tap("march_button")?;
                        log::info!(
                            "Attack {attack}/{} launched on level {} barbarians",
                            self.attack_count,
                            self.level
                        );
                        break;
                    }
                };
            }
        }
        Ok(ActionOutcome::Success)
    }
}
