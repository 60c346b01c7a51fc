//! Resource gathering task

use super::{ActionOutcome, StepError, TaskCtx};

/// Steps of one gathering march, advanced only on confirmed taps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    OpenMap,
    OpenSearch,
    ChooseResource,
    SelectNode,
    ConfirmGather,
    ChooseCommander,
    March,
}

/// Sends an idle march to gather a resource node on the world map
///
/// The resource type is picked at random from the configured rotation each
/// attempt, so repeated runs do not drain one node type in a fixed order.
#[derive(Debug, Clone)]
pub struct GatherTask {
    /// Resource rotation, e.g. "food", "wood", "stone", "gold"
    pub resources: Vec<String>,
}

impl Default for GatherTask {
    fn default() -> Self {
        Self {
            resources: vec![
                "food".to_string(),
                "wood".to_string(),
                "stone".to_string(),
                "gold".to_string(),
            ],
        }
    }
}

impl GatherTask {
    pub fn run(&self, ctx: &mut TaskCtx<'_>) -> Result<ActionOutcome, StepError> {
        if self.resources.is_empty() {
            return Ok(ActionOutcome::NotApplicable);
        }
        let resource = ctx
            .humanizer
            .choose(&self.resources)
            .cloned()
            .unwrap_or_default();
        log::debug!("Gathering {resource}");

        let mut phase = Phase::OpenMap;
        loop {
            phase = match phase {
                Phase::OpenMap => {
                    ctx.find_and_tap("map_button")?;
                    Phase::OpenSearch
                }
                Phase::OpenSearch => {
                    ctx.find_and_tap("search_button")?;
                    Phase::ChooseResource
                }
                Phase::ChooseResource => {
                    ctx.find_and_tap(&format!("{resource}_icon"))?;
                    Phase::SelectNode
                }
                Phase::SelectNode => {
                    ctx.find_and_tap("resource_node")?;
                    Phase::ConfirmGather
                }
                Phase::ConfirmGather => {
                    ctx.find_and_tap("gather_button")?;
                    Phase::ChooseCommander
                }
                Phase::ChooseCommander => {
                    ctx.find_and_tap("commander_slot")?;
                    Phase::March
                }
                Phase::March => {
                    ctx.find_and_tap("march_button")?;
                    log::info!("March sent to gather {resource}");
                    return Ok(ActionOutcome::Success);
                }
            };
        }
    }
}
