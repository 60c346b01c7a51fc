//! Configuration loading
//!
//! Every tunable lives here: pacing, stealth parameters, per-task toggles
//! and priorities. The file format is JSON with defaults for every field,
//! so an empty `{}` is a valid (if conservative) configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::scheduler::TaskDescriptor;
use crate::stealth::HumanizerConfig;
use crate::tasks::{
    BarbarianTask, ChestTask, GatherTask, HealTask, HelpTask, QuestTask, ResearchTask, Task,
    TrainTask, UpgradeTask,
};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{0}': {1}")]
    Read(PathBuf, std::io::Error),
    #[error("failed to parse config file '{0}': {1}")]
    Parse(PathBuf, serde_json::Error),
}

/// Top-level settings for a run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Fixed RNG seed; omit for OS-seeded runs
    pub seed: Option<u64>,
    pub template_dir: PathBuf,
    pub license_file: Option<PathBuf>,
    pub stats_dir: PathBuf,
    pub device: DeviceSettings,
    pub humanizer: HumanizerConfig,
    pub scheduler: SchedulerConfig,
    pub tasks: TaskSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seed: None,
            template_dir: PathBuf::from("templates"),
            license_file: None,
            stats_dir: PathBuf::from("stats"),
            device: DeviceSettings::default(),
            humanizer: HumanizerConfig::default(),
            scheduler: SchedulerConfig::default(),
            tasks: TaskSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        serde_json::from_str(&raw).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    /// Build the task registry this configuration enables
    pub fn build_registry(&self) -> Vec<(Task, TaskDescriptor)> {
        let t = &self.tasks;
        vec![
            (
                Task::Gather(GatherTask {
                    resources: t.gather.resources.clone(),
                }),
                t.gather.common.descriptor("gather"),
            ),
            (
                Task::Train(TrainTask {
                    troop: t.train.troop.clone(),
                }),
                t.train.common.descriptor("train"),
            ),
            (
                Task::Research(ResearchTask),
                t.research.descriptor("research"),
            ),
            (Task::Heal(HealTask), t.heal.descriptor("heal")),
            (
                Task::Help(HelpTask {
                    max_helps: t.help.max_helps,
                }),
                t.help.common.descriptor("help"),
            ),
            (Task::Chest(ChestTask), t.chest.descriptor("chest")),
            (
                Task::Quest(QuestTask {
                    max_claims: t.quest.max_claims,
                }),
                t.quest.common.descriptor("quest"),
            ),
            (
                Task::Barbarian(BarbarianTask {
                    level: t.barbarian.level,
                    attack_count: t.barbarian.attack_count,
                }),
                t.barbarian.common.descriptor("barbarian"),
            ),
            (
                Task::Upgrade(UpgradeTask {
                    speedup_chance: t.upgrade.speedup_chance,
                }),
                t.upgrade.common.descriptor("upgrade"),
            ),
        ]
    }
}

/// Device channel settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    pub adb_path: String,
    /// Target a specific device when several are attached
    pub serial: Option<String>,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            adb_path: "adb".to_string(),
            serial: None,
        }
    }
}

/// Scheduler pacing and safety settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Base delay between task executions, in milliseconds
    pub task_delay_ms: u64,
    /// Base delay when no task is eligible, in milliseconds
    pub idle_delay_ms: u64,
    /// Captures to attempt before a template lookup times out
    pub step_retries: u32,
    /// Base delay between capture retries, in milliseconds
    pub retry_delay_ms: u64,
    /// Base delay before each tap, in milliseconds
    pub tap_delay_ms: u64,
    /// Base duration of a swipe gesture, in milliseconds
    pub swipe_duration_ms: u64,
    /// Consecutive failures across tasks before the bot pauses itself
    pub failure_ceiling: u32,
    /// Cycles between license revalidations
    pub license_check_interval: u64,
    /// Shortest planned stint between breaks, in seconds
    pub stint_min_secs: u64,
    /// Longest planned stint between breaks, in seconds
    pub stint_max_secs: u64,
    /// Stint time after which fatigue reaches its cap, in seconds
    pub fatigue_full_after_secs: u64,
    /// Maximum fatigue factor
    pub fatigue_cap: f32,
    /// Poll interval while paused, in milliseconds
    pub pause_poll_ms: u64,
    /// Slice length for interruptible sleeps, in milliseconds
    pub sleep_slice_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            task_delay_ms: 5_000,
            idle_delay_ms: 10_000,
            step_retries: 5,
            retry_delay_ms: 1_000,
            tap_delay_ms: 300,
            swipe_duration_ms: 600,
            failure_ceiling: 10,
            license_check_interval: 20,
            stint_min_secs: 30 * 60,
            stint_max_secs: 2 * 60 * 60,
            fatigue_full_after_secs: 60 * 60,
            fatigue_cap: 1.0,
            pause_poll_ms: 250,
            sleep_slice_ms: 100,
        }
    }
}

impl SchedulerConfig {
    pub fn task_delay(&self) -> Duration {
        Duration::from_millis(self.task_delay_ms)
    }

    pub fn idle_delay(&self) -> Duration {
        Duration::from_millis(self.idle_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn tap_delay(&self) -> Duration {
        Duration::from_millis(self.tap_delay_ms)
    }

    pub fn swipe_duration(&self) -> Duration {
        Duration::from_millis(self.swipe_duration_ms)
    }

    /// Scheduler preset with zero delays, used by tests
    pub fn instant() -> Self {
        Self {
            task_delay_ms: 0,
            idle_delay_ms: 0,
            step_retries: 2,
            retry_delay_ms: 0,
            tap_delay_ms: 0,
            swipe_duration_ms: 0,
            stint_min_secs: u64::MAX / 2_000,
            stint_max_secs: u64::MAX / 1_000,
            pause_poll_ms: 0,
            sleep_slice_ms: 0,
            ..Self::default()
        }
    }
}

/// Shared per-task scheduling knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskCommon {
    pub enabled: bool,
    pub priority: f64,
    pub cooldown_secs: u64,
}

impl Default for TaskCommon {
    fn default() -> Self {
        Self {
            enabled: true,
            priority: 1.0,
            cooldown_secs: 300,
        }
    }
}

impl TaskCommon {
    pub fn descriptor(&self, name: &'static str) -> TaskDescriptor {
        let mut d = TaskDescriptor::new(name, self.priority, Duration::from_secs(self.cooldown_secs));
        d.enabled = self.enabled;
        d
    }
}

/// Per-task configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskSettings {
    pub gather: GatherSettings,
    pub train: TrainSettings,
    pub research: TaskCommon,
    pub heal: TaskCommon,
    pub help: HelpSettings,
    pub chest: TaskCommon,
    pub quest: QuestSettings,
    pub barbarian: BarbarianSettings,
    pub upgrade: UpgradeSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatherSettings {
    #[serde(flatten)]
    pub common: TaskCommon,
    pub resources: Vec<String>,
}

impl Default for GatherSettings {
    fn default() -> Self {
        Self {
            common: TaskCommon::default(),
            resources: GatherTask::default().resources,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainSettings {
    #[serde(flatten)]
    pub common: TaskCommon,
    pub troop: String,
}

impl Default for TrainSettings {
    fn default() -> Self {
        Self {
            common: TaskCommon::default(),
            troop: TrainTask::default().troop,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HelpSettings {
    #[serde(flatten)]
    pub common: TaskCommon,
    pub max_helps: u32,
}

impl Default for HelpSettings {
    fn default() -> Self {
        Self {
            common: TaskCommon::default(),
            max_helps: HelpTask::default().max_helps,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestSettings {
    #[serde(flatten)]
    pub common: TaskCommon,
    pub max_claims: u32,
}

impl Default for QuestSettings {
    fn default() -> Self {
        Self {
            common: TaskCommon::default(),
            max_claims: QuestTask::default().max_claims,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BarbarianSettings {
    #[serde(flatten)]
    pub common: TaskCommon,
    pub level: u32,
    pub attack_count: u32,
}

impl Default for BarbarianSettings {
    fn default() -> Self {
        let task = BarbarianTask::default();
        Self {
            common: TaskCommon {
                // Combat is opt-in
                enabled: false,
                ..TaskCommon::default()
            },
            level: task.level,
            attack_count: task.attack_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeSettings {
    #[serde(flatten)]
    pub common: TaskCommon,
    pub speedup_chance: f64,
}

impl Default for UpgradeSettings {
    fn default() -> Self {
        Self {
            common: TaskCommon::default(),
            speedup_chance: UpgradeTask::default().speedup_chance,
        }
    }
}
