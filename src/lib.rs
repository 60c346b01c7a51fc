//! RoK Warden - automated account keeper for a mobile strategy game
//!
//! This library drives a Rise of Kingdoms instance running in an Android
//! emulator: it captures the screen, locates UI elements by template
//! matching, and taps through routine chores (gathering, training,
//! research, alliance upkeep) on a humanized schedule.
//!
//! ## Anti-Detection
//!
//! The `stealth` module shapes all timing and pointer motion so automated
//! input stays statistically close to a human operator: jittered waits,
//! fatigue slowdown, curved swipes and randomized breaks.
//!
//! There is no global instance; callers construct a [`scheduler::Scheduler`]
//! from a configuration and run it on a thread they own.

pub mod config;
pub mod control;
pub mod device;
pub mod license;
pub mod scheduler;
pub mod stats;
pub mod stealth;
pub mod tasks;
pub mod vision;

pub use config::Settings;
pub use control::{ControlHandle, ControlSignal};
pub use scheduler::{BotState, Scheduler, Session, TaskDescriptor};
pub use tasks::{ActionOutcome, Task};
