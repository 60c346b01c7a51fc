//! Stealth and anti-detection module
//!
//! Shapes the bot's timing and pointer motion so automated input is
//! statistically closer to a human operator:
//! - jittered, fatigue-scaled wait durations
//! - curved pointer paths instead of straight lines
//! - imprecise tap positions
//! - randomized long-run break scheduling

pub mod humanize;

pub use humanize::Humanizer;

use serde::{Deserialize, Serialize};

/// Tuning for all humanized behavior
///
/// Every bound here is deliberately configuration rather than a constant:
/// the useful values are product-tuned and vary per game build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HumanizerConfig {
    /// Lower bound of the multiplicative wait jitter
    pub jitter_min: f64,
    /// Upper bound of the multiplicative wait jitter
    pub jitter_max: f64,
    /// Ceiling on the combined fatigue slowdown (2.0 = at most twice as slow)
    pub max_slowdown: f64,
    /// Minimum number of points in a pointer path
    pub path_points_min: usize,
    /// Maximum number of points in a pointer path
    pub path_points_max: usize,
    /// Minimum curve control-point offset, in normalized screen units
    pub curve_offset_min: f32,
    /// Maximum curve control-point offset, in normalized screen units
    pub curve_offset_max: f32,
    /// Maximum tap position offset, in normalized screen units
    pub tap_offset_radius: f32,
    /// Tap hold duration range in milliseconds
    pub tap_duration_ms: (u64, u64),
    /// Break duration range in seconds
    pub break_secs: (u64, u64),
    /// Baseline per-check break probability
    pub break_base_probability: f64,
    /// Additional break probability as the stint approaches its planned end
    pub break_ramp_probability: f64,
}

impl Default for HumanizerConfig {
    fn default() -> Self {
        Self {
            jitter_min: 0.7,
            jitter_max: 1.4,
            max_slowdown: 2.0,
            path_points_min: 8,
            path_points_max: 24,
            curve_offset_min: 0.02,
            curve_offset_max: 0.08,
            tap_offset_radius: 0.008,
            tap_duration_ms: (50, 150),
            break_secs: (30, 120),
            break_base_probability: 0.002,
            break_ramp_probability: 0.08,
        }
    }
}

impl HumanizerConfig {
    /// A config with all delays collapsed, for tests that must not sleep
    pub fn instant() -> Self {
        Self {
            jitter_min: 1.0,
            jitter_max: 1.0,
            max_slowdown: 1.0,
            tap_duration_ms: (0, 0),
            break_secs: (0, 0),
            break_base_probability: 0.0,
            break_ramp_probability: 0.0,
            ..Self::default()
        }
    }
}
