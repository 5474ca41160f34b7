//! Controller section of the configuration file.
//!
//! Numeric parameters have const `MIN`/`MAX` bounds checked by
//! [`ControlUnitConfig::validate`]. Every field has a serde default, so an
//! empty `[control]` table yields the compiled-in controller.

use serde::{Deserialize, Serialize};

use crate::consts::{CURRENT_LOOP_PERIOD_US, DEFAULT_STORAGE_PATH, MOTION_LOOP_PERIOD_US};

use super::control::GainBank;

/// Shortest accepted current-loop period [µs].
pub const CURRENT_PERIOD_US_MIN: u32 = 50;
/// Longest accepted current-loop period [µs].
pub const CURRENT_PERIOD_US_MAX: u32 = 10_000;
/// Shortest accepted motion-loop period [µs].
pub const MOTION_PERIOD_US_MIN: u32 = 1_000;
/// Longest accepted motion-loop period [µs].
pub const MOTION_PERIOD_US_MAX: u32 = 100_000;
/// Upper bound on any single gain.
pub const GAIN_MAX: i32 = 1_000_000;

/// Controller configuration.
///
/// # TOML Example
///
/// ```toml
/// [control]
/// current_period_us = 200
/// motion_period_us = 5000
/// storage_path = "dcm_gains.json"
///
/// [control.gains.motion]
/// kp = 700
/// ki = 10
/// kd = 20000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlUnitConfig {
    /// Current loop period [µs] (default: 200 = 5 kHz).
    #[serde(default = "default_current_period_us")]
    pub current_period_us: u32,

    /// Motion loop period [µs] (default: 5000 = 200 Hz).
    #[serde(default = "default_motion_period_us")]
    pub motion_period_us: u32,

    /// Gains used until a saved image is loaded.
    #[serde(default)]
    pub gains: GainBank,

    /// Gain snapshot file of the host runtime.
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
}

fn default_current_period_us() -> u32 {
    CURRENT_LOOP_PERIOD_US
}
fn default_motion_period_us() -> u32 {
    MOTION_LOOP_PERIOD_US
}
fn default_storage_path() -> String {
    DEFAULT_STORAGE_PATH.to_string()
}

impl Default for ControlUnitConfig {
    fn default() -> Self {
        Self {
            current_period_us: default_current_period_us(),
            motion_period_us: default_motion_period_us(),
            gains: GainBank::default(),
            storage_path: default_storage_path(),
        }
    }
}

impl ControlUnitConfig {
    /// Motion ticks happen every `ratio()` current ticks.
    #[inline]
    pub fn ratio(&self) -> u32 {
        self.motion_period_us / self.current_period_us.max(1)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.current_period_us < CURRENT_PERIOD_US_MIN
            || self.current_period_us > CURRENT_PERIOD_US_MAX
        {
            return Err(format!(
                "current_period_us {} out of range [{}, {}]",
                self.current_period_us, CURRENT_PERIOD_US_MIN, CURRENT_PERIOD_US_MAX
            ));
        }
        if self.motion_period_us < MOTION_PERIOD_US_MIN
            || self.motion_period_us > MOTION_PERIOD_US_MAX
        {
            return Err(format!(
                "motion_period_us {} out of range [{}, {}]",
                self.motion_period_us, MOTION_PERIOD_US_MIN, MOTION_PERIOD_US_MAX
            ));
        }
        if self.motion_period_us % self.current_period_us != 0 {
            return Err(format!(
                "motion_period_us {} is not a multiple of current_period_us {}",
                self.motion_period_us, self.current_period_us
            ));
        }
        let g = &self.gains;
        for (name, value) in [
            ("current.kp", g.current.kp),
            ("current.ki", g.current.ki),
            ("motion.kp", g.motion.kp),
            ("motion.ki", g.motion.ki),
            ("motion.kd", g.motion.kd),
        ] {
            if !(0..=GAIN_MAX).contains(&value) {
                return Err(format!("gain {name} = {value} out of range [0, {GAIN_MAX}]"));
            }
        }
        if self.storage_path.is_empty() {
            return Err("storage_path cannot be empty".to_string());
        }
        Ok(())
    }
}
