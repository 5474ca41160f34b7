//! Prelude module for common re-exports.
//!
//! ```rust
//! use dcm_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::control_unit::config::ControlUnitConfig;

// ─── Control Types ──────────────────────────────────────────────────
pub use crate::control_unit::control::{CurrentGains, GainBank, MotionGains, Sample};
pub use crate::control_unit::state::{OperatingMode, ResetMode};

// ─── Numeric Contracts ──────────────────────────────────────────────
pub use crate::consts::{
    CURRENT_REF_LIMIT_MA, EFFORT_LIMIT, FULL_DUTY, MAX_TRAJ_LEN, MOTION_INTEGRAL_LIMIT,
};
