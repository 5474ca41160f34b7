//! Gain sets for both loops and the telemetry sample triple.
//!
//! Gains are integers scaled by [`GAIN_SCALE`](crate::consts::GAIN_SCALE):
//! a `kp` of 100 means one unit of output per unit of error.

use serde::{Deserialize, Serialize};

/// PI gains of the current loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentGains {
    pub kp: i32,
    pub ki: i32,
}

impl Default for CurrentGains {
    fn default() -> Self {
        Self { kp: 100, ki: 100 }
    }
}

/// PID gains of the motion loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionGains {
    pub kp: i32,
    pub ki: i32,
    pub kd: i32,
}

impl Default for MotionGains {
    fn default() -> Self {
        Self {
            kp: 700,
            ki: 10,
            kd: 20000,
        }
    }
}

/// Every tunable gain of the controller.
///
/// Lives behind the context's critical section; tasks copy it once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GainBank {
    #[serde(default)]
    pub current: CurrentGains,
    #[serde(default)]
    pub motion: MotionGains,
}

/// One telemetry record: what was asked for, what was measured, what was
/// commanded.
///
/// Current loop: mA, mA, duty units. Motion loop: deg, deg, mA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub reference: i32,
    pub measurement: i32,
    pub effort: i32,
}

impl Sample {
    #[inline]
    pub const fn new(reference: i32, measurement: i32, effort: i32) -> Self {
        Self {
            reference,
            measurement,
            effort,
        }
    }

    /// `reference − measurement`.
    #[inline]
    pub const fn error(&self) -> i32 {
        self.reference - self.measurement
    }
}
