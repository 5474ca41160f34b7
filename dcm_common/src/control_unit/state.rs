//! Operating-mode enum and trajectory reset selection.
//!
//! `OperatingMode` is `#[repr(u8)]` so it fits in a single atomic byte shared
//! between the external command layer and both periodic tasks.

use serde::{Deserialize, Serialize};

/// Process-wide operating mode, gating the branch each loop executes.
///
/// `Track` and `Tune` are transient: they are only valid while the command
/// that selected them is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OperatingMode {
    /// Outputs off, current integrator cleared.
    Idle = 0,
    /// Fixed duty from the PWM reference, no feedback.
    OpenLoopPwm = 1,
    /// Current loop follows the internal square wave and streams samples.
    Tune = 2,
    /// Motion loop plays back the stored trajectory.
    Track = 3,
    /// Motion loop regulates to the hold angle.
    Hold = 4,
}

impl OperatingMode {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Idle),
            1 => Some(Self::OpenLoopPwm),
            2 => Some(Self::Tune),
            3 => Some(Self::Track),
            4 => Some(Self::Hold),
            _ => None,
        }
    }

    /// Modes that must never outlive the command that set them.
    #[inline]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::Track | Self::Tune)
    }
}

impl Default for OperatingMode {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "IDLE",
            Self::OpenLoopPwm => "PWM",
            Self::Tune => "TUNE",
            Self::Track => "TRACK",
            Self::Hold => "HOLD",
        };
        f.write_str(name)
    }
}

static_assertions::assert_eq_size!(OperatingMode, u8);

/// Source of the hold angle when a trajectory run is (re)armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResetMode {
    /// Hold where the shaft is right now.
    Now,
    /// Hold at the final stored trajectory sample.
    Last,
    /// Hold at an explicit angle [deg].
    Angle(i32),
}
