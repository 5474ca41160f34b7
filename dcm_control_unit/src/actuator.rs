//! Signed effort → complementary H-bridge duty pair.
//!
//! | effort | leg A        | leg B        |
//! |--------|--------------|--------------|
//! | v > 0  | FULL         | FULL − v     |
//! | v < 0  | FULL + v     | FULL         |
//! | 0      | 0            | 0            |
//!
//! The driven magnitude is the leg difference, so the map is antisymmetric
//! under swapping legs. Both legs at FULL brakes the motor and is the
//! fail-safe output.

use dcm_common::consts::{EFFORT_LIMIT, FULL_DUTY};

use crate::hal::DutyOutputs;

/// Compare values for both bridge legs, each in `0..=FULL_DUTY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyPair {
    pub leg_a: u16,
    pub leg_b: u16,
}

impl DutyPair {
    /// Outputs off.
    pub const ZERO: Self = Self { leg_a: 0, leg_b: 0 };
    /// Both legs full (brake).
    pub const FAILSAFE: Self = Self {
        leg_a: FULL_DUTY as u16,
        leg_b: FULL_DUTY as u16,
    };

    /// `leg_a − leg_b`, the effort this pair drives.
    #[inline]
    pub const fn differential(&self) -> i32 {
        self.leg_a as i32 - self.leg_b as i32
    }
}

/// Clamp a raw effort to `±EFFORT_LIMIT`.
#[inline]
pub const fn saturate_effort(u: i32) -> i32 {
    if u > EFFORT_LIMIT {
        EFFORT_LIMIT
    } else if u < -EFFORT_LIMIT {
        -EFFORT_LIMIT
    } else {
        u
    }
}

/// Map an effort to a duty pair. Out-of-range input is clamped first.
#[inline]
pub const fn map_effort(v: i32) -> DutyPair {
    let v = if v > FULL_DUTY {
        FULL_DUTY
    } else if v < -FULL_DUTY {
        -FULL_DUTY
    } else {
        v
    };
    if v > 0 {
        DutyPair {
            leg_a: FULL_DUTY as u16,
            leg_b: (FULL_DUTY - v) as u16,
        }
    } else if v < 0 {
        DutyPair {
            leg_a: (FULL_DUTY + v) as u16,
            leg_b: FULL_DUTY as u16,
        }
    } else {
        DutyPair::ZERO
    }
}

/// Open-loop duty percentage (−100..=100) → effort, truncating.
#[inline]
pub const fn pwm_reference_from_percent(percent: i32) -> i32 {
    percent * FULL_DUTY / 100
}

/// H-bridge driven through a pair of compare outputs.
#[derive(Debug)]
pub struct HBridge<D> {
    outputs: D,
    last: DutyPair,
}

impl<D: DutyOutputs> HBridge<D> {
    pub fn new(outputs: D) -> Self {
        Self {
            outputs,
            last: DutyPair::ZERO,
        }
    }

    #[inline]
    pub fn apply(&mut self, pair: DutyPair) {
        self.outputs.set_duty(pair.leg_a, pair.leg_b);
        self.last = pair;
    }

    /// Map and apply an effort.
    #[inline]
    pub fn drive(&mut self, effort: i32) {
        self.apply(map_effort(effort));
    }

    /// Pair most recently written.
    pub fn last(&self) -> DutyPair {
        self.last
    }

    pub fn outputs(&self) -> &D {
        &self.outputs
    }
}
