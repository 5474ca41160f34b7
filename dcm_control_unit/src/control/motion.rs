//! Outer motion loop: PID on shaft angle, output is the current setpoint.
//!
//! `Track` plays the stored trajectory one sample per tick and parks on the
//! final sample; `Hold` regulates to `hold_angle` and keeps the playback
//! cursor at zero. Any other mode leaves everything untouched.
//!
//! The integrator is clamped to ±[`MOTION_INTEGRAL_LIMIT`]; the setpoint
//! write clamps the output to ±2000 mA.

use thiserror::Error;

use dcm_common::consts::{
    MAX_TRAJ_LEN, MOTION_INTEGRAL_LIMIT, MOTION_LOOP_PERIOD_US, MOTION_LOOP_PRIORITY,
};
use dcm_common::control_unit::control::MotionGains;
use dcm_common::control_unit::state::{OperatingMode, ResetMode};

use super::{PeriodicTask, TaskSpec, scale_effort};
use crate::context::ControlContext;
use crate::hal::SerialLink;
use crate::sensor::Encoder;
use crate::telemetry::TelemetrySink;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TrajectoryError {
    #[error("trajectory index {index} out of range (capacity {capacity})")]
    IndexOutOfRange { index: usize, capacity: usize },
}

/// PID law: `(kp·e + ki·eint + kd·edot) / 100`.
#[inline]
pub fn pid_effort(gains: MotionGains, error: i32, integral: i32, derivative: i32) -> i32 {
    scale_effort(
        gains.kp as i64 * error as i64
            + gains.ki as i64 * integral as i64
            + gains.kd as i64 * derivative as i64,
    )
}

// ─── Trajectory ─────────────────────────────────────────────────────

/// Fixed-capacity buffer of reference angles [deg].
///
/// Writing index `i` sets the length to `i + 1`, so loading samples in
/// ascending order after sizing with the final index leaves the full run.
/// Contents beyond the length are kept but never played.
#[derive(Debug, Clone)]
pub struct Trajectory {
    points: [i32; MAX_TRAJ_LEN],
    len: usize,
}

impl Default for Trajectory {
    fn default() -> Self {
        Self {
            points: [0; MAX_TRAJ_LEN],
            len: 0,
        }
    }
}

impl Trajectory {
    pub fn set(&mut self, angle: i32, index: usize) -> Result<(), TrajectoryError> {
        if index >= MAX_TRAJ_LEN {
            return Err(TrajectoryError::IndexOutOfRange {
                index,
                capacity: MAX_TRAJ_LEN,
            });
        }
        self.points[index] = angle;
        self.len = index + 1;
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<i32> {
        self.as_slice().get(index).copied()
    }

    #[inline]
    pub fn last(&self) -> Option<i32> {
        self.as_slice().last().copied()
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.points[..self.len]
    }
}

// ─── Loop ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotionLoopState {
    /// Clamped error accumulator [deg·ticks].
    pub eint: i32,
    /// Error of the previous tick [deg].
    pub eprev: i32,
    /// Next trajectory index to play.
    pub cursor: usize,
    /// Target in `Hold` [deg].
    pub hold_angle: i32,
    /// Last raw (unclamped) output [mA].
    pub u: i32,
}

#[derive(Debug)]
pub struct MotionLoop<L> {
    encoder: Encoder<L>,
    state: MotionLoopState,
    trajectory: Trajectory,
    period_us: u32,
}

impl<L: SerialLink> MotionLoop<L> {
    pub fn new(link: L) -> Self {
        Self {
            encoder: Encoder::new(link),
            state: MotionLoopState::default(),
            trajectory: Trajectory::default(),
            period_us: MOTION_LOOP_PERIOD_US,
        }
    }

    pub fn with_period(mut self, period_us: u32) -> Self {
        self.period_us = period_us;
        self
    }

    pub fn state(&self) -> &MotionLoopState {
        &self.state
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn encoder_mut(&mut self) -> &mut Encoder<L> {
        &mut self.encoder
    }

    /// Store `angle` at `index`; the trajectory length becomes `index + 1`.
    /// Out-of-range indices fail without touching anything.
    pub fn trajectory_set(&mut self, angle: i32, index: usize) -> Result<(), TrajectoryError> {
        self.trajectory.set(angle, index)
    }

    /// Arm a new run: clear cursor and PID memory, pick the hold angle.
    /// Returns the new hold angle.
    pub fn trajectory_reset(&mut self, mode: ResetMode) -> i32 {
        self.state.hold_angle = match mode {
            ResetMode::Now => self.encoder.angle_from_encoder(),
            ResetMode::Last => match self.trajectory.last() {
                Some(angle) => angle,
                None => {
                    tracing::warn!("trajectory empty, holding at the measured angle");
                    self.encoder.angle_from_encoder()
                }
            },
            ResetMode::Angle(angle) => angle,
        };
        self.state.eprev = 0;
        self.state.eint = 0;
        self.state.cursor = 0;
        self.state.hold_angle
    }

    fn regulate(&mut self, ctx: &ControlContext, reference: i32, sink: &mut dyn TelemetrySink) {
        let gains = ctx.motion_gains();
        let measurement = self.encoder.angle_from_encoder();
        let error = reference.saturating_sub(measurement);
        let derivative = error.saturating_sub(self.state.eprev);
        self.state.eint = self
            .state
            .eint
            .saturating_add(error)
            .clamp(-MOTION_INTEGRAL_LIMIT, MOTION_INTEGRAL_LIMIT);
        let u = pid_effort(gains, error, self.state.eint, derivative);
        self.state.u = u;
        ctx.set_current_reference(u);
        sink.record(reference, measurement, u);
        self.state.eprev = error;
    }
}

impl<L: SerialLink> PeriodicTask for MotionLoop<L> {
    fn spec(&self) -> TaskSpec {
        TaskSpec {
            name: "motion",
            period_us: self.period_us,
            priority: MOTION_LOOP_PRIORITY,
        }
    }

    fn tick(&mut self, ctx: &ControlContext, sink: &mut dyn TelemetrySink) {
        match ctx.mode() {
            Some(OperatingMode::Track) => {
                let reference = self
                    .trajectory
                    .get(self.state.cursor)
                    .unwrap_or(self.state.hold_angle);
                self.regulate(ctx, reference, sink);
                if self.state.cursor + 1 < self.trajectory.len() {
                    self.state.cursor += 1;
                }
            }
            Some(OperatingMode::Hold) => {
                let reference = self.state.hold_angle;
                self.regulate(ctx, reference, sink);
                self.state.cursor = 0;
            }
            _ => {}
        }
    }
}
