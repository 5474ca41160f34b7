//! Cascaded control loops.
//!
//! - [`current`] - inner PI loop on winding current (5 kHz)
//! - [`motion`] - outer PID loop on shaft angle (200 Hz), producing the
//!   current setpoint
//!
//! Both run as [`PeriodicTask`]s. A tick never fails and never allocates.

pub mod current;
pub mod motion;

use dcm_common::consts::GAIN_SCALE;

use crate::context::ControlContext;
use crate::telemetry::TelemetrySink;

/// Static description of a periodic task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSpec {
    pub name: &'static str,
    /// Release period [µs].
    pub period_us: u32,
    /// Higher runs first when releases coincide.
    pub priority: u8,
}

/// A fixed-rate task driven by the cycle runner.
pub trait PeriodicTask {
    fn spec(&self) -> TaskSpec;

    /// One release of the task.
    fn tick(&mut self, ctx: &ControlContext, sink: &mut dyn TelemetrySink);
}

/// `sum / GAIN_SCALE`, truncating toward zero, saturated into `i32`.
#[inline]
pub(crate) fn scale_effort(sum: i64) -> i32 {
    (sum / GAIN_SCALE).clamp(i32::MIN as i64, i32::MAX as i64) as i32
}
