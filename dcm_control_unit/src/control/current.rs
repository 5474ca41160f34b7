//! Inner current loop.
//!
//! Per tick, by mode:
//! - `Idle`: outputs off, integrator cleared.
//! - `OpenLoopPwm`: drive the stored PWM reference, no feedback.
//! - `Tune`: follow the internal ±200 mA square wave and record
//!   `(reference, measurement, raw effort)`.
//! - `Track` / `Hold`: follow the shared current setpoint.
//! - undecodable mode byte: brake (both legs full).
//!
//! The integrator is deliberately left unclamped; only the effort is
//! saturated before it reaches the bridge. Tune telemetry carries the
//! effort before saturation.

use dcm_common::consts::{
    CURRENT_LOOP_PERIOD_US, CURRENT_LOOP_PRIORITY, TUNE_AMPLITUDE_MA, TUNE_WAVEFORM_SAMPLES,
};
use dcm_common::control_unit::control::CurrentGains;
use dcm_common::control_unit::state::OperatingMode;

use super::{PeriodicTask, TaskSpec, scale_effort};
use crate::actuator::{DutyPair, HBridge, pwm_reference_from_percent, saturate_effort};
use crate::context::ControlContext;
use crate::hal::{AdcSampler, DutyOutputs};
use crate::sensor::CurrentSensor;
use crate::telemetry::TelemetrySink;

/// One period of the tune square wave: first half low, second half high.
pub const fn tune_waveform() -> [i32; TUNE_WAVEFORM_SAMPLES] {
    let mut wave = [0; TUNE_WAVEFORM_SAMPLES];
    let mut i = 0;
    while i < TUNE_WAVEFORM_SAMPLES {
        wave[i] = if i < TUNE_WAVEFORM_SAMPLES / 2 {
            -TUNE_AMPLITUDE_MA
        } else {
            TUNE_AMPLITUDE_MA
        };
        i += 1;
    }
    wave
}

/// PI law: `(kp·e + ki·eint) / 100`.
#[inline]
pub fn pi_effort(gains: CurrentGains, error: i32, integral: i32) -> i32 {
    scale_effort(gains.kp as i64 * error as i64 + gains.ki as i64 * integral as i64)
}

#[derive(Debug, Clone)]
pub struct CurrentLoopState {
    /// Error accumulator [mA·ticks].
    pub eint: i32,
    /// Last raw (unsaturated) effort.
    pub u: i32,
    /// Open-loop effort used in `OpenLoopPwm`.
    pub pwmref: i32,
    cursor: usize,
    waveform: [i32; TUNE_WAVEFORM_SAMPLES],
}

impl Default for CurrentLoopState {
    fn default() -> Self {
        Self {
            eint: 0,
            u: 0,
            pwmref: 0,
            cursor: 0,
            waveform: tune_waveform(),
        }
    }
}

impl CurrentLoopState {
    /// Index of the next tune reference sample.
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

#[derive(Debug)]
pub struct CurrentLoop<A, D> {
    sensor: CurrentSensor<A>,
    bridge: HBridge<D>,
    state: CurrentLoopState,
    period_us: u32,
}

impl<A: AdcSampler, D: DutyOutputs> CurrentLoop<A, D> {
    pub fn new(adc: A, outputs: D) -> Self {
        Self {
            sensor: CurrentSensor::new(adc),
            bridge: HBridge::new(outputs),
            state: CurrentLoopState::default(),
            period_us: CURRENT_LOOP_PERIOD_US,
        }
    }

    pub fn with_period(mut self, period_us: u32) -> Self {
        self.period_us = period_us;
        self
    }

    pub fn state(&self) -> &CurrentLoopState {
        &self.state
    }

    /// Open-loop duty in percent of full scale; returns the stored effort.
    /// The caller bounds `percent` to −100..=100.
    pub fn set_pwm_percent(&mut self, percent: i32) -> i32 {
        self.state.pwmref = pwm_reference_from_percent(percent);
        self.state.pwmref
    }

    /// Start the next tune run at the first waveform sample.
    pub fn restart_waveform(&mut self) {
        self.state.cursor = 0;
    }

    pub fn sensor_mut(&mut self) -> &mut CurrentSensor<A> {
        &mut self.sensor
    }

    pub fn bridge(&self) -> &HBridge<D> {
        &self.bridge
    }

    /// Measure, run PI on `reference`, drive the saturated effort.
    /// Returns `(measurement, raw effort)`.
    fn regulate(&mut self, reference: i32, gains: CurrentGains) -> (i32, i32) {
        let measurement = self.sensor.current_amps_get();
        let error = reference - measurement;
        self.state.eint = self.state.eint.saturating_add(error);
        let u = pi_effort(gains, error, self.state.eint);
        self.state.u = u;
        self.bridge.drive(saturate_effort(u));
        (measurement, u)
    }
}

impl<A: AdcSampler, D: DutyOutputs> PeriodicTask for CurrentLoop<A, D> {
    fn spec(&self) -> TaskSpec {
        TaskSpec {
            name: "current",
            period_us: self.period_us,
            priority: CURRENT_LOOP_PRIORITY,
        }
    }

    fn tick(&mut self, ctx: &ControlContext, sink: &mut dyn TelemetrySink) {
        let Some(mode) = ctx.mode() else {
            self.bridge.apply(DutyPair::FAILSAFE);
            return;
        };

        match mode {
            OperatingMode::Idle => {
                self.bridge.apply(DutyPair::ZERO);
                self.state.eint = 0;
            }
            OperatingMode::OpenLoopPwm => {
                self.bridge.drive(self.state.pwmref);
            }
            OperatingMode::Tune => {
                let reference = self.state.waveform[self.state.cursor];
                let (measurement, u) = self.regulate(reference, ctx.current_gains());
                self.state.cursor = (self.state.cursor + 1) % TUNE_WAVEFORM_SAMPLES;
                sink.record(reference, measurement, u);
            }
            OperatingMode::Track | OperatingMode::Hold => {
                let reference = ctx.current_reference();
                self.regulate(reference, ctx.current_gains());
            }
        }
    }
}
