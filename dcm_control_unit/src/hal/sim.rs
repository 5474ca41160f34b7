//! Simulated brushed DC motor behind the three hardware seams.
//!
//! Electrical: `L·di/dt = V − R·i − Ke·ω`, with `V` the supply scaled by the
//! leg difference. Mechanical (output shaft): `J·dω/dt = Kt·i − b·ω`.
//! Integrated with explicit Euler over `substeps` slices per
//! [`PlantClock::advance`] call. Sensors quantize like the real board: a
//! 10-bit current converter and a 396-count encoder.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use dcm_common::config::ConfigError;
use dcm_common::consts::{
    ADC_FULL_SCALE, ADC_MIDSCALE, CURRENT_SENSE_RANGE_MA, ENCODER_CMD_RESET,
    ENCODER_COUNTS_PER_REV, ENCODER_MIDPOINT, FULL_DUTY,
};

use super::mock::EncoderChip;
use super::{AdcSampler, DutyOutputs, PlantClock, SerialLink};

// ─── Plant Parameters ───────────────────────────────────────────────

/// Motor and supply parameters, `[plant]` table of the config file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantConfig {
    /// Bridge supply [V].
    pub supply_voltage_v: f64,
    /// Winding resistance [Ω].
    pub resistance_ohm: f64,
    /// Winding inductance [H].
    pub inductance_h: f64,
    /// Torque and back-EMF constant at the output shaft [N·m/A = V·s/rad].
    pub torque_constant: f64,
    /// Reflected inertia [kg·m²].
    pub inertia: f64,
    /// Viscous friction [N·m·s/rad].
    pub damping: f64,
    /// Euler slices per advance.
    pub substeps: u32,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            supply_voltage_v: 6.0,
            resistance_ohm: 3.0,
            inductance_h: 0.002,
            torque_constant: 0.4,
            inertia: 0.004,
            damping: 0.02,
            substeps: 10,
        }
    }
}

impl PlantConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("supply_voltage_v", self.supply_voltage_v),
            ("resistance_ohm", self.resistance_ohm),
            ("inductance_h", self.inductance_h),
            ("torque_constant", self.torque_constant),
            ("inertia", self.inertia),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::ValidationError(format!(
                    "plant.{name} must be positive, got {value}"
                )));
            }
        }
        if !(self.damping.is_finite() && self.damping >= 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "plant.damping must be non-negative, got {}",
                self.damping
            )));
        }
        if self.substeps == 0 {
            return Err(ConfigError::ValidationError(
                "plant.substeps must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ─── Plant State ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
struct MotorState {
    current_a: f64,
    speed_rad_s: f64,
    angle_rad: f64,
    /// Angle at the last encoder reset.
    zero_rad: f64,
    leg_a: u16,
    leg_b: u16,
}

impl MotorState {
    fn adc_code(&self) -> u16 {
        let ma = self.current_a * 1000.0;
        let code =
            ADC_MIDSCALE as f64 + (ma * ADC_MIDSCALE as f64 / CURRENT_SENSE_RANGE_MA as f64).round();
        code.clamp(0.0, (ADC_FULL_SCALE - 1) as f64) as u16
    }

    fn encoder_count(&self) -> u16 {
        let deg = (self.angle_rad - self.zero_rad).to_degrees();
        let counts = (deg * ENCODER_COUNTS_PER_REV as f64 / 360.0).round();
        (ENCODER_MIDPOINT as f64 + counts).clamp(0.0, u16::MAX as f64) as u16
    }
}

/// Observable plant quantities, in engineering units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MotorSnapshot {
    pub current_ma: f64,
    pub speed_deg_s: f64,
    pub angle_deg: f64,
    pub legs: (u16, u16),
}

/// Handle to one simulated motor; hands out the per-seam endpoints.
#[derive(Debug, Clone)]
pub struct SimMotor {
    config: PlantConfig,
    state: Arc<Mutex<MotorState>>,
}

impl SimMotor {
    pub fn new(config: PlantConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(MotorState::default())),
        }
    }

    pub fn adc(&self) -> SimAdc {
        SimAdc {
            state: Arc::clone(&self.state),
        }
    }

    pub fn bridge(&self) -> SimBridge {
        SimBridge {
            state: Arc::clone(&self.state),
        }
    }

    pub fn encoder(&self) -> SimEncoder {
        SimEncoder {
            state: Arc::clone(&self.state),
            chip: EncoderChip::new(),
        }
    }

    pub fn clock(&self) -> SimClock {
        SimClock {
            config: self.config,
            state: Arc::clone(&self.state),
        }
    }

    /// Place the shaft at `deg` relative to the encoder zero.
    pub fn set_angle_deg(&self, deg: f64) {
        let mut s = self.state.lock();
        s.angle_rad = s.zero_rad + deg.to_radians();
    }

    pub fn snapshot(&self) -> MotorSnapshot {
        let s = self.state.lock();
        MotorSnapshot {
            current_ma: s.current_a * 1000.0,
            speed_deg_s: s.speed_rad_s.to_degrees(),
            angle_deg: (s.angle_rad - s.zero_rad).to_degrees(),
            legs: (s.leg_a, s.leg_b),
        }
    }
}

// ─── Seam Endpoints ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SimAdc {
    state: Arc<Mutex<MotorState>>,
}

impl AdcSampler for SimAdc {
    fn sample(&mut self) -> u16 {
        self.state.lock().adc_code()
    }
}

#[derive(Debug, Clone)]
pub struct SimBridge {
    state: Arc<Mutex<MotorState>>,
}

impl DutyOutputs for SimBridge {
    fn set_duty(&mut self, leg_a: u16, leg_b: u16) {
        let mut s = self.state.lock();
        s.leg_a = leg_a;
        s.leg_b = leg_b;
    }
}

#[derive(Debug, Clone)]
pub struct SimEncoder {
    state: Arc<Mutex<MotorState>>,
    chip: EncoderChip,
}

impl SerialLink for SimEncoder {
    fn transfer(&mut self, word: u16) -> u16 {
        let mut s = self.state.lock();
        let mut count = s.encoder_count();
        let out = self.chip.exchange(word, &mut count);
        if word == ENCODER_CMD_RESET {
            s.zero_rad = s.angle_rad;
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct SimClock {
    config: PlantConfig,
    state: Arc<Mutex<MotorState>>,
}

impl PlantClock for SimClock {
    fn advance(&mut self, dt_us: u32) {
        let c = &self.config;
        let steps = c.substeps.max(1);
        let dt = dt_us as f64 * 1e-6 / steps as f64;
        let mut s = self.state.lock();
        let volts = c.supply_voltage_v * (s.leg_a as f64 - s.leg_b as f64) / FULL_DUTY as f64;
        for _ in 0..steps {
            let di = (volts - c.resistance_ohm * s.current_a - c.torque_constant * s.speed_rad_s)
                / c.inductance_h;
            let dw = (c.torque_constant * s.current_a - c.damping * s.speed_rad_s) / c.inertia;
            s.current_a += di * dt;
            s.speed_rad_s += dw * dt;
            s.angle_rad += s.speed_rad_s * dt;
        }
    }
}
