//! System-wide constants for the DC motor control workspace.
//!
//! Single source of truth for the numeric contracts between the loops,
//! the actuator and the sensors. Imported by all crates.

// ─── Actuator ───────────────────────────────────────────────────────

/// Full-scale PWM compare value (duty units).
pub const FULL_DUTY: i32 = 1999;

/// Saturation bound of the current-loop effort. Effort units are duty units.
pub const EFFORT_LIMIT: i32 = FULL_DUTY;

// ─── Current Loop ───────────────────────────────────────────────────

/// Bound on the shared current setpoint [mA].
pub const CURRENT_REF_LIMIT_MA: i32 = 2000;

/// Number of samples in one tune square-wave period.
pub const TUNE_WAVEFORM_SAMPLES: usize = 50;

/// Tune square-wave amplitude [mA].
pub const TUNE_AMPLITUDE_MA: i32 = 200;

/// Divisor applied to every `kp·e + ki·eint (+ kd·edot)` sum.
pub const GAIN_SCALE: i64 = 100;

// ─── Motion Loop ────────────────────────────────────────────────────

/// Anti-windup clamp of the motion-loop integrator [deg·ticks].
pub const MOTION_INTEGRAL_LIMIT: i32 = 200;

/// Trajectory buffer capacity (samples at the motion rate).
pub const MAX_TRAJ_LEN: usize = 1000;

// ─── Telemetry ──────────────────────────────────────────────────────

/// Longest streaming run accepted from the command layer (20 s of tune).
pub const MAX_STREAM_SAMPLES: usize = 100_000;

// ─── Sensors ────────────────────────────────────────────────────────

/// Conversions averaged per current reading.
pub const ADC_OVERSAMPLE: u32 = 20;

/// Number of codes of the 10-bit current converter.
pub const ADC_FULL_SCALE: u16 = 1024;

/// Converter code that corresponds to zero current.
pub const ADC_MIDSCALE: i32 = 512;

/// Current [mA] at either end of the converter range.
pub const CURRENT_SENSE_RANGE_MA: i32 = 1500;

/// Encoder count at the zero angle (value after reset).
pub const ENCODER_MIDPOINT: i32 = 32768;

/// Encoder counts per output revolution.
pub const ENCODER_COUNTS_PER_REV: i32 = 396;

/// Encoder command word: reset the count to [`ENCODER_MIDPOINT`].
pub const ENCODER_CMD_RESET: u16 = 0;

/// Encoder command word: latch the count into the output register.
pub const ENCODER_CMD_READ: u16 = 1;

/// Filler word clocked out to shift the response back.
pub const ENCODER_CMD_FILLER: u16 = 5;

// ─── Gain Persistence ───────────────────────────────────────────────

/// Capacity of each gain kind (integer and float) in the registry.
pub const MAX_REGISTERED_GAINS: usize = 10;

/// Value stored in slot 0 when a valid gain image is present.
pub const GAIN_SENTINEL: u32 = 0xDEAD;

/// Number of persistent slots required by a full registry.
pub const GAIN_STORAGE_SLOTS: usize = 1 + 2 * MAX_REGISTERED_GAINS;

// ─── Task Rates ─────────────────────────────────────────────────────

/// Current loop period [µs] (5 kHz).
pub const CURRENT_LOOP_PERIOD_US: u32 = 200;

/// Motion loop period [µs] (200 Hz).
pub const MOTION_LOOP_PERIOD_US: u32 = 5000;

/// Current loop priority (higher preempts lower).
pub const CURRENT_LOOP_PRIORITY: u8 = 7;

/// Motion loop priority.
pub const MOTION_LOOP_PRIORITY: u8 = 6;

/// Default gain snapshot file used by the host runtime.
pub const DEFAULT_STORAGE_PATH: &str = "dcm_gains.json";

static_assertions::const_assert!(EFFORT_LIMIT <= FULL_DUTY);
static_assertions::const_assert!(MOTION_LOOP_PERIOD_US % CURRENT_LOOP_PERIOD_US == 0);
static_assertions::const_assert!(CURRENT_LOOP_PRIORITY > MOTION_LOOP_PRIORITY);
static_assertions::const_assert!(MAX_STREAM_SAMPLES > MAX_TRAJ_LEN);
