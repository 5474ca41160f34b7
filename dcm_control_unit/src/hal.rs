//! Narrow hardware seams of the control core.
//!
//! The loops never touch registers: they see a converter that produces one
//! sample per call, a half-duplex word link to the encoder, and a pair of
//! PWM compare outputs. Every call blocks until the peripheral completes,
//! with no timeout; a stalled peripheral stalls the calling task.
//!
//! - [`mock`] - recording doubles for unit and integration tests
//! - [`sim`] - a simulated brushed DC motor behind all three seams

pub mod mock;
pub mod sim;

/// Single-channel current-sense converter.
pub trait AdcSampler {
    /// Start one conversion and busy-wait for the code (10-bit, 0..=1023).
    fn sample(&mut self) -> u16;
}

/// Word-wide, half-duplex serial link to the quadrature encoder chip.
pub trait SerialLink {
    /// Clock `word` out and return the word clocked back in.
    fn transfer(&mut self, word: u16) -> u16;
}

/// Complementary H-bridge compare outputs.
pub trait DutyOutputs {
    /// Latch new compare values for both legs (`0..=FULL_DUTY`).
    fn set_duty(&mut self, leg_a: u16, leg_b: u16);
}

/// Anything that must be told that time has passed (a simulated plant).
///
/// Real hardware advances on its own; `()` is the no-op clock.
pub trait PlantClock {
    fn advance(&mut self, dt_us: u32);
}

impl PlantClock for () {
    #[inline]
    fn advance(&mut self, _dt_us: u32) {}
}
