//! Sensor acquisition: oversampled current sense and encoder angle.

pub mod adc;
pub mod encoder;

pub use adc::{CurrentSensor, raw_to_milliamps};
pub use encoder::{Encoder, counts_to_degrees};
