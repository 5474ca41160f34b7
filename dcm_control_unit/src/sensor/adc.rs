//! Oversampled current-sense reading.
//!
//! One reading is [`ADC_OVERSAMPLE`] back-to-back conversions averaged with
//! truncating integer division. The mean is mapped affinely to milliamps:
//! mid-scale is 0 mA, the ends of the range are ±1500 mA.

use dcm_common::consts::{ADC_MIDSCALE, ADC_OVERSAMPLE, CURRENT_SENSE_RANGE_MA};

use crate::hal::AdcSampler;

/// Map an averaged converter code to milliamps (truncating toward zero).
#[inline]
pub const fn raw_to_milliamps(raw: u16) -> i32 {
    (raw as i32 - ADC_MIDSCALE) * CURRENT_SENSE_RANGE_MA / ADC_MIDSCALE
}

/// Current sensor on top of a converter.
#[derive(Debug)]
pub struct CurrentSensor<A> {
    adc: A,
}

impl<A: AdcSampler> CurrentSensor<A> {
    pub fn new(adc: A) -> Self {
        Self { adc }
    }

    /// Mean of [`ADC_OVERSAMPLE`] conversions. Blocks for all of them.
    pub fn read_current_raw(&mut self) -> u16 {
        let mut sum: u32 = 0;
        for _ in 0..ADC_OVERSAMPLE {
            sum += u32::from(self.adc.sample());
        }
        (sum / ADC_OVERSAMPLE) as u16
    }

    /// Averaged current [mA].
    #[inline]
    pub fn current_amps_get(&mut self) -> i32 {
        raw_to_milliamps(self.read_current_raw())
    }

    pub fn adc(&self) -> &A {
        &self.adc
    }

    pub fn adc_mut(&mut self) -> &mut A {
        &mut self.adc
    }
}
