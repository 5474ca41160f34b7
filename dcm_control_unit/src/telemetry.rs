//! Telemetry sink: `(reference, measurement, effort)` triples from the loops.
//!
//! A streaming run asks for exactly `n` samples. [`StreamRecorder`] takes
//! the first `n` records after [`StreamRecorder::begin`] and drops the rest,
//! so the command layer can wait for completion.

use dcm_common::consts::MAX_STREAM_SAMPLES;
use dcm_common::control_unit::control::Sample;

/// Consumer of loop telemetry. Called from task context; must not block.
pub trait TelemetrySink {
    fn record(&mut self, reference: i32, measurement: i32, effort: i32);
}

impl<T: TelemetrySink + ?Sized> TelemetrySink for &mut T {
    #[inline]
    fn record(&mut self, reference: i32, measurement: i32, effort: i32) {
        (**self).record(reference, measurement, effort);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    #[inline]
    fn record(&mut self, _reference: i32, _measurement: i32, _effort: i32) {}
}

/// Bounded capture of one streaming run.
#[derive(Debug, Default, Clone)]
pub struct StreamRecorder {
    requested: usize,
    samples: Vec<Sample>,
}

impl StreamRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm for `n` samples. Storage is reserved here, not in task context,
    /// up to [`MAX_STREAM_SAMPLES`].
    pub fn begin(&mut self, n: usize) {
        self.samples.clear();
        self.samples.reserve(n.min(MAX_STREAM_SAMPLES));
        self.requested = n;
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.samples.len() >= self.requested
    }

    pub fn requested(&self) -> usize {
        self.requested
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Hand the captured samples out and disarm.
    pub fn take(&mut self) -> Vec<Sample> {
        self.requested = 0;
        std::mem::take(&mut self.samples)
    }
}

impl TelemetrySink for StreamRecorder {
    #[inline]
    fn record(&mut self, reference: i32, measurement: i32, effort: i32) {
        if self.samples.len() < self.requested {
            self.samples.push(Sample::new(reference, measurement, effort));
        }
    }
}
