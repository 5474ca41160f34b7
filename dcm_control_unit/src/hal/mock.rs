//! Recording test doubles for the hardware seams.
//!
//! [`EncoderChip`] models the encoder's output register, which answers a
//! read request with the value latched by the *previous* request. Both the
//! mock and the simulated encoder link are built on it.

use dcm_common::consts::{ENCODER_CMD_READ, ENCODER_CMD_RESET, ENCODER_MIDPOINT};

use super::{AdcSampler, DutyOutputs, SerialLink};

/// Word clocked back when nothing is pending (idle-high bus).
pub const BUS_IDLE_WORD: u16 = 0xFFFF;

// ─── Encoder Chip Model ─────────────────────────────────────────────

/// Output-register behaviour of the quadrature decoder.
#[derive(Debug, Clone, Default)]
pub struct EncoderChip {
    register: u16,
    pending: Option<u16>,
}

impl EncoderChip {
    pub const fn new() -> Self {
        Self {
            register: 0,
            pending: None,
        }
    }

    /// One word on the wire. `count` is the live counter, which a reset
    /// command overwrites.
    pub fn exchange(&mut self, word: u16, count: &mut u16) -> u16 {
        let out = self.pending.take().unwrap_or(BUS_IDLE_WORD);
        match word {
            ENCODER_CMD_READ => {
                self.pending = Some(self.register);
                self.register = *count;
            }
            ENCODER_CMD_RESET => {
                *count = ENCODER_MIDPOINT as u16;
                self.register = *count;
            }
            _ => {}
        }
        out
    }
}

// ─── ADC ────────────────────────────────────────────────────────────

/// Converter that replays a fixed pattern of codes.
#[derive(Debug, Clone)]
pub struct MockAdc {
    codes: Vec<u16>,
    next: usize,
    conversions: usize,
}

impl MockAdc {
    /// Always returns `code`.
    pub fn constant(code: u16) -> Self {
        Self::sequence(vec![code])
    }

    /// Cycles through `codes` (an empty list reads as mid-scale).
    pub fn sequence(codes: Vec<u16>) -> Self {
        Self {
            codes,
            next: 0,
            conversions: 0,
        }
    }

    pub fn set_constant(&mut self, code: u16) {
        self.codes.clear();
        self.codes.push(code);
        self.next = 0;
    }

    /// Number of conversions performed so far.
    pub fn conversions(&self) -> usize {
        self.conversions
    }
}

impl AdcSampler for MockAdc {
    fn sample(&mut self) -> u16 {
        self.conversions += 1;
        if self.codes.is_empty() {
            return 512;
        }
        let code = self.codes[self.next % self.codes.len()];
        self.next = (self.next + 1) % self.codes.len();
        code
    }
}

// ─── Encoder ────────────────────────────────────────────────────────

/// Encoder link with a directly settable counter and a transfer log.
#[derive(Debug, Clone)]
pub struct MockEncoder {
    chip: EncoderChip,
    count: u16,
    sent: Vec<u16>,
}

impl MockEncoder {
    pub fn new(count: u16) -> Self {
        Self {
            chip: EncoderChip::new(),
            count,
            sent: Vec::new(),
        }
    }

    pub fn set_count(&mut self, count: u16) {
        self.count = count;
    }

    pub fn count(&self) -> u16 {
        self.count
    }

    /// Every word sent so far, in order.
    pub fn sent(&self) -> &[u16] {
        &self.sent
    }
}

impl SerialLink for MockEncoder {
    fn transfer(&mut self, word: u16) -> u16 {
        self.sent.push(word);
        self.chip.exchange(word, &mut self.count)
    }
}

// ─── H-Bridge ───────────────────────────────────────────────────────

/// Records the compare values last written to each leg.
#[derive(Debug, Clone, Default)]
pub struct MockBridge {
    pub leg_a: u16,
    pub leg_b: u16,
    pub writes: usize,
}

impl MockBridge {
    pub fn legs(&self) -> (u16, u16) {
        (self.leg_a, self.leg_b)
    }
}

impl DutyOutputs for MockBridge {
    fn set_duty(&mut self, leg_a: u16, leg_b: u16) {
        self.leg_a = leg_a;
        self.leg_b = leg_b;
        self.writes += 1;
    }
}
