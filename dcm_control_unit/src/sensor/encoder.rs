//! Request/response encoder transceiver.
//!
//! The encoder answers a read request with whatever its output register held
//! *before* the request, so the first transaction of a read only primes the
//! register and the second one carries the settled count.

use dcm_common::consts::{
    ENCODER_CMD_FILLER, ENCODER_CMD_READ, ENCODER_CMD_RESET, ENCODER_COUNTS_PER_REV,
    ENCODER_MIDPOINT,
};

use crate::hal::SerialLink;

/// `(raw − 32768) × 360 / 396`, truncating. No wrap handling.
#[inline]
pub const fn counts_to_degrees(raw: u16) -> i32 {
    (raw as i32 - ENCODER_MIDPOINT) * 360 / ENCODER_COUNTS_PER_REV
}

#[derive(Debug)]
pub struct Encoder<L> {
    link: L,
}

impl<L: SerialLink> Encoder<L> {
    pub fn new(link: L) -> Self {
        Self { link }
    }

    /// One exchange: command word out (reply discarded), filler out, reply in.
    pub fn encoder_transceive(&mut self, is_read: bool) -> u16 {
        let command = if is_read {
            ENCODER_CMD_READ
        } else {
            ENCODER_CMD_RESET
        };
        let _ = self.link.transfer(command);
        self.link.transfer(ENCODER_CMD_FILLER)
    }

    /// Settled raw count. Two transactions; the first only primes.
    pub fn read(&mut self) -> u16 {
        self.encoder_transceive(true);
        self.encoder_transceive(true)
    }

    /// Re-center the count at the midpoint (zero degrees).
    pub fn reset(&mut self) {
        self.encoder_transceive(false);
    }

    /// Shaft angle [deg].
    #[inline]
    pub fn angle_from_encoder(&mut self) -> i32 {
        counts_to_degrees(self.read())
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }
}
