//! Shared controller context.
//!
//! Three kinds of cross-task state live here and nowhere else:
//! - the operating mode, one atomic byte written by the command layer;
//! - the current setpoint, one atomic word written by the motion task;
//! - the gain bank, behind a mutex that is the critical section for every
//!   gain read/write and for bulk save/load.
//!
//! Tasks receive `&ControlContext`; nothing is global.

use std::sync::atomic::{AtomicI32, AtomicU8, Ordering};

use parking_lot::Mutex;

use dcm_common::consts::CURRENT_REF_LIMIT_MA;
use dcm_common::control_unit::control::{CurrentGains, GainBank, MotionGains};
use dcm_common::control_unit::state::OperatingMode;

static_assertions::assert_eq_size!(AtomicU8, u8);
static_assertions::assert_eq_size!(AtomicI32, i32);
static_assertions::assert_impl_all!(ControlContext: Send, Sync);

// ─── Mode ───────────────────────────────────────────────────────────

/// Atomic storage for [`OperatingMode`].
#[derive(Debug)]
pub struct ModeCell(AtomicU8);

impl ModeCell {
    pub const fn new(mode: OperatingMode) -> Self {
        Self(AtomicU8::new(mode as u8))
    }

    /// Decoded mode, `None` if the byte holds no valid mode.
    #[inline]
    pub fn load(&self) -> Option<OperatingMode> {
        OperatingMode::from_u8(self.load_raw())
    }

    #[inline]
    pub fn load_raw(&self) -> u8 {
        self.0.load(Ordering::Acquire)
    }

    #[inline]
    pub fn store(&self, mode: OperatingMode) {
        self.0.store(mode as u8, Ordering::Release);
    }

    /// Store an arbitrary byte. Used to exercise the undecodable-mode paths.
    #[inline]
    pub fn store_raw(&self, raw: u8) {
        self.0.store(raw, Ordering::Release);
    }
}

impl Default for ModeCell {
    fn default() -> Self {
        Self::new(OperatingMode::Idle)
    }
}

// ─── Context ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct ControlContext {
    mode: ModeCell,
    current_ref_ma: AtomicI32,
    gains: Mutex<GainBank>,
}

impl ControlContext {
    /// Idle, zero setpoint, given gains.
    pub fn new(gains: GainBank) -> Self {
        Self {
            mode: ModeCell::default(),
            current_ref_ma: AtomicI32::new(0),
            gains: Mutex::new(gains),
        }
    }

    #[inline]
    pub fn mode(&self) -> Option<OperatingMode> {
        self.mode.load()
    }

    #[inline]
    pub fn set_mode(&self, mode: OperatingMode) {
        self.mode.store(mode);
    }

    pub fn mode_cell(&self) -> &ModeCell {
        &self.mode
    }

    /// Current setpoint [mA].
    #[inline]
    pub fn current_reference(&self) -> i32 {
        self.current_ref_ma.load(Ordering::Relaxed)
    }

    /// Clamp to ±2000 mA, store, and return what was stored.
    #[inline]
    pub fn set_current_reference(&self, milliamps: i32) -> i32 {
        let clamped = milliamps.clamp(-CURRENT_REF_LIMIT_MA, CURRENT_REF_LIMIT_MA);
        self.current_ref_ma.store(clamped, Ordering::Relaxed);
        clamped
    }

    /// Copy of the whole bank, taken under the critical section.
    #[inline]
    pub fn gains(&self) -> GainBank {
        *self.gains.lock()
    }

    #[inline]
    pub fn current_gains(&self) -> CurrentGains {
        self.gains.lock().current
    }

    #[inline]
    pub fn motion_gains(&self) -> MotionGains {
        self.gains.lock().motion
    }

    pub fn set_current_gains(&self, gains: CurrentGains) {
        self.gains.lock().current = gains;
    }

    pub fn set_motion_gains(&self, gains: MotionGains) {
        self.gains.lock().motion = gains;
    }

    /// The lock itself, for bulk persistence.
    pub fn gain_bank(&self) -> &Mutex<GainBank> {
        &self.gains
    }
}
