//! Registry of persistable gains.
//!
//! Each entry names one field of a gain bank `B` and carries plain `fn`
//! accessors for it. Integer and float entries are kept in separate lists of
//! [`MAX_REGISTERED_GAINS`] each, in registration order.
//!
//! Slot layout written by [`GainRegistry::save_all`]:
//!
//! ```text
//! slot 0                      sentinel 0xDEAD
//! slots 1 ..= n_int           integer gains (two's-complement bits)
//! slots n_int+1 ..= n_int+n_f float gains (IEEE-754 bits)
//! ```
//!
//! Save and load hold the bank's lock for the whole transfer, so a task
//! never observes a half-restored bank.

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use dcm_common::consts::{GAIN_SENTINEL, MAX_REGISTERED_GAINS};
use dcm_common::control_unit::control::GainBank;

use super::storage::SlotStorage;

/// Integer gain descriptor.
pub struct IntGain<B> {
    pub name: &'static str,
    pub get: fn(&B) -> i32,
    pub set: fn(&mut B, i32),
}

/// Float gain descriptor.
pub struct FloatGain<B> {
    pub name: &'static str,
    pub get: fn(&B) -> f32,
    pub set: fn(&mut B, f32),
}

impl<B> Clone for IntGain<B> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<B> Copy for IntGain<B> {}

impl<B> Clone for FloatGain<B> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<B> Copy for FloatGain<B> {}

/// A gain of either kind, as passed to [`GainRegistry::register`].
pub enum GainCell<B> {
    Int(IntGain<B>),
    Float(FloatGain<B>),
}

impl<B> GainCell<B> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Int(g) => g.name,
            Self::Float(g) => g.name,
        }
    }
}

pub struct GainRegistry<B> {
    ints: heapless::Vec<IntGain<B>, MAX_REGISTERED_GAINS>,
    floats: heapless::Vec<FloatGain<B>, MAX_REGISTERED_GAINS>,
}

impl<B> Default for GainRegistry<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> std::fmt::Debug for GainRegistry<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GainRegistry")
            .field("ints", &self.ints.iter().map(|g| g.name).collect::<Vec<_>>())
            .field("floats", &self.floats.iter().map(|g| g.name).collect::<Vec<_>>())
            .finish()
    }
}

impl<B> GainRegistry<B> {
    pub const fn new() -> Self {
        Self {
            ints: heapless::Vec::new(),
            floats: heapless::Vec::new(),
        }
    }

    /// Append a descriptor. Returns `false` (and changes nothing) when that
    /// kind's list is already full.
    pub fn register(&mut self, cell: GainCell<B>) -> bool {
        let name = cell.name();
        let accepted = match cell {
            GainCell::Int(g) => self.ints.push(g).is_ok(),
            GainCell::Float(g) => self.floats.push(g).is_ok(),
        };
        if !accepted {
            warn!("Gain registry full, dropping '{name}'");
        }
        accepted
    }

    pub fn int_count(&self) -> usize {
        self.ints.len()
    }

    pub fn float_count(&self) -> usize {
        self.floats.len()
    }

    /// Registered names, integers first.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.ints
            .iter()
            .map(|g| g.name)
            .chain(self.floats.iter().map(|g| g.name))
    }

    /// Write the sentinel and every registered gain.
    pub fn save_all<S: SlotStorage + ?Sized>(&self, bank: &Mutex<B>, storage: &mut S) {
        let bank = bank.lock();
        storage.write(GAIN_SENTINEL, 0);
        let n_int = self.ints.len();
        for (i, g) in self.ints.iter().enumerate() {
            storage.write((g.get)(&bank) as u32, i + 1);
        }
        for (i, g) in self.floats.iter().enumerate() {
            storage.write((g.get)(&bank).to_bits(), i + 1 + n_int);
        }
        info!(
            "Saved {} integer and {} float gains",
            n_int,
            self.floats.len()
        );
    }

    /// Restore every registered gain if slot 0 holds the sentinel.
    /// Returns whether anything was restored.
    pub fn load_all<S: SlotStorage + ?Sized>(&self, bank: &Mutex<B>, storage: &S) -> bool {
        let mut bank = bank.lock();
        if storage.read(0) != GAIN_SENTINEL {
            debug!("No saved gains, keeping defaults");
            return false;
        }
        let n_int = self.ints.len();
        for (i, g) in self.ints.iter().enumerate() {
            (g.set)(&mut bank, storage.read(i + 1) as i32);
        }
        for (i, g) in self.floats.iter().enumerate() {
            (g.set)(&mut bank, f32::from_bits(storage.read(i + 1 + n_int)));
        }
        info!(
            "Loaded {} integer and {} float gains",
            n_int,
            self.floats.len()
        );
        true
    }
}

/// Registry over the controller's gain bank, in boot order: current loop
/// first, then motion loop.
pub fn bank_registry() -> GainRegistry<GainBank> {
    let mut reg = GainRegistry::new();
    let cells = [
        IntGain {
            name: "current.kp",
            get: |b: &GainBank| b.current.kp,
            set: |b: &mut GainBank, v| b.current.kp = v,
        },
        IntGain {
            name: "current.ki",
            get: |b: &GainBank| b.current.ki,
            set: |b: &mut GainBank, v| b.current.ki = v,
        },
        IntGain {
            name: "motion.kp",
            get: |b: &GainBank| b.motion.kp,
            set: |b: &mut GainBank, v| b.motion.kp = v,
        },
        IntGain {
            name: "motion.ki",
            get: |b: &GainBank| b.motion.ki,
            set: |b: &mut GainBank, v| b.motion.ki = v,
        },
        IntGain {
            name: "motion.kd",
            get: |b: &GainBank| b.motion.kd,
            set: |b: &mut GainBank, v| b.motion.kd = v,
        },
    ];
    for cell in cells {
        reg.register(GainCell::Int(cell));
    }
    reg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gains::storage::{ERASED_WORD, MemorySlots};
    use dcm_common::control_unit::control::{CurrentGains, MotionGains};

    #[derive(Debug, Default, Clone, Copy, PartialEq)]
    struct Mixed {
        count: i32,
        scale: f32,
    }

    fn mixed_registry() -> GainRegistry<Mixed> {
        let mut reg = GainRegistry::new();
        reg.register(GainCell::Int(IntGain {
            name: "count",
            get: |m: &Mixed| m.count,
            set: |m: &mut Mixed, v| m.count = v,
        }));
        reg.register(GainCell::Float(FloatGain {
            name: "scale",
            get: |m: &Mixed| m.scale,
            set: |m: &mut Mixed, v| m.scale = v,
        }));
        reg
    }

    #[test]
    fn bank_registry_order() {
        let reg = bank_registry();
        let names: Vec<_> = reg.names().collect();
        assert_eq!(
            names,
            ["current.kp", "current.ki", "motion.kp", "motion.ki", "motion.kd"]
        );
        assert_eq!(reg.float_count(), 0);
    }

    #[test]
    fn save_layout() {
        let reg = bank_registry();
        let bank = Mutex::new(GainBank::default());
        let mut slots = MemorySlots::default();
        reg.save_all(&bank, &mut slots);
        assert_eq!(slots.read(0), 0xDEAD);
        let saved: Vec<u32> = (1..=5).map(|i| slots.read(i)).collect();
        assert_eq!(saved, [100, 100, 700, 10, 20000]);
        assert_eq!(slots.read(6), ERASED_WORD);
    }

    #[test]
    fn floats_follow_ints() {
        let reg = mixed_registry();
        let bank = Mutex::new(Mixed {
            count: -3,
            scale: 1.5,
        });
        let mut slots = MemorySlots::default();
        reg.save_all(&bank, &mut slots);
        assert_eq!(slots.read(1), (-3i32) as u32);
        assert_eq!(slots.read(2), 1.5f32.to_bits());

        let restored = Mutex::new(Mixed::default());
        assert!(reg.load_all(&restored, &slots));
        assert_eq!(
            *restored.lock(),
            Mixed {
                count: -3,
                scale: 1.5
            }
        );
    }

    #[test]
    fn load_without_sentinel_keeps_values() {
        let reg = bank_registry();
        let bank = Mutex::new(GainBank::default());
        let slots = MemorySlots::default();
        assert!(!reg.load_all(&bank, &slots));
        assert_eq!(*bank.lock(), GainBank::default());
    }

    #[test]
    fn save_then_load_restores_modified_bank() {
        let reg = bank_registry();
        let bank = Mutex::new(GainBank {
            current: CurrentGains { kp: 55, ki: 66 },
            motion: MotionGains {
                kp: 1,
                ki: 2,
                kd: 3,
            },
        });
        let mut slots = MemorySlots::default();
        reg.save_all(&bank, &mut slots);

        let fresh = Mutex::new(GainBank::default());
        assert!(reg.load_all(&fresh, &slots));
        assert_eq!(*fresh.lock(), *bank.lock());
    }

    #[test]
    fn register_beyond_capacity_is_refused() {
        let mut reg: GainRegistry<Mixed> = GainRegistry::new();
        for _ in 0..MAX_REGISTERED_GAINS {
            assert!(reg.register(GainCell::Int(IntGain {
                name: "count",
                get: |m: &Mixed| m.count,
                set: |m: &mut Mixed, v| m.count = v,
            })));
        }
        assert!(!reg.register(GainCell::Int(IntGain {
            name: "overflow",
            get: |m: &Mixed| m.count,
            set: |m: &mut Mixed, v| m.count = v,
        })));
        assert_eq!(reg.int_count(), MAX_REGISTERED_GAINS);
        // The float list is independent.
        assert!(reg.register(GainCell::Float(FloatGain {
            name: "scale",
            get: |m: &Mixed| m.scale,
            set: |m: &mut Mixed, v| m.scale = v,
        })));
    }
}
