//! Gain persistence.
//!
//! - [`registry`] - bounded list of gain descriptors with bulk save/load
//! - [`storage`] - word-addressed slot store (in memory, JSON snapshot)

pub mod registry;
pub mod storage;

pub use registry::{FloatGain, GainCell, GainRegistry, IntGain, bank_registry};
pub use storage::{MemorySlots, SlotStorage, StorageError};
