//! Word-addressed persistent slot storage.
//!
//! Slot writes and reads are synchronous and infallible from the registry's
//! point of view. Unwritten slots read as the erased word `0xFFFF_FFFF`.
//! The host runtime keeps the slots in a JSON snapshot between runs.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use dcm_common::consts::GAIN_STORAGE_SLOTS;

/// Content of a slot that was never written.
pub const ERASED_WORD: u32 = 0xFFFF_FFFF;

pub trait SlotStorage {
    fn write(&mut self, value: u32, slot: usize);
    fn read(&self, slot: usize) -> u32;
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("slot snapshot I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("slot snapshot format: {0}")]
    Format(#[from] serde_json::Error),
}

/// Fixed number of slots held in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySlots {
    slots: Vec<u32>,
}

impl Default for MemorySlots {
    fn default() -> Self {
        Self::erased(GAIN_STORAGE_SLOTS)
    }
}

impl MemorySlots {
    pub fn erased(count: usize) -> Self {
        Self {
            slots: vec![ERASED_WORD; count],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Read a snapshot; a missing file is a freshly erased store.
    pub fn load_json(path: &Path) -> Result<Self, StorageError> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let mut slots: Self = serde_json::from_str(&text)?;
                if slots.slots.len() < GAIN_STORAGE_SLOTS {
                    slots.slots.resize(GAIN_STORAGE_SLOTS, ERASED_WORD);
                }
                debug!("Loaded {} slots from {}", slots.len(), path.display());
                Ok(slots)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No slot snapshot at {}, starting erased", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save_json(&self, path: &Path) -> Result<(), StorageError> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        debug!("Wrote {} slots to {}", self.len(), path.display());
        Ok(())
    }
}

impl SlotStorage for MemorySlots {
    /// Writes past the end are dropped.
    fn write(&mut self, value: u32, slot: usize) {
        if let Some(word) = self.slots.get_mut(slot) {
            *word = value;
        }
    }

    fn read(&self, slot: usize) -> u32 {
        self.slots.get(slot).copied().unwrap_or(ERASED_WORD)
    }
}
