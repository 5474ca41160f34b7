//! Integration test: gain persistence across reboots via the JSON slot
//! snapshot.

use dcm_common::consts::{GAIN_SENTINEL, GAIN_STORAGE_SLOTS};
use dcm_common::control_unit::control::{CurrentGains, MotionGains};
use dcm_control_unit::command::{Command, Response};
use dcm_control_unit::gains::{MemorySlots, SlotStorage, StorageError};

use super::sim_executor;

fn tuned() -> MotionGains {
    MotionGains {
        kp: 450,
        ki: 25,
        kd: 12000,
    }
}

#[test]
fn saved_gains_survive_reboot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gains.json");

    // First boot: nothing on disk.
    let (_motor, mut ex) = sim_executor(MemorySlots::load_json(&path).unwrap());
    assert_eq!(
        ex.execute(Command::LoadGains).unwrap().response,
        Response::GainsLoaded(false)
    );
    ex.execute(Command::SetMotionGains(tuned())).unwrap();
    ex.execute(Command::SetCurrentGains(CurrentGains { kp: 90, ki: 60 }))
        .unwrap();
    ex.execute(Command::SaveGains).unwrap();
    ex.storage().save_json(&path).unwrap();

    // Second boot restores them.
    let slots = MemorySlots::load_json(&path).unwrap();
    assert_eq!(slots.read(0), GAIN_SENTINEL);
    assert_eq!(slots.len(), GAIN_STORAGE_SLOTS);
    let (_motor, mut ex) = sim_executor(slots);
    assert_eq!(
        ex.execute(Command::GetMotionGains).unwrap().response,
        Response::MotionGains(tuned())
    );
    assert_eq!(
        ex.execute(Command::GetCurrentGains).unwrap().response,
        Response::CurrentGains(CurrentGains { kp: 90, ki: 60 })
    );
}

#[test]
fn unsaved_changes_are_lost() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gains.json");

    let (_motor, mut ex) = sim_executor(MemorySlots::load_json(&path).unwrap());
    ex.execute(Command::SetMotionGains(tuned())).unwrap();
    ex.storage().save_json(&path).unwrap();

    let (_motor, mut ex) = sim_executor(MemorySlots::load_json(&path).unwrap());
    assert_eq!(
        ex.execute(Command::GetMotionGains).unwrap().response,
        Response::MotionGains(MotionGains::default())
    );
}

#[test]
fn load_reverts_to_saved_image() {
    let (_motor, mut ex) = sim_executor(MemorySlots::default());
    ex.execute(Command::SetMotionGains(tuned())).unwrap();
    ex.execute(Command::SaveGains).unwrap();
    ex.execute(Command::SetMotionGains(MotionGains {
        kp: 1,
        ki: 1,
        kd: 1,
    }))
    .unwrap();

    assert_eq!(
        ex.execute(Command::LoadGains).unwrap().response,
        Response::GainsLoaded(true)
    );
    assert_eq!(ex.runner().context().motion_gains(), tuned());
}

#[test]
fn missing_sentinel_keeps_defaults() {
    let mut slots = MemorySlots::default();
    // Gain words present but slot 0 never stamped.
    for slot in 1..6 {
        slots.write(7, slot);
    }
    let (_motor, ex) = sim_executor(slots);
    assert_eq!(ex.runner().context().current_gains(), CurrentGains::default());
    assert_eq!(ex.runner().context().motion_gains(), MotionGains::default());
}

#[test]
fn negative_gains_round_trip_through_words() {
    let (_motor, mut ex) = sim_executor(MemorySlots::default());
    ex.execute(Command::SetCurrentGains(CurrentGains { kp: -3, ki: 0 }))
        .unwrap();
    ex.execute(Command::SaveGains).unwrap();

    let (_motor, ex) = sim_executor(ex.storage().clone());
    assert_eq!(
        ex.runner().context().current_gains(),
        CurrentGains { kp: -3, ki: 0 }
    );
}

#[test]
fn malformed_snapshot_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gains.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        MemorySlots::load_json(&path),
        Err(StorageError::Format(_))
    ));
}
