//! Integration test: command layer against the simulated motor.

use dcm_common::consts::ENCODER_MIDPOINT;
use dcm_common::control_unit::control::{CurrentGains, MotionGains};
use dcm_common::control_unit::state::OperatingMode;
use dcm_control_unit::command::{Command, CommandError, Response};
use dcm_control_unit::gains::MemorySlots;
use dcm_control_unit::sensor::raw_to_milliamps;

use super::sim_executor;

fn value(response: Response) -> i32 {
    match response {
        Response::Value(v) => v,
        other => panic!("expected a value, got {other:?}"),
    }
}

#[test]
fn encoder_reset_rezeros_angle() {
    let (motor, mut ex) = sim_executor(MemorySlots::default());
    motor.set_angle_deg(90.0);

    let deg = ex.execute(Command::ReadEncoderDegrees).unwrap().response;
    assert_eq!(value(deg), 90);

    ex.execute(Command::ResetEncoder).unwrap();
    let deg = ex.execute(Command::ReadEncoderDegrees).unwrap().response;
    assert_eq!(value(deg), 0);
    let counts = ex.execute(Command::ReadEncoderCounts).unwrap().response;
    assert_eq!(value(counts), ENCODER_MIDPOINT);
    assert!(motor.snapshot().angle_deg.abs() < 1e-9);
}

#[test]
fn current_sense_follows_plant() {
    let (motor, mut ex) = sim_executor(MemorySlots::default());
    ex.execute(Command::SetPwm { duty_percent: 50 }).unwrap();
    ex.runner_mut().run_ticks(2500);

    let raw = value(ex.execute(Command::ReadCurrentRaw).unwrap().response);
    let ma = value(ex.execute(Command::ReadCurrentMilliamps).unwrap().response);
    assert_eq!(raw_to_milliamps(raw as u16), ma);

    let actual = motor.snapshot().current_ma;
    assert!((f64::from(ma) - actual).abs() < 6.0, "read {ma} mA, plant {actual} mA");
}

#[test]
fn gain_update_during_hold_stops_outputs() {
    let (motor, mut ex) = sim_executor(MemorySlots::default());
    ex.execute(Command::Goto {
        angle: 45,
        samples: 20,
    })
    .unwrap();
    assert_eq!(ex.mode(), Some(OperatingMode::Hold));

    ex.execute(Command::SetCurrentGains(CurrentGains { kp: 50, ki: 50 }))
        .unwrap();
    assert_eq!(ex.mode(), Some(OperatingMode::Idle));
    ex.runner_mut().run_ticks(1);
    assert_eq!(motor.snapshot().legs, (0, 0));
    assert_eq!(ex.runner().current().state().eint, 0);
}

#[test]
fn leftover_tune_mode_is_reported_and_cleared() {
    let (_motor, mut ex) = sim_executor(MemorySlots::default());
    ex.runner().context().set_mode(OperatingMode::Tune);

    let out = ex.execute(Command::GetMotionGains).unwrap();
    assert_eq!(out.forced_idle, Some(OperatingMode::Tune));
    assert_eq!(out.response, Response::MotionGains(MotionGains::default()));
    assert_eq!(ex.mode(), Some(OperatingMode::Idle));
}

#[test]
fn rejected_command_still_checks_mode() {
    let (_motor, mut ex) = sim_executor(MemorySlots::default());
    ex.runner().context().set_mode(OperatingMode::Track);
    let err = ex.execute(Command::SetPwm { duty_percent: -101 }).unwrap_err();
    assert!(matches!(err, CommandError::DutyOutOfRange(-101)));
    assert_eq!(ex.mode(), Some(OperatingMode::Idle));
}

#[test]
fn outcome_serializes_as_tagged_json() {
    let (_motor, mut ex) = sim_executor(MemorySlots::default());

    let out = ex.execute(Command::SetPwm { duty_percent: -50 }).unwrap();
    assert_eq!(
        serde_json::to_string(&out).unwrap(),
        r#"{"response":{"kind":"value","value":-999},"forced_idle":null}"#
    );

    let out = ex.execute(Command::ReadMode).unwrap();
    assert_eq!(
        serde_json::to_string(&out).unwrap(),
        r#"{"response":{"kind":"mode","value":"OpenLoopPwm"},"forced_idle":null}"#
    );

    let out = ex.execute(Command::Stop).unwrap();
    assert_eq!(
        serde_json::to_string(&out).unwrap(),
        r#"{"response":{"kind":"ack"},"forced_idle":null}"#
    );
}
