//! Integration test: configuration file → running controller.

use std::io::Write;

use dcm_common::config::{ConfigError, LogLevel};
use dcm_common::control_unit::state::OperatingMode;
use dcm_control_unit::command::{Command, CommandExecutor};
use dcm_control_unit::config::{load_config, load_config_from_str};
use dcm_control_unit::context::ControlContext;
use dcm_control_unit::control::PeriodicTask;
use dcm_control_unit::control::current::CurrentLoop;
use dcm_control_unit::control::motion::MotionLoop;
use dcm_control_unit::cycle::{CycleError, CycleRunner};
use dcm_control_unit::gains::MemorySlots;
use dcm_control_unit::hal::sim::SimMotor;

const BENCH_TOML: &str = r#"
[shared]
service_name = "dcm-bench"
log_level = "debug"

[control]
current_period_us = 250
motion_period_us = 5000
storage_path = "bench_gains.json"

[control.gains.motion]
kp = 600
ki = 10
kd = 18000

[plant]
supply_voltage_v = 12.0
"#;

#[test]
fn file_config_drives_the_runner() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(BENCH_TOML.as_bytes()).unwrap();
    let cfg = load_config(file.path()).unwrap();

    assert_eq!(cfg.shared.log_level, LogLevel::Debug);
    assert_eq!(cfg.control.storage_path, "bench_gains.json");
    assert_eq!(cfg.plant.supply_voltage_v, 12.0);

    let motor = SimMotor::new(cfg.plant);
    let current = CurrentLoop::new(motor.adc(), motor.bridge())
        .with_period(cfg.control.current_period_us);
    let motion = MotionLoop::new(motor.encoder()).with_period(cfg.control.motion_period_us);
    assert_eq!(current.spec().period_us, 250);

    let runner = CycleRunner::new(
        ControlContext::new(cfg.control.gains),
        current,
        motion,
        motor.clock(),
    )
    .unwrap();
    assert_eq!(runner.motion_every(), 20);

    let mut ex = CommandExecutor::boot(runner, MemorySlots::default());
    assert_eq!(ex.runner().context().motion_gains().kd, 18000);
    let out = ex
        .execute(Command::Goto {
            angle: 10,
            samples: 5,
        })
        .unwrap();
    assert_eq!(out.forced_idle, None);
    assert_eq!(ex.mode(), Some(OperatingMode::Hold));
    assert_eq!(ex.runner().elapsed_us(), 4 * 5000 + 250);
}

#[test]
fn missing_file_is_reported() {
    let err = load_config(std::path::Path::new("/nonexistent/dcm.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound(_)));
}

#[test]
fn invalid_plant_is_rejected() {
    assert!(matches!(
        load_config_from_str("[plant]\nresistance_ohm = 0.0\n"),
        Err(ConfigError::ValidationError(_))
    ));
}

#[test]
fn unparsable_document_is_rejected() {
    assert!(matches!(
        load_config_from_str("[control\n"),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn runner_rejects_incommensurate_periods() {
    let motor = SimMotor::new(Default::default());
    let err = CycleRunner::new(
        ControlContext::default(),
        CurrentLoop::new(motor.adc(), motor.bridge()).with_period(300),
        MotionLoop::new(motor.encoder()),
        motor.clock(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, CycleError::PeriodMismatch { .. }));
}
