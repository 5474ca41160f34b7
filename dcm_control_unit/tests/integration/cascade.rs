//! Integration test: current loop cascaded under the motion loop, closed
//! around the simulated motor.

use dcm_common::control_unit::state::OperatingMode;
use dcm_control_unit::command::Command;
use dcm_control_unit::gains::MemorySlots;

use super::{sim_executor, stream_of};

// ── Position ────────────────────────────────────────────────────────

#[test]
fn goto_settles_on_target() {
    let (motor, mut ex) = sim_executor(MemorySlots::default());
    let samples = stream_of(
        ex.execute(Command::Goto {
            angle: 90,
            samples: 300,
        })
        .unwrap(),
    );

    assert_eq!(samples.len(), 300);
    assert!(samples.iter().all(|s| s.reference == 90));
    // Starts at rest, at zero.
    assert_eq!(samples[0].measurement, 0);
    for s in &samples[270..] {
        assert!(
            (87..=93).contains(&s.measurement),
            "angle {} not settled",
            s.measurement
        );
    }
    let angle = motor.snapshot().angle_deg;
    assert!((angle - 90.0).abs() < 3.0, "shaft at {angle}°");
    assert_eq!(ex.mode(), Some(OperatingMode::Hold));
}

#[test]
fn goto_negative_angle() {
    let (_motor, mut ex) = sim_executor(MemorySlots::default());
    let samples = stream_of(
        ex.execute(Command::Goto {
            angle: -45,
            samples: 300,
        })
        .unwrap(),
    );
    for s in &samples[270..] {
        assert!((-48..=-42).contains(&s.measurement), "angle {}", s.measurement);
    }
}

#[test]
fn motion_effort_drives_current_setpoint() {
    let (_motor, mut ex) = sim_executor(MemorySlots::default());
    let samples = stream_of(
        ex.execute(Command::Goto {
            angle: 90,
            samples: 1,
        })
        .unwrap(),
    );
    // Large first error saturates the setpoint while the raw effort is logged.
    assert!(samples[0].effort > 2000);
    assert_eq!(ex.runner().context().current_reference(), 2000);
}

#[test]
fn hold_keeps_present_angle() {
    let (motor, mut ex) = sim_executor(MemorySlots::default());
    motor.set_angle_deg(90.0);
    let samples = stream_of(ex.execute(Command::Hold { samples: 100 }).unwrap());
    assert_eq!(ex.runner().motion().state().hold_angle, 90);
    for s in &samples {
        assert!((88..=92).contains(&s.measurement), "drifted to {}", s.measurement);
    }
}

// ── Current ─────────────────────────────────────────────────────────

#[test]
fn tune_tracks_square_wave() {
    let (_motor, mut ex) = sim_executor(MemorySlots::default());
    let samples = stream_of(ex.execute(Command::Tune { samples: 200 }).unwrap());

    assert_eq!(samples.len(), 200);
    for (k, s) in samples.iter().enumerate() {
        let expected = if k % 50 < 25 { -200 } else { 200 };
        assert_eq!(s.reference, expected, "waveform sample {k}");
        // Settled part of each half period.
        if k >= 25 && k % 25 >= 10 {
            assert!(
                (s.reference - s.measurement).abs() <= 20,
                "sample {k}: ref {} meas {}",
                s.reference,
                s.measurement
            );
        }
    }
    assert_eq!(ex.mode(), Some(OperatingMode::Idle));
}

#[test]
fn open_loop_pwm_spins_both_ways() {
    let (motor, mut ex) = sim_executor(MemorySlots::default());

    ex.execute(Command::SetPwm { duty_percent: 50 }).unwrap();
    ex.runner_mut().run_ticks(2500);
    let forward = motor.snapshot();
    assert!(forward.speed_deg_s > 0.0);
    assert!(forward.current_ma > 0.0);
    assert_eq!(forward.legs, (1999, 1000));

    ex.execute(Command::SetPwm { duty_percent: -50 }).unwrap();
    ex.runner_mut().run_ticks(5000);
    let reverse = motor.snapshot();
    assert!(reverse.speed_deg_s < 0.0);
    assert_eq!(reverse.legs, (1000, 1999));

    ex.execute(Command::Stop).unwrap();
    ex.runner_mut().run_ticks(1);
    assert_eq!(motor.snapshot().legs, (0, 0));
}

#[test]
fn undecodable_mode_brakes() {
    let (motor, mut ex) = sim_executor(MemorySlots::default());
    ex.execute(Command::SetPwm { duty_percent: 30 }).unwrap();
    ex.runner_mut().run_ticks(10);
    ex.runner().context().mode_cell().store_raw(0x7F);
    ex.runner_mut().run_ticks(1);
    assert_eq!(motor.snapshot().legs, (1999, 1999));
}

// ── Trajectory ──────────────────────────────────────────────────────

#[test]
fn ramp_is_followed_then_held() {
    let (_motor, mut ex) = sim_executor(MemorySlots::default());
    let ramp: Vec<i32> = (0..=90).collect();
    ex.execute(Command::LoadTrajectory(ramp)).unwrap();

    let samples = stream_of(
        ex.execute(Command::ExecuteTrajectory {
            extra_samples: 100,
        })
        .unwrap(),
    );

    assert_eq!(samples.len(), 191);
    for (k, s) in samples.iter().enumerate() {
        assert_eq!(s.reference, (k as i32).min(90));
    }
    for s in &samples[171..] {
        assert!((84..=96).contains(&s.measurement), "angle {}", s.measurement);
    }
    assert_eq!(ex.mode(), Some(OperatingMode::Hold));
    assert_eq!(ex.runner().motion().state().hold_angle, 90);
}
