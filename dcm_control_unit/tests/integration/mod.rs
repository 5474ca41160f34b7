mod cascade;
mod command_flow;
mod config;
mod persistence;
mod properties;

use dcm_common::control_unit::control::{GainBank, Sample};
use dcm_control_unit::command::{CommandExecutor, Outcome, Response};
use dcm_control_unit::context::ControlContext;
use dcm_control_unit::control::current::CurrentLoop;
use dcm_control_unit::control::motion::MotionLoop;
use dcm_control_unit::cycle::CycleRunner;
use dcm_control_unit::gains::MemorySlots;
use dcm_control_unit::hal::sim::{PlantConfig, SimAdc, SimBridge, SimClock, SimEncoder, SimMotor};

pub type SimExecutor = CommandExecutor<SimAdc, SimBridge, SimEncoder, SimClock, MemorySlots>;

/// Both loops on a motor at rest, booted from `slots`.
pub fn sim_executor(slots: MemorySlots) -> (SimMotor, SimExecutor) {
    let motor = SimMotor::new(PlantConfig::default());
    let runner = CycleRunner::new(
        ControlContext::new(GainBank::default()),
        CurrentLoop::new(motor.adc(), motor.bridge()),
        MotionLoop::new(motor.encoder()),
        motor.clock(),
    )
    .unwrap();
    let executor = CommandExecutor::boot(runner, slots);
    (motor, executor)
}

pub fn stream_of(outcome: Outcome) -> Vec<Sample> {
    match outcome.response {
        Response::Stream(samples) => samples,
        other => panic!("expected a stream, got {other:?}"),
    }
}
