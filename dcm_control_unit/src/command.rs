//! External command layer.
//!
//! Typed counterpart of the host menu: each [`Command`] is run to completion
//! against the cycle runner, including any streaming run it starts. Runs are
//! sequenced here, so trajectory and gain updates never race a task.
//!
//! After every command the transient-mode invariant is checked: if `Track`
//! or `Tune` is still selected, the mode is forced to `Idle`, a warning is
//! logged, and the violation is reported in [`Outcome::forced_idle`].

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use dcm_common::consts::MAX_STREAM_SAMPLES;
use dcm_common::control_unit::control::{CurrentGains, GainBank, MotionGains, Sample};
use dcm_common::control_unit::state::{OperatingMode, ResetMode};

use crate::control::motion::TrajectoryError;
use crate::cycle::CycleRunner;
use crate::gains::{GainRegistry, SlotStorage, bank_registry};
use crate::hal::{AdcSampler, DutyOutputs, PlantClock, SerialLink};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Averaged converter code.
    ReadCurrentRaw,
    /// Averaged current [mA].
    ReadCurrentMilliamps,
    /// Settled encoder count.
    ReadEncoderCounts,
    /// Shaft angle [deg].
    ReadEncoderDegrees,
    ResetEncoder,
    ReadMode,
    /// Open-loop drive at `duty_percent` of full scale (−100..=100).
    SetPwm { duty_percent: i32 },
    SetCurrentGains(CurrentGains),
    GetCurrentGains,
    SetMotionGains(MotionGains),
    GetMotionGains,
    /// Stream `samples` ticks of the current-loop square-wave test.
    Tune { samples: usize },
    /// Replace the stored trajectory [deg per motion tick].
    LoadTrajectory(Vec<i32>),
    /// Play the trajectory, stream `len + extra_samples`, then hold the end.
    ExecuteTrajectory { extra_samples: usize },
    /// Hold the current angle and stream `samples`.
    Hold { samples: usize },
    /// Hold `angle`, streaming `samples` (0 returns immediately).
    Goto { angle: i32, samples: usize },
    Stop,
    SaveGains,
    LoadGains,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Response {
    Ack,
    Value(i32),
    Mode(OperatingMode),
    CurrentGains(CurrentGains),
    MotionGains(MotionGains),
    Stream(Vec<Sample>),
    GainsLoaded(bool),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub response: Response,
    /// Transient mode found after the command, now forced to `Idle`.
    pub forced_idle: Option<OperatingMode>,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("PWM duty {0}% outside [-100, 100]")]
    DutyOutOfRange(i32),

    #[error("trajectory is empty")]
    EmptyTrajectory,

    #[error(transparent)]
    Trajectory(#[from] TrajectoryError),

    #[error("stream stalled: {collected} of {requested} samples")]
    StreamStalled { requested: usize, collected: usize },

    #[error("stream of {requested} samples exceeds the limit of {limit}")]
    StreamTooLong { requested: usize, limit: usize },
}

/// Runs commands against a cycle runner and a slot store.
pub struct CommandExecutor<A, D, L, P, S> {
    runner: CycleRunner<A, D, L, P>,
    registry: GainRegistry<GainBank>,
    storage: S,
}

impl<A, D, L, P, S> CommandExecutor<A, D, L, P, S>
where
    A: AdcSampler,
    D: DutyOutputs,
    L: SerialLink,
    P: PlantClock,
    S: SlotStorage,
{
    /// Register the gain bank and restore saved gains if present.
    pub fn boot(runner: CycleRunner<A, D, L, P>, storage: S) -> Self {
        let registry = bank_registry();
        let restored = registry.load_all(runner.context().gain_bank(), &storage);
        info!(
            "Gain registry ready ({} entries, {})",
            registry.int_count() + registry.float_count(),
            if restored { "restored from storage" } else { "defaults" }
        );
        Self {
            runner,
            registry,
            storage,
        }
    }

    pub fn runner(&self) -> &CycleRunner<A, D, L, P> {
        &self.runner
    }

    pub fn runner_mut(&mut self) -> &mut CycleRunner<A, D, L, P> {
        &mut self.runner
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn mode(&self) -> Option<OperatingMode> {
        self.runner.context().mode()
    }

    /// Run `cmd`, then enforce the transient-mode invariant.
    pub fn execute(&mut self, cmd: Command) -> Result<Outcome, CommandError> {
        debug!("Executing {cmd:?}");
        let result = self.dispatch(cmd);
        let forced_idle = self.enforce_transient_invariant();
        result.map(|response| Outcome {
            response,
            forced_idle,
        })
    }

    /// Force `Idle` if a transient mode is still selected.
    pub fn enforce_transient_invariant(&mut self) -> Option<OperatingMode> {
        let ctx = self.runner.context();
        match ctx.mode() {
            Some(mode) if mode.is_transient() => {
                warn!("Mode {mode} outlived its command, forcing IDLE");
                ctx.set_mode(OperatingMode::Idle);
                Some(mode)
            }
            _ => None,
        }
    }

    fn dispatch(&mut self, cmd: Command) -> Result<Response, CommandError> {
        match cmd {
            Command::ReadCurrentRaw => {
                let raw = self.runner.current_mut().sensor_mut().read_current_raw();
                Ok(Response::Value(i32::from(raw)))
            }
            Command::ReadCurrentMilliamps => Ok(Response::Value(
                self.runner.current_mut().sensor_mut().current_amps_get(),
            )),
            Command::ReadEncoderCounts => {
                let raw = self.runner.motion_mut().encoder_mut().read();
                Ok(Response::Value(i32::from(raw)))
            }
            Command::ReadEncoderDegrees => Ok(Response::Value(
                self.runner.motion_mut().encoder_mut().angle_from_encoder(),
            )),
            Command::ResetEncoder => {
                self.runner.motion_mut().encoder_mut().reset();
                Ok(Response::Ack)
            }
            Command::ReadMode => Ok(match self.mode() {
                Some(mode) => Response::Mode(mode),
                None => Response::Value(i32::from(self.runner.context().mode_cell().load_raw())),
            }),
            Command::SetPwm { duty_percent } => {
                if !(-100..=100).contains(&duty_percent) {
                    return Err(CommandError::DutyOutOfRange(duty_percent));
                }
                let effort = self.runner.current_mut().set_pwm_percent(duty_percent);
                self.runner.context().set_mode(OperatingMode::OpenLoopPwm);
                Ok(Response::Value(effort))
            }
            Command::SetCurrentGains(gains) => {
                let ctx = self.runner.context();
                ctx.set_mode(OperatingMode::Idle);
                ctx.set_current_gains(gains);
                Ok(Response::Ack)
            }
            Command::GetCurrentGains => Ok(Response::CurrentGains(
                self.runner.context().current_gains(),
            )),
            Command::SetMotionGains(gains) => {
                let ctx = self.runner.context();
                ctx.set_mode(OperatingMode::Idle);
                ctx.set_motion_gains(gains);
                Ok(Response::Ack)
            }
            Command::GetMotionGains => Ok(Response::MotionGains(
                self.runner.context().motion_gains(),
            )),
            Command::Tune { samples } => self.tune(samples),
            Command::LoadTrajectory(points) => self.load_trajectory(&points),
            Command::ExecuteTrajectory { extra_samples } => self.execute_trajectory(extra_samples),
            Command::Hold { samples } => {
                check_stream_len(samples)?;
                self.runner.motion_mut().trajectory_reset(ResetMode::Now);
                self.stream(samples, OperatingMode::Hold)
            }
            Command::Goto { angle, samples } => {
                check_stream_len(samples)?;
                self.runner.motion_mut().trajectory_reset(ResetMode::Angle(angle));
                self.stream(samples, OperatingMode::Hold)
            }
            Command::Stop => {
                self.runner.context().set_mode(OperatingMode::Idle);
                Ok(Response::Ack)
            }
            Command::SaveGains => {
                self.registry
                    .save_all(self.runner.context().gain_bank(), &mut self.storage);
                Ok(Response::Ack)
            }
            Command::LoadGains => Ok(Response::GainsLoaded(
                self.registry
                    .load_all(self.runner.context().gain_bank(), &self.storage),
            )),
        }
    }

    fn tune(&mut self, samples: usize) -> Result<Response, CommandError> {
        self.runner.context().set_mode(OperatingMode::Idle);
        self.runner.current_mut().restart_waveform();
        let result = self.stream(samples, OperatingMode::Tune);
        self.runner.context().set_mode(OperatingMode::Idle);
        result
    }

    fn load_trajectory(&mut self, points: &[i32]) -> Result<Response, CommandError> {
        let Some(final_index) = points.len().checked_sub(1) else {
            return Err(CommandError::EmptyTrajectory);
        };
        let motion = self.runner.motion_mut();
        // Size check first, so an oversized load leaves the old run intact.
        motion.trajectory_set(0, final_index)?;
        for (index, &angle) in points.iter().enumerate() {
            motion.trajectory_set(angle, index)?;
        }
        info!("Loaded trajectory of {} samples", points.len());
        Ok(Response::Value(points.len() as i32))
    }

    fn execute_trajectory(&mut self, extra_samples: usize) -> Result<Response, CommandError> {
        let len = self.runner.motion().trajectory().len();
        if len == 0 {
            return Err(CommandError::EmptyTrajectory);
        }
        let samples = len.saturating_add(extra_samples);
        check_stream_len(samples)?;
        self.runner.motion_mut().trajectory_reset(ResetMode::Last);
        let result = self.stream(samples, OperatingMode::Track);
        self.runner.context().set_mode(OperatingMode::Hold);
        result
    }

    /// Arm the recorder for `samples`, select `mode`, wait for the samples.
    fn stream(&mut self, samples: usize, mode: OperatingMode) -> Result<Response, CommandError> {
        check_stream_len(samples)?;
        self.runner.recorder_mut().begin(samples);
        self.runner.context().set_mode(mode);
        let every = self.runner.motion_every();
        let max_ticks = (samples as u64)
            .saturating_add(1)
            .saturating_mul(every)
            .saturating_add(1);
        if !self.runner.run_until_stream_complete(max_ticks) {
            let collected = self.runner.recorder().samples().len();
            self.runner.recorder_mut().take();
            return Err(CommandError::StreamStalled {
                requested: samples,
                collected,
            });
        }
        Ok(Response::Stream(self.runner.recorder_mut().take()))
    }
}

fn check_stream_len(samples: usize) -> Result<(), CommandError> {
    if samples > MAX_STREAM_SAMPLES {
        return Err(CommandError::StreamTooLong {
            requested: samples,
            limit: MAX_STREAM_SAMPLES,
        });
    }
    Ok(())
}
