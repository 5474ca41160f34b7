//! # DCM Control Unit
//!
//! Host runtime for the control core. Builds both loops on a simulated
//! motor, restores saved gains, runs one command to completion and prints
//! its outcome as JSON on stdout (streams as one sample per line). Gain
//! slots persist in a JSON snapshot between invocations.
//!
//! ```text
//! dcm_control_unit tune --samples 100
//! dcm_control_unit goto 90 --samples 200
//! dcm_control_unit track ramp.json --extra 50
//! dcm_control_unit gains set --motion-kp 500 --save
//! ```

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dcm_common::config::LogLevel;
use dcm_common::control_unit::control::{CurrentGains, MotionGains};
use dcm_control_unit::command::{Command, CommandExecutor, Outcome, Response};
use dcm_control_unit::config::{LoadedConfig, load_config};
use dcm_control_unit::context::ControlContext;
use dcm_control_unit::control::current::CurrentLoop;
use dcm_control_unit::control::motion::MotionLoop;
use dcm_control_unit::cycle::{CycleRunner, Pacing, rt_setup};
use dcm_control_unit::gains::MemorySlots;
use dcm_control_unit::hal::sim::SimMotor;

/// DCM Control Unit: cascaded current/motion control on a simulated motor
#[derive(Parser, Debug)]
#[command(name = "dcm_control_unit")]
#[command(version)]
#[command(about = "Cascaded PI/PID brushed DC motor control core")]
struct Args {
    /// Configuration TOML ([shared], [control], [plant]); defaults if omitted.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Gain snapshot file (overrides control.storage_path).
    #[arg(long, value_name = "FILE")]
    storage: Option<PathBuf>,

    /// Pace ticks in wall-clock time instead of running them back-to-back.
    #[arg(long)]
    realtime: bool,

    /// CPU core to pin to with --realtime (rt feature).
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority with --realtime (rt feature).
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Square-wave current test; streams the current loop.
    Tune {
        #[arg(long, default_value_t = 100)]
        samples: usize,
    },
    /// Open-loop drive at a duty percentage for a while, then stop.
    Pwm {
        #[arg(allow_hyphen_values = true)]
        duty: i32,
        #[arg(long, default_value_t = 100)]
        millis: u64,
    },
    /// Hold the present angle; streams the motion loop.
    Hold {
        #[arg(long, default_value_t = 200)]
        samples: usize,
    },
    /// Move to and hold an angle [deg]; streams the motion loop.
    Goto {
        #[arg(allow_hyphen_values = true)]
        angle: i32,
        #[arg(long, default_value_t = 200)]
        samples: usize,
    },
    /// Play a trajectory (JSON array of degrees, one per motion tick).
    Track {
        trajectory: PathBuf,
        #[arg(long, default_value_t = 50)]
        extra: usize,
    },
    /// Inspect or change the gain bank.
    Gains {
        #[command(subcommand)]
        action: GainsAction,
    },
    /// Read sensors and mode.
    Diag,
}

#[derive(Subcommand, Debug)]
enum GainsAction {
    Show,
    Set {
        #[arg(long)]
        current_kp: Option<i32>,
        #[arg(long)]
        current_ki: Option<i32>,
        #[arg(long)]
        motion_kp: Option<i32>,
        #[arg(long)]
        motion_ki: Option<i32>,
        #[arg(long)]
        motion_kd: Option<i32>,
        /// Persist after setting.
        #[arg(long)]
        save: bool,
    },
    Save,
    Load,
}

fn main() {
    let args = Args::parse();
    let loaded = match &args.config {
        Some(path) => load_config(path),
        None => {
            let cfg = LoadedConfig::default();
            cfg.validate().map(|_| cfg)
        }
    };

    let level = match &loaded {
        _ if args.verbose => LogLevel::Debug,
        Ok(cfg) => cfg.shared.log_level,
        Err(_) => LogLevel::Info,
    };
    setup_tracing(&args, level);

    info!("DCM Control Unit v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = loaded
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
        .and_then(|cfg| run(&args, cfg));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("DCM Control Unit shutdown complete");
}

fn run(args: &Args, cfg: LoadedConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        "Config OK: service={}, current={}µs, motion={}µs",
        cfg.shared.service_name, cfg.control.current_period_us, cfg.control.motion_period_us
    );

    let pacing = if args.realtime {
        rt_setup(args.cpu_core, args.rt_priority)?;
        info!(
            "RT setup complete (cpu_core={}, priority={})",
            args.cpu_core, args.rt_priority
        );
        Pacing::RealTime
    } else {
        Pacing::Virtual
    };

    let motor = SimMotor::new(cfg.plant);
    let ctx = ControlContext::new(cfg.control.gains);
    let current = CurrentLoop::new(motor.adc(), motor.bridge())
        .with_period(cfg.control.current_period_us);
    let motion = MotionLoop::new(motor.encoder()).with_period(cfg.control.motion_period_us);
    let runner = CycleRunner::new(ctx, current, motion, motor.clock())?.with_pacing(pacing);

    let storage_path = args
        .storage
        .clone()
        .unwrap_or_else(|| PathBuf::from(&cfg.control.storage_path));
    let slots = MemorySlots::load_json(&storage_path)?;
    let mut executor = CommandExecutor::boot(runner, slots);

    let booted = executor.runner().context();
    let bank = (booted.current_gains(), booted.motion_gains());
    for cmd in plan(&args.command, bank)? {
        let outcome = executor.execute(cmd)?;
        report(&outcome)?;
    }

    if let Cmd::Pwm { millis, .. } = args.command {
        let base_us = u64::from(cfg.control.current_period_us);
        executor.runner_mut().run_ticks(pwm_ticks(millis, base_us));
        println!("{}", serde_json::to_string(&motor.snapshot())?);
        report(&executor.execute(Command::Stop)?)?;
    }

    executor.storage().save_json(&storage_path)?;

    let stats = executor.runner().stats();
    info!(
        "Ran {} ticks ({} µs simulated): avg={}ns max={}ns overruns={}",
        stats.cycle_count,
        executor.runner().elapsed_us(),
        stats.avg_cycle_ns(),
        stats.max_cycle_ns,
        stats.overruns
    );
    Ok(())
}

/// Translate a CLI subcommand into the command sequence it stands for.
/// Gain flags left unset keep the value from `bank`.
fn plan(
    cmd: &Cmd,
    bank: (CurrentGains, MotionGains),
) -> Result<Vec<Command>, Box<dyn std::error::Error>> {
    Ok(match cmd {
        Cmd::Tune { samples } => vec![Command::Tune { samples: *samples }],
        Cmd::Pwm { duty, .. } => vec![Command::SetPwm {
            duty_percent: *duty,
        }],
        Cmd::Hold { samples } => vec![Command::Hold { samples: *samples }],
        Cmd::Goto { angle, samples } => vec![Command::Goto {
            angle: *angle,
            samples: *samples,
        }],
        Cmd::Track { trajectory, extra } => vec![
            Command::LoadTrajectory(read_trajectory(trajectory)?),
            Command::ExecuteTrajectory {
                extra_samples: *extra,
            },
        ],
        Cmd::Gains { action } => match action {
            GainsAction::Show => vec![Command::GetCurrentGains, Command::GetMotionGains],
            GainsAction::Set {
                current_kp,
                current_ki,
                motion_kp,
                motion_ki,
                motion_kd,
                save,
            } => {
                let (current, motion) = bank;
                let mut cmds = vec![
                    Command::SetCurrentGains(CurrentGains {
                        kp: current_kp.unwrap_or(current.kp),
                        ki: current_ki.unwrap_or(current.ki),
                    }),
                    Command::SetMotionGains(MotionGains {
                        kp: motion_kp.unwrap_or(motion.kp),
                        ki: motion_ki.unwrap_or(motion.ki),
                        kd: motion_kd.unwrap_or(motion.kd),
                    }),
                ];
                if *save {
                    cmds.push(Command::SaveGains);
                }
                cmds.push(Command::GetCurrentGains);
                cmds.push(Command::GetMotionGains);
                cmds
            }
            GainsAction::Save => vec![Command::SaveGains],
            GainsAction::Load => vec![Command::LoadGains],
        },
        Cmd::Diag => vec![
            Command::ReadMode,
            Command::ReadCurrentRaw,
            Command::ReadCurrentMilliamps,
            Command::ReadEncoderCounts,
            Command::ReadEncoderDegrees,
        ],
    })
}

/// Base ticks covering `millis` of open-loop drive.
fn pwm_ticks(millis: u64, base_us: u64) -> u64 {
    millis.saturating_mul(1000) / base_us.max(1)
}

fn read_trajectory(path: &Path) -> Result<Vec<i32>, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    let points: Vec<i32> = serde_json::from_str(&text)?;
    info!("Read {} trajectory samples from {}", points.len(), path.display());
    Ok(points)
}

fn report(outcome: &Outcome) -> Result<(), Box<dyn std::error::Error>> {
    // Streams go out one sample per line.
    if let Response::Stream(samples) = &outcome.response {
        for sample in samples {
            println!("{}", serde_json::to_string(sample)?);
        }
    } else {
        println!("{}", serde_json::to_string(outcome)?);
    }
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and configured level.
fn setup_tracing(args: &Args, level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pwm_duration_in_ticks() {
        assert_eq!(pwm_ticks(100, 200), 500);
        assert_eq!(pwm_ticks(0, 200), 0);
    }

    #[test]
    fn huge_pwm_duration_saturates() {
        assert_eq!(pwm_ticks(u64::MAX, 200), u64::MAX / 200);
    }
}
