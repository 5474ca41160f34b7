//! Dual-rate cycle runner.
//!
//! Time advances in base ticks of the current-loop period. At every tick the
//! current task is released; every `motion_period / current_period` ticks
//! the motion task is released too. Tasks released at the same instant run
//! to completion in descending priority, which is how the faster loop
//! preempts the slower one on the target.
//!
//! ## Pacing
//! - [`Pacing::Virtual`]: ticks run back-to-back (tests, offline runs).
//! - [`Pacing::RealTime`]: each tick sleeps out the rest of its period.
//!
//! ## RT Setup
//! With the `rt` feature, [`rt_setup`] locks memory, pins the thread and
//! switches it to `SCHED_FIFO`. Without it every step is a no-op.

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::context::ControlContext;
use crate::control::PeriodicTask;
use crate::control::current::CurrentLoop;
use crate::control::motion::MotionLoop;
use crate::hal::{AdcSampler, DutyOutputs, PlantClock, SerialLink};
use crate::telemetry::StreamRecorder;

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-tick timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Base ticks executed.
    pub cycle_count: u64,
    /// Last tick duration [ns].
    pub last_cycle_ns: i64,
    pub min_cycle_ns: i64,
    pub max_cycle_ns: i64,
    sum_cycle_ns: i64,
    /// Ticks whose body took longer than the base period.
    pub overruns: u64,
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
        }
    }

    #[inline]
    pub fn record(&mut self, duration_ns: i64, budget_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns = self.sum_cycle_ns.saturating_add(duration_ns);
        if duration_ns > budget_ns {
            self.overruns += 1;
        }
    }

    /// Average tick time [ns] (0 if nothing ran).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("RT setup error: {0}")]
    RtSetup(String),

    #[error("motion period {motion_us}µs is not a positive multiple of current period {current_us}µs")]
    PeriodMismatch { current_us: u32, motion_us: u32 },
}

// ─── RT Setup ───────────────────────────────────────────────────────

#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), CycleError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| CycleError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), CycleError> {
    Ok(())
}

#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), CycleError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| CycleError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| CycleError::RtSetup(format!("sched_setaffinity failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), CycleError> {
    Ok(())
}

#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), CycleError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` outlives the call; pid 0 is the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(CycleError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), CycleError> {
    Ok(())
}

/// Lock memory, pin to `cpu_core`, switch to `SCHED_FIFO` at `rt_priority`.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    rt_mlockall()?;
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    Ok(())
}

// ─── Cycle Runner ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pacing {
    #[default]
    Virtual,
    RealTime,
}

/// Owns the context, both loops, the plant clock and the stream recorder.
pub struct CycleRunner<A, D, L, P = ()> {
    ctx: ControlContext,
    current: CurrentLoop<A, D>,
    motion: MotionLoop<L>,
    plant: P,
    recorder: StreamRecorder,
    base_period_us: u32,
    motion_every: u64,
    tick: u64,
    stats: CycleStats,
    pacing: Pacing,
}

impl<A, D, L, P> CycleRunner<A, D, L, P>
where
    A: AdcSampler,
    D: DutyOutputs,
    L: SerialLink,
    P: PlantClock,
{
    pub fn new(
        ctx: ControlContext,
        current: CurrentLoop<A, D>,
        motion: MotionLoop<L>,
        plant: P,
    ) -> Result<Self, CycleError> {
        let current_us = current.spec().period_us;
        let motion_us = motion.spec().period_us;
        if current_us == 0 || motion_us == 0 || motion_us % current_us != 0 {
            return Err(CycleError::PeriodMismatch {
                current_us,
                motion_us,
            });
        }
        Ok(Self {
            ctx,
            current,
            motion,
            plant,
            recorder: StreamRecorder::new(),
            base_period_us: current_us,
            motion_every: u64::from(motion_us / current_us),
            tick: 0,
            stats: CycleStats::new(),
            pacing: Pacing::Virtual,
        })
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// One base tick: release due tasks by priority, then let plant time pass.
    pub fn step(&mut self) {
        let start = Instant::now();
        let motion_due = self.tick % self.motion_every == 0;
        let current_first = self.current.spec().priority >= self.motion.spec().priority;

        if current_first {
            self.current.tick(&self.ctx, &mut self.recorder);
        }
        if motion_due {
            self.motion.tick(&self.ctx, &mut self.recorder);
        }
        if !current_first {
            self.current.tick(&self.ctx, &mut self.recorder);
        }

        self.plant.advance(self.base_period_us);
        self.tick += 1;

        let elapsed = start.elapsed();
        let budget = Duration::from_micros(u64::from(self.base_period_us));
        self.stats.record(elapsed.as_nanos() as i64, budget.as_nanos() as i64);

        if self.pacing == Pacing::RealTime {
            if let Some(remaining) = budget.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }
    }

    pub fn run_ticks(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.step();
        }
    }

    /// Run whole motion periods.
    pub fn run_motion_periods(&mut self, periods: u64) {
        self.run_ticks(periods * self.motion_every);
    }

    /// Step until the recorder has its samples or `max_ticks` elapse.
    /// Returns whether the stream completed.
    pub fn run_until_stream_complete(&mut self, max_ticks: u64) -> bool {
        for _ in 0..max_ticks {
            if self.recorder.is_complete() {
                return true;
            }
            self.step();
        }
        self.recorder.is_complete()
    }

    pub fn context(&self) -> &ControlContext {
        &self.ctx
    }

    pub fn current(&self) -> &CurrentLoop<A, D> {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut CurrentLoop<A, D> {
        &mut self.current
    }

    pub fn motion(&self) -> &MotionLoop<L> {
        &self.motion
    }

    pub fn motion_mut(&mut self) -> &mut MotionLoop<L> {
        &mut self.motion
    }

    pub fn plant(&self) -> &P {
        &self.plant
    }

    pub fn recorder(&self) -> &StreamRecorder {
        &self.recorder
    }

    pub fn recorder_mut(&mut self) -> &mut StreamRecorder {
        &mut self.recorder
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    /// Base ticks per motion release.
    pub fn motion_every(&self) -> u64 {
        self.motion_every
    }

    /// Virtual time since start [µs].
    pub fn elapsed_us(&self) -> u64 {
        self.tick * u64::from(self.base_period_us)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
