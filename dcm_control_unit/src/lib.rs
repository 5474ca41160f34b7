//! # DCM Control Unit Library
//!
//! Real-time control core of a brushed DC motor driver: a 5 kHz current
//! loop cascaded under a 200 Hz motion loop, gated by a shared operating
//! mode.
//!
//! ## Data Flow
//!
//! ```text
//! encoder ──► motion loop (PID) ──► current setpoint ──► current loop (PI)
//!                                                          ▲        │
//!                                          current sense ──┘        ▼
//!                                                   actuator map ──► H-bridge
//! ```
//!
//! ## Layers
//!
//! 1. **hal**: converter, encoder link and bridge outputs as traits
//! 2. **sensor / actuator**: averaging, angle scaling, effort → duty pair
//! 3. **control**: the two periodic tasks
//! 4. **cycle**: deterministic dual-rate scheduling and pacing
//! 5. **command**: typed external layer: runs, gains, persistence
//!
//! ## Zero-Allocation Ticks
//!
//! Trajectory and registry storage are fixed-capacity. Stream storage is
//! reserved when a run is armed, never inside a tick.

#![deny(clippy::disallowed_types)]

pub mod actuator;
pub mod command;
pub mod config;
pub mod context;
pub mod control;
pub mod cycle;
pub mod gains;
pub mod hal;
pub mod sensor;
pub mod telemetry;
