//! Types shared between the control core and its callers.
//!
//! - [`state`] - operating mode and hold-target selection
//! - [`control`] - gain sets and the telemetry sample
//! - [`config`] - controller section of the TOML configuration

pub mod config;
pub mod control;
pub mod state;
