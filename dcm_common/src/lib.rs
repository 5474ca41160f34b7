//! DCM Common Library
//!
//! Shared constants, operating-mode and gain types, and configuration loading
//! utilities for the DC motor control workspace.
//!
//! # Module Structure
//!
//! - [`consts`] - Numeric contracts (duty range, current limits, loop rates)
//! - [`config`] - Configuration loading traits and types
//! - [`control_unit`] - Mode state, gain sets, telemetry sample, controller config
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use dcm_common::prelude::*;
//!
//! let mode = OperatingMode::from_u8(4);
//! assert_eq!(mode, Some(OperatingMode::Hold));
//! ```

pub mod config;
pub mod consts;
pub mod control_unit;
pub mod prelude;
