//! TOML configuration loader with validation.
//!
//! One file, three tables, all optional:
//!
//! ```toml
//! [shared]
//! service_name = "dcm-bench"
//! log_level = "info"
//!
//! [control]
//! current_period_us = 200
//! motion_period_us = 5000
//! storage_path = "dcm_gains.json"
//!
//! [plant]
//! resistance_ohm = 3.0
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use dcm_common::config::{ConfigError, ConfigLoader, SharedConfig};
use dcm_common::control_unit::config::ControlUnitConfig;

use crate::hal::sim::PlantConfig;

/// Complete validated configuration bundle.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoadedConfig {
    #[serde(default)]
    pub shared: SharedConfig,
    #[serde(default)]
    pub control: ControlUnitConfig,
    #[serde(default)]
    pub plant: PlantConfig,
}

impl LoadedConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.control.validate().map_err(ConfigError::ValidationError)?;
        self.plant.validate()
    }
}

/// Parse and validate a TOML document.
pub fn load_config_from_str(content: &str) -> Result<LoadedConfig, ConfigError> {
    let loaded = LoadedConfig::from_toml_str(content)?;
    loaded.validate()?;
    Ok(loaded)
}

/// Read, parse and validate a TOML file.
pub fn load_config(path: &Path) -> Result<LoadedConfig, ConfigError> {
    let loaded = LoadedConfig::load(path)?;
    loaded.validate()?;
    info!(
        "Config loaded from {}: current={}µs motion={}µs",
        path.display(),
        loaded.control.current_period_us,
        loaded.control.motion_period_us
    );
    Ok(loaded)
}
