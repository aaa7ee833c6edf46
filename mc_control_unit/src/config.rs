//! TOML configuration loader with validation.
//!
//! Loads a [`MachineConfig`] and checks, beyond the per-section bounds:
//! at least one axis, no more than `MAX_AXES`, unique axis IDs.

use std::collections::HashSet;
use std::path::Path;

use mc_common::config::{ConfigError, ConfigLoader};
use mc_common::consts::MAX_AXES;
use mc_common::control_unit::config::MachineConfig;
use tracing::debug;

use crate::axis::AxisModel;

// ─── Loaded Config Bundle ───────────────────────────────────────────

/// Validated configuration, ready for runtime use.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub machine: MachineConfig,
    /// Axis models in index order (list order of `[[axes]]`).
    pub axes: Vec<AxisModel>,
}

impl LoadedConfig {
    /// Validate an in-memory configuration and derive the axis models.
    pub fn from_machine(machine: MachineConfig) -> Result<Self, ConfigError> {
        validate_machine_config(&machine)?;
        let axes = machine
            .axes
            .iter()
            .enumerate()
            .map(|(i, ax)| AxisModel::from_config(i, ax))
            .collect();
        Ok(Self { machine, axes })
    }

    /// Control cycle period [s].
    #[inline]
    pub fn period_s(&self) -> f64 {
        self.machine.controller.period_s()
    }
}

// ─── Loading Functions ──────────────────────────────────────────────

/// Load and validate the controller configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<LoadedConfig, ConfigError> {
    debug!("Loading configuration from {}", path.display());
    let machine = MachineConfig::load(path)?;
    LoadedConfig::from_machine(machine)
}

/// Load config from a TOML string (for testing).
pub fn load_config_from_str(text: &str) -> Result<LoadedConfig, ConfigError> {
    let machine = MachineConfig::load_str(text)?;
    LoadedConfig::from_machine(machine)
}

// ─── Validation ─────────────────────────────────────────────────────

pub fn validate_machine_config(machine: &MachineConfig) -> Result<(), ConfigError> {
    machine.shared.validate()?;
    machine
        .controller
        .validate()
        .map_err(ConfigError::Validation)?;
    machine.safety.validate().map_err(ConfigError::Validation)?;

    if machine.axes.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[axes]] entry is required".to_string(),
        ));
    }
    if machine.axes.len() > MAX_AXES {
        return Err(ConfigError::Validation(format!(
            "{} axes configured, at most {MAX_AXES} supported",
            machine.axes.len()
        )));
    }

    let mut seen = HashSet::new();
    for ax in &machine.axes {
        ax.validate().map_err(ConfigError::Validation)?;
        if !seen.insert(ax.axis_id) {
            return Err(ConfigError::Validation(format!(
                "duplicate axis_id {}",
                ax.axis_id
            )));
        }
    }
    Ok(())
}
