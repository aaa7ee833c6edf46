//! Configuration structures for the motion controller.
//!
//! All types deserialize from one TOML document. Numeric parameters are
//! bounds-checked by `validate()`; optional fields use `#[serde(default)]`.
//!
//! ```toml
//! [shared]
//! service_name = "mc-bench"
//!
//! [controller]
//! cycle_time_us = 1000
//!
//! [[axes]]
//! axis_id = 1
//! name = "X"
//! max_velocity = 10.0
//! max_acceleration = 5.0
//!
//! [axes.control]
//! kp = 400.0
//! kd = 30.0
//! ```

use serde::{Deserialize, Serialize};

use crate::config::SharedConfig;
use crate::consts::{
    CYCLE_TIME_US, CYCLE_TIME_US_MAX, CYCLE_TIME_US_MIN, DIAGNOSTICS_INTERVAL_DEFAULT, MAX_AXES,
    OVERSPEED_FACTOR_DEFAULT, QUEUE_CAPACITY_DEFAULT, STATUS_HISTORY_DEFAULT,
};

use super::axis::AxisLimits;
use super::control::ControlParameters;

// ─── Controller ─────────────────────────────────────────────────────

/// Cycle timing and bookkeeping sizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Control cycle period [µs].
    #[serde(default = "default_cycle_time_us")]
    pub cycle_time_us: u32,

    /// Maximum number of queued (not yet planned) requests.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Number of terminal statuses remembered for `get_status`.
    #[serde(default = "default_status_history")]
    pub status_history: usize,

    /// Diagnostics snapshot publication interval [cycles].
    #[serde(default = "default_diagnostics_interval")]
    pub diagnostics_interval: u32,
}

fn default_cycle_time_us() -> u32 {
    CYCLE_TIME_US
}
fn default_queue_capacity() -> usize {
    QUEUE_CAPACITY_DEFAULT
}
fn default_status_history() -> usize {
    STATUS_HISTORY_DEFAULT
}
fn default_diagnostics_interval() -> u32 {
    DIAGNOSTICS_INTERVAL_DEFAULT
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            cycle_time_us: default_cycle_time_us(),
            queue_capacity: default_queue_capacity(),
            status_history: default_status_history(),
            diagnostics_interval: default_diagnostics_interval(),
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.cycle_time_us < CYCLE_TIME_US_MIN || self.cycle_time_us > CYCLE_TIME_US_MAX {
            return Err(format!(
                "cycle_time_us {} out of range [{}, {}]",
                self.cycle_time_us, CYCLE_TIME_US_MIN, CYCLE_TIME_US_MAX
            ));
        }
        if self.queue_capacity == 0 {
            return Err("queue_capacity must be at least 1".to_string());
        }
        if self.diagnostics_interval == 0 {
            return Err("diagnostics_interval must be at least 1".to_string());
        }
        Ok(())
    }

    /// Cycle period in seconds.
    #[inline]
    pub fn period_s(&self) -> f64 {
        f64::from(self.cycle_time_us) * 1e-6
    }
}

// ─── Safety ─────────────────────────────────────────────────────────

/// Interlock monitor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Measured speed above `overspeed_factor * max_velocity` raises `LimitExceeded`.
    #[serde(default = "default_overspeed_factor")]
    pub overspeed_factor: f64,

    /// Refuse reset while any hardware limit switch is tripped.
    #[serde(default = "default_true")]
    pub limit_switch_blocks_reset: bool,
}

fn default_overspeed_factor() -> f64 {
    OVERSPEED_FACTOR_DEFAULT
}
fn default_true() -> bool {
    true
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            overspeed_factor: default_overspeed_factor(),
            limit_switch_blocks_reset: true,
        }
    }
}

impl SafetyConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.overspeed_factor.is_finite() || self.overspeed_factor < 1.0 {
            return Err(format!(
                "overspeed_factor must be >= 1.0, got {}",
                self.overspeed_factor
            ));
        }
        Ok(())
    }
}

// ─── Axes ───────────────────────────────────────────────────────────

/// One `[[axes]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisConfig {
    /// Axis ID (1-based, 1..=MAX_AXES). Axis index = position in the list.
    pub axis_id: u8,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    pub max_velocity: f64,
    pub max_acceleration: f64,
    #[serde(default)]
    pub max_jerk: Option<f64>,
    #[serde(default)]
    pub min_position: Option<f64>,
    #[serde(default)]
    pub max_position: Option<f64>,
    #[serde(default)]
    pub control: ControlParameters,
}

impl AxisConfig {
    /// Kinematic limits used by the planner.
    pub fn limits(&self) -> AxisLimits {
        AxisLimits {
            max_velocity: self.max_velocity,
            max_acceleration: self.max_acceleration,
            max_jerk: self.max_jerk,
            min_position: self.min_position,
            max_position: self.max_position,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.axis_id == 0 || usize::from(self.axis_id) > MAX_AXES {
            return Err(format!(
                "axis_id {} out of range [1, {}]",
                self.axis_id, MAX_AXES
            ));
        }
        self.limits()
            .check()
            .map_err(|reason| format!("axis {}: {reason}", self.axis_id))?;
        self.control
            .validate()
            .map_err(|reason| format!("axis {}: {reason}", self.axis_id))
    }
}

// ─── Top-Level ──────────────────────────────────────────────────────

/// Complete controller configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
    #[serde(default)]
    pub shared: SharedConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
    pub axes: Vec<AxisConfig>,
}

impl MachineConfig {
    /// Limits of all axes, in axis-index order.
    pub fn axis_limits(&self) -> Vec<AxisLimits> {
        self.axes.iter().map(AxisConfig::limits).collect()
    }
}
