//! Per-axis control law parameters.

use serde::{Deserialize, Serialize};

/// Gains for the position control law of one axis.
///
/// Each component is disabled by setting its gain to zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlParameters {
    // ─── PID ────────────────────────────────────────
    /// Proportional gain.
    #[serde(default)]
    pub kp: f64,
    /// Integral gain (0 = disabled).
    #[serde(default)]
    pub ki: f64,
    /// Derivative gain (0 = disabled).
    #[serde(default)]
    pub kd: f64,
    /// Derivative filter time constant [s].
    #[serde(default)]
    pub tf: f64,
    /// Anti-windup tracking time constant [s] (0 = automatic).
    #[serde(default)]
    pub tt: f64,

    // ─── Feedforward ────────────────────────────────
    /// Velocity feedforward gain (0 = disabled).
    #[serde(default)]
    pub kvff: f64,
    /// Acceleration feedforward gain (0 = disabled).
    #[serde(default)]
    pub kaff: f64,
    /// Static friction offset (0 = disabled).
    #[serde(default)]
    pub friction: f64,

    /// Output saturation limit.
    #[serde(default = "default_out_max")]
    pub out_max: f64,

    /// Maximum following error before `LimitExceeded` [units] (0 = disabled).
    #[serde(default)]
    pub lag_error_limit: f64,
}

fn default_out_max() -> f64 {
    100.0
}

impl Default for ControlParameters {
    fn default() -> Self {
        Self {
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            tf: 0.0,
            tt: 0.0,
            kvff: 0.0,
            kaff: 0.0,
            friction: 0.0,
            out_max: default_out_max(),
            lag_error_limit: 0.0,
        }
    }
}

impl ControlParameters {
    /// Check gains for sign and finiteness.
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("kp", self.kp),
            ("ki", self.ki),
            ("kd", self.kd),
            ("tf", self.tf),
            ("tt", self.tt),
            ("kvff", self.kvff),
            ("kaff", self.kaff),
            ("friction", self.friction),
            ("lag_error_limit", self.lag_error_limit),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{name} must be finite and >= 0, got {value}"));
            }
        }
        if !self.out_max.is_finite() || self.out_max <= 0.0 {
            return Err(format!("out_max must be positive, got {}", self.out_max));
        }
        Ok(())
    }
}
