//! Kinematic limits of one axis.

use serde::{Deserialize, Serialize};

/// Velocity, acceleration, jerk and position limits of one axis.
///
/// `max_jerk = None` selects trapezoidal profiles for the axis; `Some`
/// selects jerk-limited S-curves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisLimits {
    /// Maximum velocity magnitude [units/s].
    pub max_velocity: f64,
    /// Maximum acceleration magnitude [units/s²].
    pub max_acceleration: f64,
    /// Maximum jerk magnitude [units/s³].
    #[serde(default)]
    pub max_jerk: Option<f64>,
    /// Lower soft position limit [units].
    #[serde(default)]
    pub min_position: Option<f64>,
    /// Upper soft position limit [units].
    #[serde(default)]
    pub max_position: Option<f64>,
}

impl AxisLimits {
    /// Limits without jerk bound or soft position range.
    pub const fn new(max_velocity: f64, max_acceleration: f64) -> Self {
        Self {
            max_velocity,
            max_acceleration,
            max_jerk: None,
            min_position: None,
            max_position: None,
        }
    }

    pub const fn with_jerk(mut self, max_jerk: f64) -> Self {
        self.max_jerk = Some(max_jerk);
        self
    }

    pub const fn with_range(mut self, min_position: f64, max_position: f64) -> Self {
        self.min_position = Some(min_position);
        self.max_position = Some(max_position);
        self
    }

    /// Check that the dynamic limits are usable for planning.
    ///
    /// Returns a static reason so the planner can report it without
    /// allocating.
    pub fn check(&self) -> Result<(), &'static str> {
        if !(self.max_velocity.is_finite() && self.max_velocity > 0.0) {
            return Err("max_velocity must be positive and finite");
        }
        if !(self.max_acceleration.is_finite() && self.max_acceleration > 0.0) {
            return Err("max_acceleration must be positive and finite");
        }
        if let Some(j) = self.max_jerk {
            if !(j.is_finite() && j > 0.0) {
                return Err("max_jerk must be positive and finite");
            }
        }
        if let (Some(lo), Some(hi)) = (self.min_position, self.max_position) {
            if lo > hi {
                return Err("min_position above max_position");
            }
        }
        Ok(())
    }

    /// Returns true if `position` lies inside the soft range (unset bounds are open).
    #[inline]
    pub fn contains(&self, position: f64) -> bool {
        self.min_position.is_none_or(|lo| position >= lo)
            && self.max_position.is_none_or(|hi| position <= hi)
    }
}
