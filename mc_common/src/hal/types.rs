//! Data exchanged between the control task and the drivers.

use serde::{Deserialize, Serialize};

use crate::control_unit::safety::AxisMask;

/// Measured state of one axis, as returned by [`Sensor::read_state`].
///
/// [`Sensor::read_state`]: crate::hal::driver::Sensor::read_state
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AxisFeedback {
    /// Actual position [user units].
    pub position: f64,
    /// Actual velocity [user units/s].
    pub velocity: f64,
}

impl AxisFeedback {
    #[inline]
    pub const fn new(position: f64, velocity: f64) -> Self {
        Self { position, velocity }
    }

    /// Returns true if both fields are finite (not NaN, not Inf).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite()
    }
}

/// Discrete safety inputs sampled once per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InterlockInputs {
    /// Emergency stop circuit open.
    pub estop: bool,
    /// Axes whose hardware limit switch is tripped.
    pub limit_switches: AxisMask,
}

impl InterlockInputs {
    /// Returns true if no input demands a stop.
    #[inline]
    pub const fn is_clear(&self) -> bool {
        !self.estop && self.limit_switches.is_empty()
    }
}
