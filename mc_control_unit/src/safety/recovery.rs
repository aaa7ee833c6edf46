//! Reset gating.
//!
//! A latched fault may only be cleared once every condition that can
//! re-trigger it has gone: emergency stop released, sensors readable and
//! finite, and (when configured) no limit switch active.

use mc_common::control_unit::safety::AxisMask;

/// Safety conditions asserted in the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActiveConditions {
    pub estop: bool,
    pub sensor_faults: AxisMask,
    pub limit_switches: AxisMask,
}

impl ActiveConditions {
    /// Reason a reset must be refused, or `None` if it may proceed.
    pub const fn reset_blocker(&self, limit_switch_blocks_reset: bool) -> Option<&'static str> {
        if self.estop {
            Some("emergency stop still asserted")
        } else if !self.sensor_faults.is_empty() {
            Some("sensor fault still asserted")
        } else if limit_switch_blocks_reset && !self.limit_switches.is_empty() {
            Some("limit switch still active")
        } else {
            None
        }
    }
}
