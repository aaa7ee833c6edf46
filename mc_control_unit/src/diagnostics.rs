//! Diagnostics snapshot published by the control task.
//!
//! Written every `diagnostics_interval` cycles with `try_lock`; a contended
//! cycle simply skips the update. Read with [`crate::service::MotionService::snapshot`].

use heapless::Vec as FixedVec;
use mc_common::consts::MAX_AXES;
use mc_common::control_unit::motion::RequestId;
use mc_common::control_unit::safety::FaultFlags;
use mc_common::control_unit::state::ControlState;
use serde::Serialize;

/// Per-axis values at snapshot time.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AxisSnapshot {
    /// Measured position.
    pub position: f64,
    /// Measured velocity.
    pub velocity: f64,
    /// Commanded (setpoint) position.
    pub commanded: f64,
    /// Actuator command written this cycle.
    pub command: f64,
    /// Following error (commanded − measured).
    pub lag: f64,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DiagnosticsSnapshot {
    pub cycle: u64,
    pub state: ControlState,
    pub faults: FaultFlags,
    pub active_request: Option<RequestId>,
    /// Reports lost because the report channel stayed full.
    pub dropped_reports: u64,
    pub axes: FixedVec<AxisSnapshot, MAX_AXES>,
}

impl DiagnosticsSnapshot {
    /// Largest absolute following error across axes.
    pub fn max_lag(&self) -> f64 {
        self.axes.iter().map(|a| a.lag.abs()).fold(0.0, f64::max)
    }
}
