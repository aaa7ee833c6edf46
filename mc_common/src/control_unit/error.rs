//! Planning and submission errors.

use serde::Serialize;
use thiserror::Error;

use super::safety::AxisIndex;

/// Reasons the planner refuses a set of waypoints.
///
/// Reported through `RequestStatus::Failed`; the controller returns to `Idle`.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
pub enum PlanningError {
    /// No waypoints supplied.
    #[error("empty waypoint list")]
    EmptyInput,

    /// An axis cannot perform the requested segment within its limits.
    #[error("axis {axis} infeasible: {reason}")]
    Infeasible {
        axis: AxisIndex,
        reason: &'static str,
    },

    /// A waypoint does not have one target per configured axis.
    #[error("waypoint has {found} axes, controller has {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    /// A target lies outside the axis soft position range.
    #[error("axis {axis} target {position} outside soft limits")]
    OutOfLimits { axis: AxisIndex, position: f64 },

    /// The profile starts away from the position the axis holds.
    #[error("axis {axis} planned from {planned}, holding {held}")]
    StaleStart {
        axis: AxisIndex,
        planned: f64,
        held: f64,
    },
}

/// Reasons `submit_motion` refuses a request outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The motion queue is at capacity.
    #[error("motion queue full ({capacity} requests)")]
    QueueFull { capacity: usize },
}
