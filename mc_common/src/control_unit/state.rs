//! Controller and request state enums.
//!
//! `ControlState` is `#[repr(u8)]` so the control task can publish it through
//! an `AtomicU8` and readers decode it with [`ControlState::from_u8`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::error::PlanningError;
use super::safety::SafetyEvent;

// ─── Controller State ───────────────────────────────────────────────

/// Global controller state.
///
/// Owned by the safety supervisor. `Faulted` and `Estopped` are sticky until
/// an accepted reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ControlState {
    /// No motion, axes holding position.
    Idle = 0,
    /// A request has been taken from the queue and is being planned.
    Planning = 1,
    /// A profile is being interpolated and tracked.
    Executing = 2,
    /// Motion suspended, axes holding the last commanded position.
    Holding = 3,
    /// Safety fault latched. Axes disabled.
    Faulted = 4,
    /// Emergency stop latched. Axes disabled.
    Estopped = 5,
}

impl ControlState {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Idle),
            1 => Some(Self::Planning),
            2 => Some(Self::Executing),
            3 => Some(Self::Holding),
            4 => Some(Self::Faulted),
            5 => Some(Self::Estopped),
            _ => None,
        }
    }

    /// Returns true for the latched safety states.
    #[inline]
    pub const fn is_fault(&self) -> bool {
        matches!(self, Self::Faulted | Self::Estopped)
    }

    /// Returns true while a request owns the axes.
    #[inline]
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::Planning | Self::Executing | Self::Holding)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Planning => "Planning",
            Self::Executing => "Executing",
            Self::Holding => "Holding",
            Self::Faulted => "Faulted",
            Self::Estopped => "Estopped",
        }
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for ControlState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Request Status ─────────────────────────────────────────────────

/// Why a request ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
pub enum FailureReason {
    /// The planner rejected the waypoints.
    #[error("planning failed: {0}")]
    Planning(#[from] PlanningError),
    /// A safety event stopped the controller while the request owned the axes.
    #[error("safety stop: {0}")]
    Safety(SafetyEvent),
}

/// Lifecycle of a motion request as seen by `get_status`.
///
/// Exactly one of `Completed`, `Cancelled` or `Failed` is reached per request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RequestStatus {
    Queued,
    Planning,
    Executing,
    Holding,
    Completed,
    Cancelled,
    Failed(FailureReason),
}

impl RequestStatus {
    /// Returns true once the request has resolved.
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed(_))
    }
}
