//! Prelude module for common re-exports.
//!
//! ```rust
//! use mc_common::prelude::*;
//!
//! let limits = AxisLimits::new(10.0, 5.0);
//! assert!(limits.check().is_ok());
//! ```

use std::time::Duration;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::control_unit::config::{AxisConfig, ControllerConfig, MachineConfig, SafetyConfig};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{CYCLE_TIME_US, MAX_AXES};

// ─── Hardware Interface ─────────────────────────────────────────────
pub use crate::hal::driver::{Actuator, HalError, Sensor};
pub use crate::hal::types::{AxisFeedback, InterlockInputs};

// ─── Motion ─────────────────────────────────────────────────────────
pub use crate::control_unit::axis::AxisLimits;
pub use crate::control_unit::control::ControlParameters;
pub use crate::control_unit::error::{PlanningError, SubmitError};
pub use crate::control_unit::motion::{CancelToken, MotionRequest, Priority, RequestId, Waypoint};
pub use crate::control_unit::safety::{AxisIndex, AxisMask, FaultFlags, SafetyEvent};
pub use crate::control_unit::state::{ControlState, FailureReason, RequestStatus};

/// Default control cycle as `Duration`.
pub const DEFAULT_CYCLE_TIME: Duration = Duration::from_micros(CYCLE_TIME_US as u64);
