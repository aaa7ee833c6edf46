//! System-wide constants for the motion controller workspace.
//!
//! Single source of truth for all numeric limits and defaults.
//! Imported by all crates; no duplication permitted.

/// Maximum number of axes handled by one controller.
///
/// Runtime axis arrays in the control task are sized by this constant so
/// the cycle never allocates. Axis sets are packed into a `u32` mask.
pub const MAX_AXES: usize = 16;

/// Default control cycle time in microseconds (1 kHz = 1000 µs).
pub const CYCLE_TIME_US: u32 = 1000;

/// Minimum accepted control cycle time [µs].
pub const CYCLE_TIME_US_MIN: u32 = 100;

/// Maximum accepted control cycle time [µs].
pub const CYCLE_TIME_US_MAX: u32 = 100_000;

/// Default capacity of the motion request queue.
pub const QUEUE_CAPACITY_DEFAULT: usize = 64;

/// Default number of terminal request statuses kept for `get_status`.
pub const STATUS_HISTORY_DEFAULT: usize = 1024;

/// Default diagnostics publication interval [cycles].
pub const DIAGNOSTICS_INTERVAL_DEFAULT: u32 = 10;

/// Default overspeed factor applied to `max_velocity` by the interlock monitor.
pub const OVERSPEED_FACTOR_DEFAULT: f64 = 1.2;

/// Capacity of the control → service report channel.
pub const REPORT_CHANNEL_CAPACITY: usize = 64;

/// Maximum number of safety events collected in a single cycle.
pub const MAX_CYCLE_EVENTS: usize = 3 * MAX_AXES + 4;

/// Displacements below this magnitude are treated as zero [user units].
pub const DISPLACEMENT_EPSILON: f64 = 1e-12;
