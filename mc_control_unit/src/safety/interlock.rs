//! Per-cycle interlock scan.
//!
//! Turns raw feedback and discrete inputs into [`SafetyEvent`]s:
//!
//! | Check                    | Event                | Condition |
//! |--------------------------|----------------------|-----------|
//! | read error / non-finite  | `SensorFault(i)`     | yes       |
//! | estop input / read error | `EstopPressed`       | yes       |
//! | limit switch             | `LimitExceeded(i)`   | yes       |
//! | overspeed                | `LimitExceeded(i)`   | no        |
//! | following error          | `LimitExceeded(i)`   | no        |
//! | soft position range      | `LimitExceeded(i)`   | no        |
//!
//! "Condition" checks are also reported in [`ActiveConditions`] and block a
//! reset while asserted. At most one event is raised per axis per scan.

use heapless::Vec as FixedVec;
use mc_common::consts::{MAX_AXES, MAX_CYCLE_EVENTS};
use mc_common::control_unit::axis::AxisLimits;
use mc_common::control_unit::safety::{AxisIndex, AxisMask, SafetyEvent};
use mc_common::hal::driver::HalError;
use mc_common::hal::types::{AxisFeedback, InterlockInputs};

use super::recovery::ActiveConditions;
use crate::axis::AxisModel;
use crate::control::lag::evaluate_lag;

/// Safety events raised in one cycle.
pub type EventBuffer = FixedVec<SafetyEvent, MAX_CYCLE_EVENTS>;

/// Everything the monitor inspects in one cycle.
#[derive(Debug, Clone, Copy)]
pub struct ScanInput<'a> {
    /// Measured state, one entry per axis.
    pub feedback: &'a [AxisFeedback],
    /// Axes whose read failed this cycle.
    pub read_errors: AxisMask,
    pub interlocks: Result<InterlockInputs, HalError>,
    /// Positions commanded in the previous cycle; `None` disables the lag check.
    pub commanded: Option<&'a [f64]>,
    /// Check the soft position range (only while a request owns the axes).
    pub soft_limits: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct AxisGuard {
    limits: AxisLimits,
    lag_error_limit: f64,
}

#[derive(Debug, Clone)]
pub struct InterlockMonitor {
    axes: FixedVec<AxisGuard, MAX_AXES>,
    overspeed_factor: f64,
}

impl InterlockMonitor {
    pub fn new(axes: &[AxisModel], overspeed_factor: f64) -> Self {
        let mut guards = FixedVec::new();
        for axis in axes.iter().take(MAX_AXES) {
            let _ = guards.push(AxisGuard {
                limits: axis.limits,
                lag_error_limit: axis.control.lag_error_limit,
            });
        }
        Self {
            axes: guards,
            overspeed_factor,
        }
    }

    /// Scan one cycle. Events are appended to `events`.
    pub fn scan(&self, input: &ScanInput<'_>, events: &mut EventBuffer) -> ActiveConditions {
        let mut conditions = ActiveConditions::default();

        let interlocks = match input.interlocks {
            Ok(inputs) => inputs,
            Err(_) => InterlockInputs {
                estop: true,
                limit_switches: AxisMask::EMPTY,
            },
        };
        if interlocks.estop {
            conditions.estop = true;
            let _ = events.push(SafetyEvent::EstopPressed);
        }

        for (i, guard) in self.axes.iter().enumerate() {
            let index = i as AxisIndex;
            let feedback = input.feedback.get(i).copied();

            let fb = match feedback {
                Some(fb) if !input.read_errors.contains(i) && fb.is_finite() => fb,
                _ => {
                    conditions.sensor_faults.insert(i);
                    let _ = events.push(SafetyEvent::SensorFault(index));
                    continue;
                }
            };

            if interlocks.limit_switches.contains(i) {
                conditions.limit_switches.insert(i);
                let _ = events.push(SafetyEvent::LimitExceeded(index));
                continue;
            }

            if self.overspeed(guard, fb.velocity)
                || self.lagging(guard, i, fb.position, input.commanded)
                || (input.soft_limits && !guard.limits.contains(fb.position))
            {
                let _ = events.push(SafetyEvent::LimitExceeded(index));
            }
        }

        conditions
    }

    #[inline]
    fn overspeed(&self, guard: &AxisGuard, velocity: f64) -> bool {
        velocity.abs() > self.overspeed_factor * guard.limits.max_velocity
    }

    #[inline]
    fn lagging(&self, guard: &AxisGuard, axis: usize, actual: f64, commanded: Option<&[f64]>) -> bool {
        match commanded.and_then(|c| c.get(axis)) {
            Some(&target) => evaluate_lag(target, actual, guard.lag_error_limit).exceeded,
            None => false,
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
