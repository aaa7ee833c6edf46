//! Per-axis control output and the multi-axis control loop.
//!
//! `command = clamp(PID(error) + FF(v, a), ±out_max)` with the saturation
//! excess fed back into the PID integrator.

use heapless::Vec as FixedVec;
use mc_common::consts::MAX_AXES;
use mc_common::hal::types::AxisFeedback;

use super::feedforward::FeedforwardGains;
use super::pid::{PidGains, PidState};
use crate::axis::AxisModel;
use crate::motion::profile::AxisSetpoint;

/// Output of one control step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlOutput {
    /// Actuator command after clamping.
    pub command: f64,
    /// True when the clamp was active.
    pub saturated: bool,
    /// Following error (setpoint − measured).
    pub error: f64,
}

// ─── AxisController ─────────────────────────────────────────────────

/// Control law and state of one axis.
#[derive(Debug, Clone)]
pub struct AxisController {
    pid_gains: PidGains,
    ff_gains: FeedforwardGains,
    out_max: f64,
    pid: PidState,
}

impl AxisController {
    pub fn new(axis: &AxisModel) -> Self {
        Self {
            pid_gains: PidGains::from_params(&axis.control),
            ff_gains: FeedforwardGains::from_params(&axis.control),
            out_max: axis.control.out_max,
            pid: PidState::default(),
        }
    }

    /// Track a setpoint for one cycle.
    pub fn compute(
        &mut self,
        setpoint: &AxisSetpoint,
        feedback: &AxisFeedback,
        dt: f64,
    ) -> ControlOutput {
        let error = setpoint.position - feedback.position;
        let pid = self.pid.update(&self.pid_gains, error, dt);
        let ff = self
            .ff_gains
            .compute(setpoint.velocity, setpoint.acceleration);

        let raw = pid + ff;
        let command = raw.clamp(-self.out_max, self.out_max);
        let saturated = command != raw;
        if saturated {
            self.pid.back_calculate(&self.pid_gains, command - raw, dt);
        }

        ControlOutput {
            command,
            saturated,
            error,
        }
    }

    /// Hold `position` at rest.
    #[inline]
    pub fn hold(&mut self, position: f64, feedback: &AxisFeedback, dt: f64) -> ControlOutput {
        self.compute(&AxisSetpoint::at_rest(position), feedback, dt)
    }

    /// Zero the PID memory.
    #[inline]
    pub fn reset(&mut self) {
        self.pid.reset();
    }
}

// ─── ControlLoop ────────────────────────────────────────────────────

/// Control law for every configured axis, in index order.
#[derive(Debug, Clone)]
pub struct ControlLoop {
    axes: FixedVec<AxisController, MAX_AXES>,
}

impl ControlLoop {
    /// Build controllers for at most `MAX_AXES` axes.
    pub fn new(axes: &[AxisModel]) -> Self {
        let mut controllers = FixedVec::new();
        for axis in axes.iter().take(MAX_AXES) {
            // Capacity bounded by take(MAX_AXES).
            let _ = controllers.push(AxisController::new(axis));
        }
        Self { axes: controllers }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.axes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    /// Track `setpoint` on `axis`. Unknown axes yield a zero output.
    #[inline]
    pub fn track(
        &mut self,
        axis: usize,
        setpoint: &AxisSetpoint,
        feedback: &AxisFeedback,
        dt: f64,
    ) -> ControlOutput {
        self.axes
            .get_mut(axis)
            .map(|c| c.compute(setpoint, feedback, dt))
            .unwrap_or_default()
    }

    /// Hold `position` on `axis`.
    #[inline]
    pub fn hold(
        &mut self,
        axis: usize,
        position: f64,
        feedback: &AxisFeedback,
        dt: f64,
    ) -> ControlOutput {
        self.axes
            .get_mut(axis)
            .map(|c| c.hold(position, feedback, dt))
            .unwrap_or_default()
    }

    pub fn reset_all(&mut self) {
        for c in self.axes.iter_mut() {
            c.reset();
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
