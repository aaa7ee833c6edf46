//! Time-parameterized motion profile.
//!
//! Each axis is a contiguous sequence of constant-jerk [`Phase`]s starting at
//! t = 0. Every axis of a profile spans the same total duration; stationary
//! stretches are explicit hold phases. A trapezoidal segment is the special
//! case where every phase has zero jerk.

use serde::Serialize;

/// Commanded state of one axis at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AxisSetpoint {
    pub position: f64,
    pub velocity: f64,
    pub acceleration: f64,
    pub jerk: f64,
}

impl AxisSetpoint {
    /// Setpoint at rest at `position`.
    #[inline]
    pub const fn at_rest(position: f64) -> Self {
        Self {
            position,
            velocity: 0.0,
            acceleration: 0.0,
            jerk: 0.0,
        }
    }
}

/// Constant-jerk piece of one axis trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Phase {
    /// Profile time at which the phase starts [s].
    pub start: f64,
    pub duration: f64,
    pub p0: f64,
    pub v0: f64,
    pub a0: f64,
    pub jerk: f64,
}

impl Phase {
    #[inline]
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Exact polynomial state `tau` seconds into the phase.
    #[inline]
    pub fn state_at(&self, tau: f64) -> AxisSetpoint {
        let j = self.jerk;
        AxisSetpoint {
            position: self.p0
                + self.v0 * tau
                + self.a0 * tau * tau / 2.0
                + j * tau * tau * tau / 6.0,
            velocity: self.v0 + self.a0 * tau + j * tau * tau / 2.0,
            acceleration: self.a0 + j * tau,
            jerk: j,
        }
    }

    /// State at the end of the phase.
    #[inline]
    pub fn end_state(&self) -> AxisSetpoint {
        self.state_at(self.duration)
    }
}

/// Trajectory of one axis over the whole profile.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisProfile {
    phases: Vec<Phase>,
    start_position: f64,
    final_position: f64,
    max_velocity: f64,
    max_acceleration: f64,
}

impl AxisProfile {
    pub(crate) fn new(
        phases: Vec<Phase>,
        start_position: f64,
        final_position: f64,
        max_velocity: f64,
        max_acceleration: f64,
    ) -> Self {
        Self {
            phases,
            start_position,
            final_position,
            max_velocity,
            max_acceleration,
        }
    }

    #[inline]
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    #[inline]
    pub fn start_position(&self) -> f64 {
        self.start_position
    }

    #[inline]
    pub fn final_position(&self) -> f64 {
        self.final_position
    }

    /// Setpoint at profile time `t`, clamped to the axis limits.
    ///
    /// Before the first phase the axis is at rest at its start position;
    /// at or after the last phase end it is at rest at its final position.
    pub fn sample(&self, t: f64) -> AxisSetpoint {
        let Some(last) = self.phases.last() else {
            return AxisSetpoint::at_rest(self.final_position);
        };
        if t >= last.end() {
            return AxisSetpoint::at_rest(self.final_position);
        }
        if t <= 0.0 {
            return AxisSetpoint::at_rest(self.start_position);
        }

        let idx = self
            .phases
            .partition_point(|p| p.end() <= t)
            .min(self.phases.len() - 1);
        let phase = &self.phases[idx];
        let tau = (t - phase.start).clamp(0.0, phase.duration);
        let mut sp = phase.state_at(tau);
        sp.velocity = sp.velocity.clamp(-self.max_velocity, self.max_velocity);
        sp.acceleration = sp
            .acceleration
            .clamp(-self.max_acceleration, self.max_acceleration);
        sp
    }
}

/// Complete multi-axis motion, immutable once planned.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionProfile {
    axes: Vec<AxisProfile>,
    duration: f64,
    segment_count: usize,
}

impl MotionProfile {
    pub(crate) fn new(axes: Vec<AxisProfile>, duration: f64, segment_count: usize) -> Self {
        Self {
            axes,
            duration,
            segment_count,
        }
    }

    /// Total duration [s].
    #[inline]
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Number of non-empty segments.
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    /// True if no axis moves (every segment was skipped).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segment_count == 0
    }

    #[inline]
    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }

    #[inline]
    pub fn axis(&self, index: usize) -> Option<&AxisProfile> {
        self.axes.get(index)
    }

    #[inline]
    pub fn axes(&self) -> &[AxisProfile] {
        &self.axes
    }

    /// Final position of each axis, in index order.
    pub fn final_positions(&self) -> impl Iterator<Item = f64> + '_ {
        self.axes.iter().map(AxisProfile::final_position)
    }

    /// Fill `out` with the setpoints at time `t`. Extra slots are left untouched.
    pub fn sample_into(&self, t: f64, out: &mut [AxisSetpoint]) {
        for (slot, axis) in out.iter_mut().zip(&self.axes) {
            *slot = axis.sample(t);
        }
    }
}
