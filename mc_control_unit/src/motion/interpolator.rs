//! Fixed-rate profile sampling.
//!
//! Elapsed time is always `cycle_count * period`, never an accumulated float
//! sum, so sampling does not drift over long moves.

use mc_common::consts::MAX_AXES;

use super::profile::{AxisSetpoint, MotionProfile};

/// Setpoints of all axes for one cycle, fixed size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Setpoint {
    axes: [AxisSetpoint; MAX_AXES],
    count: usize,
}

impl Setpoint {
    #[inline]
    pub fn axis(&self, index: usize) -> Option<&AxisSetpoint> {
        self.as_slice().get(index)
    }

    #[inline]
    pub fn as_slice(&self) -> &[AxisSetpoint] {
        &self.axes[..self.count]
    }
}

/// Result of sampling a profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Setpoint(Setpoint),
    /// Elapsed time is past the profile duration.
    EndOfProfile,
}

/// Sample `profile` at `elapsed` seconds. Idempotent for equal times.
pub fn sample(profile: &MotionProfile, elapsed: f64) -> Sample {
    if elapsed > profile.duration() {
        return Sample::EndOfProfile;
    }
    let count = profile.axis_count().min(MAX_AXES);
    let mut axes = [AxisSetpoint::default(); MAX_AXES];
    profile.sample_into(elapsed, &mut axes[..count]);
    Sample::Setpoint(Setpoint { axes, count })
}

/// Cycle counter for the active profile.
#[derive(Debug, Clone)]
pub struct Interpolator {
    period: f64,
    cycle: u64,
}

impl Interpolator {
    /// `period` is the control cycle time [s].
    pub const fn new(period: f64) -> Self {
        Self { period, cycle: 0 }
    }

    /// Restart at t = 0 for a new profile.
    #[inline]
    pub fn reset(&mut self) {
        self.cycle = 0;
    }

    #[inline]
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Profile time of the next sample [s].
    #[inline]
    pub fn elapsed(&self) -> f64 {
        self.cycle as f64 * self.period
    }

    /// Sample at the current cycle, then advance by one period.
    pub fn next(&mut self, profile: &MotionProfile) -> Sample {
        let s = sample(profile, self.elapsed());
        self.cycle += 1;
        s
    }
}
