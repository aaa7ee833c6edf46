//! Trajectory planner: waypoints → synchronized multi-axis profile.
//!
//! Every segment is rest-to-rest. Per moving axis the fastest shape is
//! computed first (trapezoid without a jerk limit, 7-phase S-curve with one);
//! the slowest axis sets the segment duration and every other moving axis is
//! stretched to exactly that duration by lowering its cruise velocity.
//! Stationary axes hold.
//!
//! Pure functions, no side effects.

use mc_common::consts::DISPLACEMENT_EPSILON;
use mc_common::control_unit::axis::AxisLimits;
use mc_common::control_unit::error::PlanningError;
use mc_common::control_unit::motion::Waypoint;
use mc_common::control_unit::safety::AxisIndex;

use super::profile::{AxisProfile, MotionProfile, Phase};

/// Bisection steps when stretching an S-curve; enough to reach f64 resolution.
const STRETCH_ITERATIONS: usize = 96;

// ─── Planner ────────────────────────────────────────────────────────

/// Planner bound to a fixed set of axis limits.
#[derive(Debug, Clone)]
pub struct TrajectoryPlanner {
    limits: Vec<AxisLimits>,
}

impl TrajectoryPlanner {
    pub fn new(limits: Vec<AxisLimits>) -> Self {
        Self { limits }
    }

    #[inline]
    pub fn axis_count(&self) -> usize {
        self.limits.len()
    }

    #[inline]
    pub fn limits(&self) -> &[AxisLimits] {
        &self.limits
    }

    /// Plan from `start` through `waypoints`. See [`plan`].
    pub fn plan(
        &self,
        start: &[f64],
        waypoints: &[Waypoint],
    ) -> Result<MotionProfile, PlanningError> {
        plan(start, waypoints, &self.limits)
    }
}

/// Plan a profile from `start` through every waypoint in order.
///
/// # Errors
/// - `EmptyInput` if `waypoints` is empty
/// - `DimensionMismatch` if `start` or a waypoint does not match `limits`
/// - `Infeasible` for unusable limits on a moving axis, a non-positive
///   target velocity, or non-finite positions
/// - `OutOfLimits` for a target outside the soft position range
pub fn plan(
    start: &[f64],
    waypoints: &[Waypoint],
    limits: &[AxisLimits],
) -> Result<MotionProfile, PlanningError> {
    if waypoints.is_empty() {
        return Err(PlanningError::EmptyInput);
    }
    let n = limits.len();
    if start.len() != n {
        return Err(PlanningError::DimensionMismatch {
            expected: n,
            found: start.len(),
        });
    }
    if let Some(i) = start.iter().position(|p| !p.is_finite()) {
        return Err(PlanningError::Infeasible {
            axis: axis_index(i),
            reason: "start position must be finite",
        });
    }
    validate_waypoints(waypoints, limits)?;

    let mut builders: Vec<PhaseBuilder> = start.iter().map(|&p| PhaseBuilder::new(p)).collect();
    let mut from = start.to_vec();
    let mut shapes: Vec<Option<(RestToRest, f64)>> = vec![None; n];
    let mut t0 = 0.0;
    let mut segments = 0;

    for wp in waypoints {
        let targets = wp.positions();
        let mut duration = 0.0f64;

        for (i, lim) in limits.iter().enumerate() {
            let d = targets[i] - from[i];
            if d.abs() <= DISPLACEMENT_EPSILON {
                shapes[i] = None;
                continue;
            }
            lim.check().map_err(|reason| PlanningError::Infeasible {
                axis: axis_index(i),
                reason,
            })?;
            let cap = wp
                .target_velocity()
                .map_or(lim.max_velocity, |v| v.min(lim.max_velocity));
            let shape = RestToRest::fastest(d.abs(), cap, lim.max_acceleration, lim.max_jerk);
            duration = duration.max(shape.duration());
            shapes[i] = Some((shape, d.signum()));
        }

        if duration <= 0.0 {
            continue;
        }

        for (i, builder) in builders.iter_mut().enumerate() {
            builder.rebase(t0, from[i]);
            match shapes[i] {
                Some((shape, sign)) => {
                    shape.stretch_to(duration).emit(builder, sign, duration);
                    from[i] = targets[i];
                }
                None => builder.hold(duration),
            }
        }
        t0 += duration;
        segments += 1;
    }

    let axes = builders
        .into_iter()
        .zip(limits)
        .enumerate()
        .map(|(i, (b, lim))| b.finish(start[i], from[i], lim))
        .collect();
    Ok(MotionProfile::new(axes, t0, segments))
}

fn validate_waypoints(waypoints: &[Waypoint], limits: &[AxisLimits]) -> Result<(), PlanningError> {
    for wp in waypoints {
        if wp.axis_count() != limits.len() {
            return Err(PlanningError::DimensionMismatch {
                expected: limits.len(),
                found: wp.axis_count(),
            });
        }
        if let Some(v) = wp.target_velocity() {
            if !(v.is_finite() && v > 0.0) {
                return Err(PlanningError::Infeasible {
                    axis: 0,
                    reason: "target velocity must be positive and finite",
                });
            }
        }
        if let Some(tol) = wp.tolerance() {
            if !(tol.is_finite() && tol >= 0.0) {
                return Err(PlanningError::Infeasible {
                    axis: 0,
                    reason: "tolerance must be non-negative and finite",
                });
            }
        }
        for (i, (&p, lim)) in wp.positions().iter().zip(limits).enumerate() {
            if !p.is_finite() {
                return Err(PlanningError::Infeasible {
                    axis: axis_index(i),
                    reason: "target position must be finite",
                });
            }
            if !lim.contains(p) {
                return Err(PlanningError::OutOfLimits {
                    axis: axis_index(i),
                    position: p,
                });
            }
        }
    }
    Ok(())
}

#[inline]
fn axis_index(i: usize) -> AxisIndex {
    // MAX_AXES <= 32, checked in mc_common.
    i as AxisIndex
}

// ─── Rest-to-Rest Shape ─────────────────────────────────────────────

/// Symmetric rest-to-rest move over a positive distance.
///
/// Without a jerk limit the ramps are constant-acceleration (trapezoid);
/// with one they are jerk-limited (S-curve).
#[derive(Debug, Clone, Copy, PartialEq)]
struct RestToRest {
    distance: f64,
    velocity: f64,
    accel: f64,
    jerk: Option<f64>,
}

impl RestToRest {
    /// Minimum-time shape with cruise velocity capped at `vcap`.
    fn fastest(distance: f64, vcap: f64, accel: f64, jerk: Option<f64>) -> Self {
        let reach = match jerk {
            None => (distance * accel).sqrt(),
            Some(j) => scurve_reachable_velocity(distance, accel, j),
        };
        Self {
            distance,
            velocity: vcap.min(reach),
            accel,
            jerk,
        }
    }

    /// `(tj, ta)`: jerk-phase and constant-acceleration-phase durations of one ramp.
    fn ramp(&self) -> (f64, f64) {
        let (v, a) = (self.velocity, self.accel);
        match self.jerk {
            None => (0.0, v / a),
            Some(j) if v * j >= a * a => (a / j, v / a - a / j),
            Some(j) => ((v / j).sqrt(), 0.0),
        }
    }

    fn ramp_time(&self) -> f64 {
        let (tj, ta) = self.ramp();
        2.0 * tj + ta
    }

    fn duration(&self) -> f64 {
        self.ramp_time() + self.distance / self.velocity
    }

    /// Same move, slowed down so that it takes exactly `total` seconds.
    ///
    /// The S-curve variant may finish slightly early; `emit` pads with a hold.
    fn stretch_to(self, total: f64) -> Self {
        if total <= self.duration() {
            return self;
        }
        let velocity = match self.jerk {
            None => {
                let root = (total * total - 4.0 * self.distance / self.accel).max(0.0).sqrt();
                (2.0 * self.distance / (total + root)).min(self.velocity)
            }
            Some(_) => {
                // duration(v) is strictly decreasing on (0, v_fastest].
                let (mut lo, mut hi) = (0.0, self.velocity);
                for _ in 0..STRETCH_ITERATIONS {
                    let mid = 0.5 * (lo + hi);
                    let slower = Self { velocity: mid, ..self };
                    if slower.duration() > total {
                        lo = mid;
                    } else {
                        hi = mid;
                    }
                }
                hi
            }
        };
        Self { velocity, ..self }
    }

    /// Append the phases of this move (mirrored by `sign`) and pad to `total`.
    fn emit(&self, b: &mut PhaseBuilder, sign: f64, total: f64) {
        let (tj, ta) = self.ramp();
        let j = self.jerk.unwrap_or(0.0) * sign;
        let a_peak = if tj > 0.0 { j * tj } else { self.accel * sign };
        let cruise = (self.distance / self.velocity - self.ramp_time()).max(0.0);

        b.push(tj, 0.0, j);
        b.push(ta, a_peak, 0.0);
        b.push(tj, a_peak, -j);
        b.push(cruise, 0.0, 0.0);
        b.push(tj, 0.0, -j);
        b.push(ta, -a_peak, 0.0);
        b.push(tj, -a_peak, j);
        b.hold(total - self.duration());
    }
}

/// Highest cruise velocity an S-curve can reach over `distance` [units/s].
fn scurve_reachable_velocity(distance: f64, accel: f64, jerk: f64) -> f64 {
    // Ramps never reach `accel`: distance = 2 v^(3/2) / sqrt(jerk).
    let v = (distance * jerk.sqrt() / 2.0).powf(2.0 / 3.0);
    if v * jerk <= accel * accel {
        return v;
    }
    // Ramps saturate at `accel`: distance = v²/accel + v·accel/jerk.
    let r = accel / jerk;
    accel / 2.0 * (-r + (r * r + 4.0 * distance / accel).sqrt())
}

// ─── Phase Builder ──────────────────────────────────────────────────

/// Integrates consecutive phases of one axis.
#[derive(Debug)]
struct PhaseBuilder {
    phases: Vec<Phase>,
    t: f64,
    p: f64,
    v: f64,
}

impl PhaseBuilder {
    fn new(position: f64) -> Self {
        Self {
            phases: Vec::new(),
            t: 0.0,
            p: position,
            v: 0.0,
        }
    }

    /// Start a new segment at rest at exactly `position`.
    fn rebase(&mut self, t: f64, position: f64) {
        self.t = t;
        self.p = position;
        self.v = 0.0;
    }

    fn push(&mut self, duration: f64, a0: f64, jerk: f64) {
        if duration <= 0.0 {
            return;
        }
        let phase = Phase {
            start: self.t,
            duration,
            p0: self.p,
            v0: self.v,
            a0,
            jerk,
        };
        let end = phase.end_state();
        self.p = end.position;
        self.v = end.velocity;
        self.t += duration;
        self.phases.push(phase);
    }

    fn hold(&mut self, duration: f64) {
        self.v = 0.0;
        self.push(duration, 0.0, 0.0);
    }

    fn finish(self, start: f64, target: f64, limits: &AxisLimits) -> AxisProfile {
        AxisProfile::new(
            self.phases,
            start,
            target,
            positive_or_unbounded(limits.max_velocity),
            positive_or_unbounded(limits.max_acceleration),
        )
    }
}

/// Clamp bound for sampling; unusable limits only occur on axes that never move.
fn positive_or_unbounded(limit: f64) -> f64 {
    if limit.is_finite() && limit > 0.0 {
        limit
    } else {
        f64::INFINITY
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
