//! Property tests: planned profiles never exceed the axis limits.

use mc_common::control_unit::axis::AxisLimits;
use mc_common::control_unit::motion::Waypoint;
use mc_control_unit::motion::interpolator::{Sample, sample};
use mc_control_unit::motion::planner::plan;
use mc_control_unit::motion::profile::MotionProfile;
use proptest::prelude::*;

const SAMPLES: usize = 2000;
/// Evaluation points per phase, ends included.
const PHASE_POINTS: usize = 8;
const REL_TOL: f64 = 1e-6;

fn limits_strategy() -> impl Strategy<Value = AxisLimits> {
    (0.5f64..20.0, 0.5f64..20.0, prop::option::of(1.0f64..200.0)).prop_map(|(v, a, j)| {
        let limits = AxisLimits::new(v, a);
        match j {
            Some(j) => limits.with_jerk(j),
            None => limits,
        }
    })
}

/// Axis limits, a start point and 1..=3 waypoints of matching dimension.
fn scenario() -> impl Strategy<Value = (Vec<AxisLimits>, Vec<f64>, Vec<Vec<f64>>)> {
    (1usize..=3).prop_flat_map(|n| {
        (
            prop::collection::vec(limits_strategy(), n),
            prop::collection::vec(-50.0f64..50.0, n),
            prop::collection::vec(prop::collection::vec(-50.0f64..50.0, n), 1..=3),
        )
    })
}

fn within(value: f64, limit: f64) -> bool {
    value.abs() <= limit * (1.0 + REL_TOL) + 1e-9
}

fn setpoints(profile: &MotionProfile, t: f64) -> Vec<(f64, f64, f64, f64)> {
    match sample(profile, t) {
        Sample::Setpoint(sp) => sp
            .as_slice()
            .iter()
            .map(|s| (s.position, s.velocity, s.acceleration, s.jerk))
            .collect(),
        Sample::EndOfProfile => panic!("sampled past the end at t={t}"),
    }
}

proptest! {
    #[test]
    fn profiles_respect_limits((limits, start, targets) in scenario()) {
        let waypoints: Vec<Waypoint> = targets.iter().cloned().map(Waypoint::new).collect();
        let profile = plan(&start, &waypoints, &limits).unwrap();
        prop_assert!(profile.duration().is_finite());

        let dt = profile.duration() / SAMPLES as f64;
        let mut previous = setpoints(&profile, 0.0);
        for k in 1..=SAMPLES {
            let t = (k as f64 * dt).min(profile.duration());
            let now = setpoints(&profile, t);
            for (i, lim) in limits.iter().enumerate() {
                // Position is never clamped: its rate checks the raw polynomial.
                let p = now[i].0;
                let dp = p - previous[i].0;
                prop_assert!(
                    within(dp, lim.max_velocity * dt),
                    "axis {i} moved {dp} in {dt} s at t={t}"
                );
            }
            previous = now;
        }

        // Sampled v/a/j are clamped; evaluate the phase polynomials directly.
        for (i, (axis, lim)) in profile.axes().iter().zip(&limits).enumerate() {
            for phase in axis.phases() {
                for step in 0..=PHASE_POINTS {
                    let tau = phase.duration * step as f64 / PHASE_POINTS as f64;
                    let s = phase.state_at(tau);
                    let at = phase.start + tau;
                    prop_assert!(within(s.velocity, lim.max_velocity), "axis {i} v={} at t={at}", s.velocity);
                    prop_assert!(
                        within(s.acceleration, lim.max_acceleration),
                        "axis {i} a={} at t={at}",
                        s.acceleration
                    );
                    if let Some(max_jerk) = lim.max_jerk {
                        prop_assert!(within(s.jerk, max_jerk), "axis {i} j={} at t={at}", s.jerk);
                    }
                }
            }
        }

        let end = setpoints(&profile, profile.duration());
        let last = targets.last().unwrap();
        for (i, target) in last.iter().enumerate() {
            prop_assert!((end[i].0 - target).abs() < 1e-6, "axis {i} ends at {}", end[i].0);
            prop_assert!(end[i].1.abs() < 1e-9);
        }
    }

    #[test]
    fn sampling_is_idempotent(
        (limits, start, targets) in scenario(),
        fraction in 0.0f64..=1.0,
    ) {
        let waypoints: Vec<Waypoint> = targets.iter().cloned().map(Waypoint::new).collect();
        let profile = plan(&start, &waypoints, &limits).unwrap();
        let t = profile.duration() * fraction;
        prop_assert_eq!(sample(&profile, t), sample(&profile, t));
    }

    #[test]
    fn moving_axes_finish_together(
        v1 in 0.5f64..20.0,
        a1 in 0.5f64..20.0,
        v2 in 0.5f64..20.0,
        a2 in 0.5f64..20.0,
        d1 in 1.0f64..100.0,
        d2 in 1.0f64..100.0,
    ) {
        let limits = [AxisLimits::new(v1, a1), AxisLimits::new(v2, a2)];
        let profile = plan(&[0.0, 0.0], &[Waypoint::new(vec![d1, d2])], &limits).unwrap();

        // Shortly before the end both axes are still short of their targets.
        let t = profile.duration() * (1.0 - 1e-3);
        let before = setpoints(&profile, t);
        prop_assert!(before[0].0 < d1);
        prop_assert!(before[1].0 < d2);
        prop_assert!(before[0].1 > 0.0);
        prop_assert!(before[1].1 > 0.0);
    }
}
