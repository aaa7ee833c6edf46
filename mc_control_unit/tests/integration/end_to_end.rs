//! Full request lifecycle: queue → plan → execute → complete.

use mc_common::control_unit::axis::AxisLimits;
use mc_common::control_unit::motion::{Priority, Waypoint};
use mc_common::control_unit::state::{ControlState, FailureReason, RequestStatus};
use mc_control_unit::motion::interpolator::{Sample, sample};
use mc_control_unit::motion::planner::plan;

use super::{ONE_AXIS, TWO_AXES, rig, run_to_terminal, settle, submit};

#[test]
fn single_axis_move_reaches_target() {
    let (mut mc, mut plant) = rig(ONE_AXIS);
    let id = submit(&mut mc, &[100.0]);

    let mut seen = vec![mc.get_status(id).unwrap()];
    for _ in 0..20_000 {
        mc.cycle(&mut plant);
        let status = mc.get_status(id).unwrap();
        if seen.last() != Some(&status) {
            seen.push(status.clone());
        }
        if status.is_terminal() {
            break;
        }
    }

    assert_eq!(
        seen,
        vec![
            RequestStatus::Queued,
            RequestStatus::Planning,
            RequestStatus::Executing,
            RequestStatus::Completed,
        ]
    );
    assert_eq!(mc.get_controller_state(), ControlState::Idle);

    settle(&mut mc, &mut plant, 500);
    assert!(
        (plant.position(0) - 100.0).abs() < 0.1,
        "final position {}",
        plant.position(0)
    );
    assert!(
        plant.peak_velocity(0) <= 10.05,
        "peak velocity {}",
        plant.peak_velocity(0)
    );
}

#[test]
fn move_takes_planned_duration() {
    // 0 → 100 at v=10, a=5: 2 s ramps + 8 s cruise + 2 s ramps.
    let (mut mc, mut plant) = rig(ONE_AXIS);
    let id = submit(&mut mc, &[100.0]);
    let cycles = mc
        .run_until(&mut plant, 20_000, |mc| {
            mc.get_status(id) == Some(RequestStatus::Completed)
        })
        .unwrap();
    assert!((12_000..=12_010).contains(&cycles), "took {cycles} cycles");
}

#[test]
fn two_axes_arrive_together() {
    let (mut mc, mut plant) = rig(TWO_AXES);

    // Alone, Y would need 7 s for 10 units; X needs 12 s for 100.
    let id = submit(&mut mc, &[100.0, 10.0]);
    let mut y_trace = Vec::new();
    for _ in 0..20_000 {
        mc.cycle(&mut plant);
        y_trace.push(plant.position(1));
        if mc.get_status(id).is_some_and(|s| s.is_terminal()) {
            break;
        }
    }
    assert_eq!(mc.get_status(id), Some(RequestStatus::Completed));

    // Both axes finish with the request.
    assert!((plant.position(0) - 100.0).abs() < 0.05);
    assert!((plant.position(1) - 10.0).abs() < 0.05);

    // Y is still well short of its target a second before the end.
    let one_second_before = y_trace[y_trace.len() - 1000];
    assert!(
        10.0 - one_second_before > 0.1,
        "Y at {one_second_before} one second before completion"
    );
    assert!(plant.peak_velocity(1) < 2.0);
}

#[test]
fn synchronized_profile_ends_together() {
    let limits = [AxisLimits::new(10.0, 5.0), AxisLimits::new(2.0, 1.0)];
    let profile = plan(&[0.0, 0.0], &[Waypoint::new(vec![100.0, 10.0])], &limits).unwrap();
    assert!((profile.duration() - 12.0).abs() < 1e-9);

    let Sample::Setpoint(before) = sample(&profile, profile.duration() - 0.01) else {
        panic!("profile ended early");
    };
    for (axis, target) in [(0, 100.0), (1, 10.0)] {
        let sp = before.axis(axis).unwrap();
        assert!(sp.velocity > 0.0, "axis {axis} stopped early");
        assert!(sp.position < target);
    }
    let Sample::Setpoint(end) = sample(&profile, profile.duration()) else {
        panic!("no setpoint at the end time");
    };
    for (axis, target) in [(0, 100.0), (1, 10.0)] {
        let sp = end.axis(axis).unwrap();
        assert!((sp.position - target).abs() < 1e-9);
        assert!(sp.velocity.abs() < 1e-9);
    }
}

#[test]
fn queued_requests_run_in_priority_order() {
    let (mut mc, mut plant) = rig(ONE_AXIS);
    let low = mc
        .submit_motion(vec![Waypoint::new(vec![1.0])], Priority::LOW)
        .unwrap();
    let high = mc
        .submit_motion(vec![Waypoint::new(vec![-1.0])], Priority::HIGH)
        .unwrap();

    mc.cycle(&mut plant);
    assert_eq!(mc.get_status(high), Some(RequestStatus::Planning));
    assert_eq!(mc.get_status(low), Some(RequestStatus::Queued));

    assert_eq!(
        run_to_terminal(&mut mc, &mut plant, high, 10_000),
        RequestStatus::Completed
    );
    assert_eq!(
        run_to_terminal(&mut mc, &mut plant, low, 10_000),
        RequestStatus::Completed
    );
    settle(&mut mc, &mut plant, 500);
    assert!((plant.position(0) - 1.0).abs() < 0.05);
}

#[test]
fn zero_length_move_completes_immediately() {
    let (mut mc, mut plant) = rig(ONE_AXIS);
    let id = submit(&mut mc, &[0.0]);
    let status = run_to_terminal(&mut mc, &mut plant, id, 5);
    assert_eq!(status, RequestStatus::Completed);
    assert_eq!(mc.get_controller_state(), ControlState::Idle);
}

#[test]
fn infeasible_request_fails_and_controller_stays_idle() {
    let (mut mc, mut plant) = rig(ONE_AXIS);
    let id = submit(&mut mc, &[1.0, 2.0]);
    let status = run_to_terminal(&mut mc, &mut plant, id, 5);
    assert!(matches!(
        status,
        RequestStatus::Failed(FailureReason::Planning(_))
    ));
    assert_eq!(mc.get_controller_state(), ControlState::Idle);

    // The next request still runs.
    let next = submit(&mut mc, &[0.5]);
    assert_eq!(
        run_to_terminal(&mut mc, &mut plant, next, 10_000),
        RequestStatus::Completed
    );
}

#[test]
fn snapshot_reflects_motion() {
    let (mut mc, mut plant) = rig(ONE_AXIS);
    let id = submit(&mut mc, &[100.0]);
    settle(&mut mc, &mut plant, 3000);
    let snap = mc.snapshot();
    assert_eq!(snap.state, ControlState::Executing);
    assert_eq!(snap.active_request, Some(id));
    assert_eq!(snap.axes.len(), 1);
    assert!(snap.axes[0].velocity > 9.0);
    assert!(snap.max_lag() < 0.1);
    assert_eq!(snap.dropped_reports, 0);
}
