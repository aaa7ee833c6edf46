//! Cancellation, pause and resume.

use mc_common::control_unit::state::{ControlState, RequestStatus};

use super::{ONE_AXIS, rig, run_to_executing, run_to_terminal, settle, submit};

#[test]
fn cancel_executing_reaches_idle_within_one_cycle() {
    let (mut mc, mut plant) = rig(ONE_AXIS);
    let id = submit(&mut mc, &[100.0]);
    run_to_executing(&mut mc, &mut plant, id);
    settle(&mut mc, &mut plant, 500);

    assert!(mc.cancel_motion(id));
    mc.cycle(&mut plant);

    let state = mc.get_controller_state();
    assert!(
        matches!(state, ControlState::Idle | ControlState::Holding),
        "state {state:?}"
    );
    assert_eq!(mc.get_status(id), Some(RequestStatus::Cancelled));
    assert!(!mc.cancel_motion(id));

    // The axis is held near where it was cancelled, not driven to 100.
    settle(&mut mc, &mut plant, 2000);
    assert!(plant.position(0) < 10.0, "position {}", plant.position(0));
}

#[test]
fn cancel_queued_request() {
    let (mut mc, mut plant) = rig(ONE_AXIS);
    let first = submit(&mut mc, &[1.0]);
    let second = submit(&mut mc, &[2.0]);

    assert!(mc.cancel_motion(second));
    assert_eq!(mc.get_status(second), Some(RequestStatus::Cancelled));
    assert_eq!(mc.service().queued(), 1);

    assert_eq!(
        run_to_terminal(&mut mc, &mut plant, first, 10_000),
        RequestStatus::Completed
    );
    settle(&mut mc, &mut plant, 100);
    assert_eq!(mc.get_status(second), Some(RequestStatus::Cancelled));
}

#[test]
fn cancel_while_planning_never_executes() {
    let (mut mc, mut plant) = rig(ONE_AXIS);
    let id = submit(&mut mc, &[50.0]);
    mc.cycle(&mut plant);
    assert_eq!(mc.get_status(id), Some(RequestStatus::Planning));

    assert!(mc.cancel_motion(id));
    assert_eq!(mc.get_status(id), Some(RequestStatus::Cancelled));

    settle(&mut mc, &mut plant, 50);
    assert_eq!(mc.get_controller_state(), ControlState::Idle);
    assert_eq!(mc.get_status(id), Some(RequestStatus::Cancelled));
    assert!(plant.position(0).abs() < 1e-6);
}

#[test]
fn cancel_unknown_request_is_refused() {
    let (mut mc, _plant) = rig(ONE_AXIS);
    assert!(!mc.cancel_motion(mc_common::control_unit::motion::RequestId::new(99)));
}

#[test]
fn pause_holds_and_resume_continues() {
    let (mut mc, mut plant) = rig(ONE_AXIS);
    let id = submit(&mut mc, &[20.0]);
    run_to_executing(&mut mc, &mut plant, id);
    settle(&mut mc, &mut plant, 1500);

    assert!(mc.pause_motion());
    mc.cycle(&mut plant);
    assert_eq!(mc.get_controller_state(), ControlState::Holding);
    assert_eq!(mc.get_status(id), Some(RequestStatus::Holding));

    settle(&mut mc, &mut plant, 2000);
    let paused_at = plant.position(0);
    settle(&mut mc, &mut plant, 500);
    assert!((plant.position(0) - paused_at).abs() < 1e-3);
    assert!(paused_at < 20.0);

    assert!(mc.resume_motion());
    mc.cycle(&mut plant);
    assert_eq!(mc.get_controller_state(), ControlState::Executing);
    assert_eq!(mc.get_status(id), Some(RequestStatus::Executing));

    assert_eq!(
        run_to_terminal(&mut mc, &mut plant, id, 20_000),
        RequestStatus::Completed
    );
    settle(&mut mc, &mut plant, 500);
    assert!((plant.position(0) - 20.0).abs() < 0.1);
}

#[test]
fn cancel_while_holding_goes_idle() {
    let (mut mc, mut plant) = rig(ONE_AXIS);
    let id = submit(&mut mc, &[20.0]);
    run_to_executing(&mut mc, &mut plant, id);
    settle(&mut mc, &mut plant, 500);
    assert!(mc.pause_motion());
    mc.cycle(&mut plant);
    assert_eq!(mc.get_controller_state(), ControlState::Holding);

    assert!(mc.cancel_motion(id));
    mc.cycle(&mut plant);
    assert_eq!(mc.get_controller_state(), ControlState::Idle);
    assert_eq!(mc.get_status(id), Some(RequestStatus::Cancelled));
}
