//! Safety preemption and fault recovery.

use mc_common::control_unit::safety::{FaultFlags, SafetyEvent};
use mc_common::control_unit::state::{ControlState, FailureReason, RequestStatus};

use super::{ONE_AXIS, rig, run_to_executing, run_to_terminal, settle, submit};

// ── Helpers ─────────────────────────────────────────────────────────

fn safety_failure(event: SafetyEvent) -> Option<RequestStatus> {
    Some(RequestStatus::Failed(FailureReason::Safety(event)))
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn hardware_estop_stops_motion_on_next_cycle() {
    let (mut mc, mut plant) = rig(ONE_AXIS);
    let id = submit(&mut mc, &[100.0]);
    run_to_executing(&mut mc, &mut plant, id);
    settle(&mut mc, &mut plant, 1000);
    assert!(plant.velocity(0) > 1.0);

    plant.set_estop(true);
    mc.cycle(&mut plant);

    assert_eq!(mc.get_controller_state(), ControlState::Estopped);
    assert_eq!(mc.get_status(id), safety_failure(SafetyEvent::EstopPressed));
    assert!(mc.task().latched_faults().contains(FaultFlags::ESTOP));
    assert_eq!(plant.velocity(0), 0.0);
    assert_eq!(plant.command(0), 0.0);
}

#[test]
fn reset_refused_while_estop_held() {
    let (mut mc, mut plant) = rig(ONE_AXIS);
    plant.set_estop(true);
    mc.cycle(&mut plant);
    assert_eq!(mc.get_controller_state(), ControlState::Estopped);
    assert!(!mc.reset_fault());

    plant.set_estop(false);
    mc.cycle(&mut plant);
    assert_eq!(mc.get_controller_state(), ControlState::Estopped);
    assert!(mc.reset_fault());
    mc.cycle(&mut plant);
    assert_eq!(mc.get_controller_state(), ControlState::Idle);
    assert!(mc.task().latched_faults().is_empty());
}

#[test]
fn reset_refused_while_sensor_fault_asserted() {
    let (mut mc, mut plant) = rig(ONE_AXIS);
    plant.set_sensor_fault(0, true);
    mc.cycle(&mut plant);
    assert_eq!(mc.get_controller_state(), ControlState::Faulted);
    assert!(mc.task().latched_faults().contains(FaultFlags::SENSOR_FAULT));

    assert!(!mc.reset_fault());
    mc.cycle(&mut plant);
    assert_eq!(mc.get_controller_state(), ControlState::Faulted);

    plant.set_sensor_fault(0, false);
    mc.cycle(&mut plant);
    assert!(mc.reset_fault());
    mc.cycle(&mut plant);
    assert_eq!(mc.get_controller_state(), ControlState::Idle);
}

#[test]
fn sensor_fault_fails_executing_request() {
    let (mut mc, mut plant) = rig(ONE_AXIS);
    let id = submit(&mut mc, &[100.0]);
    run_to_executing(&mut mc, &mut plant, id);
    settle(&mut mc, &mut plant, 100);

    plant.set_sensor_fault(0, true);
    mc.cycle(&mut plant);
    assert_eq!(mc.get_controller_state(), ControlState::Faulted);
    assert_eq!(mc.get_status(id), safety_failure(SafetyEvent::SensorFault(0)));
}

#[test]
fn limit_switch_blocks_reset_until_released() {
    let (mut mc, mut plant) = rig(ONE_AXIS);
    plant.set_limit_switch(0, true);
    mc.cycle(&mut plant);
    assert_eq!(mc.get_controller_state(), ControlState::Faulted);
    assert!(mc.task().latched_faults().contains(FaultFlags::LIMIT_EXCEEDED));
    assert!(!mc.reset_fault());

    plant.set_limit_switch(0, false);
    mc.cycle(&mut plant);
    assert!(mc.reset_fault());
    mc.cycle(&mut plant);
    assert_eq!(mc.get_controller_state(), ControlState::Idle);
}

#[test]
fn drive_fault_preempts_on_following_cycle() {
    let (mut mc, mut plant) = rig(ONE_AXIS);
    let id = submit(&mut mc, &[100.0]);
    run_to_executing(&mut mc, &mut plant, id);

    plant.set_drive_fault(0, true);
    mc.cycle(&mut plant);
    assert_eq!(mc.get_controller_state(), ControlState::Executing);
    mc.cycle(&mut plant);
    assert_eq!(mc.get_controller_state(), ControlState::Faulted);
    assert_eq!(mc.get_status(id), safety_failure(SafetyEvent::DriveFault(0)));
}

#[test]
fn following_error_trips_limit() {
    let config = super::ONE_AXIS.replace("out_max = 1000.0", "out_max = 1000.0\nlag_error_limit = 0.01");
    let (mut mc, _) = rig(&config);
    // Ten times the mass the feedforward was tuned for.
    let mut plant = mc_control_unit::sim::SimulatedPlant::new(1, 0.001).with_dynamics(10.0, 0.5);
    mc.cycle(&mut plant);

    let id = submit(&mut mc, &[100.0]);
    let status = run_to_terminal(&mut mc, &mut plant, id, 5000);
    assert_eq!(
        Some(status),
        safety_failure(SafetyEvent::LimitExceeded(0))
    );
    assert_eq!(mc.get_controller_state(), ControlState::Faulted);
}

#[test]
fn queued_request_waits_for_reset() {
    let (mut mc, mut plant) = rig(ONE_AXIS);
    mc.emergency_stop();
    mc.cycle(&mut plant);
    assert_eq!(mc.get_controller_state(), ControlState::Estopped);

    let id = submit(&mut mc, &[1.0]);
    settle(&mut mc, &mut plant, 10);
    assert_eq!(mc.get_status(id), Some(RequestStatus::Queued));

    assert!(mc.reset_fault());
    assert_eq!(
        run_to_terminal(&mut mc, &mut plant, id, 10_000),
        RequestStatus::Completed
    );
}

#[test]
fn fault_states_refuse_motion_commands() {
    let (mut mc, mut plant) = rig(ONE_AXIS);
    mc.emergency_stop();
    mc.cycle(&mut plant);
    assert!(!mc.pause_motion());
    assert!(!mc.resume_motion());
    mc.cycle(&mut plant);
    assert_eq!(mc.get_controller_state(), ControlState::Estopped);
}
