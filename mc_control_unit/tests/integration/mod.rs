//! Shared rigs for the integration tests.

mod cancellation;
mod config;
mod end_to_end;
mod planner_properties;
mod safety;

use mc_common::control_unit::motion::{Priority, RequestId, Waypoint};
use mc_common::control_unit::state::RequestStatus;
use mc_control_unit::config::load_config_from_str;
use mc_control_unit::controller::MotionController;
use mc_control_unit::sim::SimulatedPlant;

/// Unit mass with damping 0.5: `kvff`/`kaff` match the plant exactly.
pub const ONE_AXIS: &str = r#"
[controller]
cycle_time_us = 1000

[[axes]]
axis_id = 1
name = "X"
max_velocity = 10.0
max_acceleration = 5.0

[axes.control]
kp = 400.0
kd = 30.0
tf = 0.002
kvff = 0.5
kaff = 1.0
out_max = 1000.0
"#;

pub const TWO_AXES: &str = r#"
[controller]
cycle_time_us = 1000

[[axes]]
axis_id = 1
name = "X"
max_velocity = 10.0
max_acceleration = 5.0

[axes.control]
kp = 400.0
kd = 30.0
tf = 0.002
kvff = 0.5
kaff = 1.0
out_max = 1000.0

[[axes]]
axis_id = 2
name = "Y"
max_velocity = 2.0
max_acceleration = 1.0

[axes.control]
kp = 400.0
kd = 30.0
tf = 0.002
kvff = 0.5
kaff = 1.0
out_max = 1000.0
"#;

/// Controller plus plant, already past the first (position-capturing) cycle.
pub fn rig(config: &str) -> (MotionController, SimulatedPlant) {
    let loaded = load_config_from_str(config).unwrap();
    let mut mc = MotionController::new(&loaded);
    let mut plant = SimulatedPlant::new(loaded.axes.len(), loaded.period_s());
    mc.cycle(&mut plant);
    (mc, plant)
}

pub fn submit(mc: &mut MotionController, positions: &[f64]) -> RequestId {
    mc.submit_motion(vec![Waypoint::new(positions.to_vec())], Priority::NORMAL)
        .unwrap()
}

/// Cycle until `id` is terminal; panics after `max_cycles`.
pub fn run_to_terminal(
    mc: &mut MotionController,
    plant: &mut SimulatedPlant,
    id: RequestId,
    max_cycles: u64,
) -> RequestStatus {
    mc.run_until(plant, max_cycles, |mc| {
        mc.get_status(id).is_some_and(|s| s.is_terminal())
    })
    .unwrap_or_else(|| panic!("request {id} not resolved in {max_cycles} cycles"));
    mc.get_status(id).unwrap()
}

/// Cycle until `id` is executing.
pub fn run_to_executing(mc: &mut MotionController, plant: &mut SimulatedPlant, id: RequestId) {
    mc.run_until(plant, 10, |mc| {
        mc.get_status(id) == Some(RequestStatus::Executing)
    })
    .unwrap_or_else(|| panic!("request {id} never started"));
}

pub fn settle(mc: &mut MotionController, plant: &mut SimulatedPlant, cycles: u64) {
    for _ in 0..cycles {
        mc.cycle(plant);
    }
}
