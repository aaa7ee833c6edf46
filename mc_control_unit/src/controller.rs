//! Single-owner controller facade.
//!
//! [`split`] wires a [`MotionService`] and a [`ControlTask`] to the same
//! [`SharedState`] so they can run on separate threads. [`MotionController`]
//! keeps both halves together and steps them in lock-step, one control tick
//! followed by one planning poll per [`MotionController::cycle`].

use std::sync::Arc;

use mc_common::control_unit::error::SubmitError;
use mc_common::control_unit::motion::{Priority, RequestId, Waypoint};
use mc_common::control_unit::state::{ControlState, RequestStatus};
use mc_common::hal::driver::{Actuator, Sensor};

use crate::config::LoadedConfig;
use crate::control_task::ControlTask;
use crate::diagnostics::DiagnosticsSnapshot;
use crate::handoff::{SharedState, report_channel};
use crate::service::MotionService;

/// Build a connected planning/control pair.
pub fn split(config: &LoadedConfig) -> (MotionService, ControlTask) {
    let shared = Arc::new(SharedState::default());
    let (reports, receiver) = report_channel();
    let service = MotionService::new(Arc::clone(&shared), receiver, config);
    let task = ControlTask::new(shared, reports, config);
    (service, task)
}

#[derive(Debug)]
pub struct MotionController {
    service: MotionService,
    task: ControlTask,
}

impl MotionController {
    pub fn new(config: &LoadedConfig) -> Self {
        let (service, task) = split(config);
        Self { service, task }
    }

    /// One control tick against `driver`, then one planning poll.
    pub fn cycle<D: Actuator + Sensor>(&mut self, driver: &mut D) {
        self.task.tick(driver);
        self.service.poll();
    }

    /// Cycle until `done` holds or `max_cycles` elapse.
    ///
    /// Returns the number of cycles run, or `None` if `done` never held.
    pub fn run_until<D, F>(&mut self, driver: &mut D, max_cycles: u64, mut done: F) -> Option<u64>
    where
        D: Actuator + Sensor,
        F: FnMut(&Self) -> bool,
    {
        for n in 1..=max_cycles {
            self.cycle(driver);
            if done(self) {
                return Some(n);
            }
        }
        None
    }

    // ─── API ────────────────────────────────────────────────

    pub fn submit_motion(
        &mut self,
        waypoints: Vec<Waypoint>,
        priority: Priority,
    ) -> Result<RequestId, SubmitError> {
        self.service.submit_motion(waypoints, priority)
    }

    pub fn cancel_motion(&mut self, id: RequestId) -> bool {
        self.service.cancel_motion(id)
    }

    pub fn get_status(&self, id: RequestId) -> Option<RequestStatus> {
        self.service.get_status(id)
    }

    pub fn get_controller_state(&self) -> ControlState {
        self.service.get_controller_state()
    }

    pub fn reset_fault(&mut self) -> bool {
        self.service.reset_fault()
    }

    pub fn pause_motion(&mut self) -> bool {
        self.service.pause_motion()
    }

    pub fn resume_motion(&mut self) -> bool {
        self.service.resume_motion()
    }

    pub fn emergency_stop(&mut self) {
        self.service.emergency_stop();
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        self.service.snapshot()
    }

    // ─── Parts ──────────────────────────────────────────────

    #[inline]
    pub fn service(&self) -> &MotionService {
        &self.service
    }

    #[inline]
    pub fn task(&self) -> &ControlTask {
        &self.task
    }

    pub fn into_parts(self) -> (MotionService, ControlTask) {
        (self.service, self.task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;
    use crate::sim::SimulatedPlant;

    const ONE_AXIS: &str = r#"
[[axes]]
axis_id = 1
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

    #[test]
    fn split_shares_state() {
        let config = load_config_from_str(ONE_AXIS).unwrap();
        let (service, mut task) = split(&config);
        let mut plant = SimulatedPlant::new(1, config.period_s());
        task.tick(&mut plant);
        assert_eq!(service.get_controller_state(), ControlState::Idle);
        assert!(Arc::ptr_eq(service.shared(), task.shared()));
        assert_eq!(task.axis_count(), 1);
    }

    #[test]
    fn short_move_completes() {
        let config = load_config_from_str(ONE_AXIS).unwrap();
        let mut mc = MotionController::new(&config);
        let mut plant = SimulatedPlant::new(1, config.period_s());
        let id = mc
            .submit_motion(vec![Waypoint::new(vec![1.0])], Priority::NORMAL)
            .unwrap();
        let ran = mc.run_until(&mut plant, 10_000, |mc| {
            mc.get_status(id).is_some_and(|s| s.is_terminal())
        });
        assert!(ran.is_some());
        assert_eq!(mc.get_status(id), Some(RequestStatus::Completed));
        assert_eq!(mc.get_controller_state(), ControlState::Idle);
        assert!((plant.position(0) - 1.0).abs() < 0.05);
    }

    #[test]
    fn estop_then_reset_returns_to_idle() {
        let config = load_config_from_str(ONE_AXIS).unwrap();
        let mut mc = MotionController::new(&config);
        let mut plant = SimulatedPlant::new(1, config.period_s());
        mc.cycle(&mut plant);

        mc.emergency_stop();
        mc.cycle(&mut plant);
        assert_eq!(mc.get_controller_state(), ControlState::Estopped);

        assert!(mc.reset_fault());
        mc.cycle(&mut plant);
        assert_eq!(mc.get_controller_state(), ControlState::Idle);
    }
}
