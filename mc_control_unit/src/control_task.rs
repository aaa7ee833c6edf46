//! Control-side cycle body.
//!
//! One [`ControlTask::tick`] per control period, in fixed order:
//!
//! 1. **READ** - feedback and interlock inputs from the driver
//! 2. **SAFETY** - interlock scan, deferred driver faults, supervisor
//! 3. **MAILBOX** - reset, cancellation, pause/resume, software estop
//! 4. **HANDOFF** - take a planned motion when one is ready
//! 5. **CONTROL** - interpolate and track, hold, or brake; write commands
//! 6. **PUBLISH** - status, diagnostics, parked reports
//!
//! All per-axis state lives in `MAX_AXES`-sized arrays. The tick never
//! blocks, never logs and never allocates; profiles are handed back to the
//! planning side for deallocation.

use std::sync::Arc;

use heapless::Vec as FixedVec;
use mc_common::consts::{MAX_AXES, MAX_CYCLE_EVENTS};
use mc_common::control_unit::error::PlanningError;
use mc_common::control_unit::safety::{AxisIndex, AxisMask, FaultFlags, SafetyEvent};
use mc_common::control_unit::state::{ControlState, FailureReason};
use mc_common::hal::driver::{Actuator, HalError, Sensor};
use mc_common::hal::types::AxisFeedback;
use static_assertions::const_assert;

use crate::config::LoadedConfig;
use crate::control::output::ControlLoop;
use crate::diagnostics::AxisSnapshot;
use crate::handoff::{ControlReport, PlannedMotion, ReportSender, SharedState};
use crate::motion::interpolator::{Interpolator, Sample, Setpoint};
use crate::motion::profile::{AxisSetpoint, MotionProfile};
use crate::safety::interlock::{EventBuffer, InterlockMonitor, ScanInput};
use crate::safety::recovery::ActiveConditions;
use crate::safety::supervisor::{SafetySupervisor, SupervisorEvent, TransitionResult};

// Deferred driver faults plus one scan event per axis, estop and watchdog.
const_assert!(MAX_CYCLE_EVENTS >= 2 * MAX_AXES + 2);

/// Allowed gap between a profile's start and the held position.
const START_TOLERANCE: f64 = 1e-9;

pub struct ControlTask {
    shared: Arc<SharedState>,
    reports: ReportSender,

    axis_count: usize,
    period: f64,
    diagnostics_interval: u64,
    limit_switch_blocks_reset: bool,

    supervisor: SafetySupervisor,
    monitor: InterlockMonitor,
    control: ControlLoop,
    interpolator: Interpolator,

    /// Motion currently owning the axes (Executing or Holding).
    active: Option<PlannedMotion>,
    /// Finished motion the retire slot could not take yet.
    spent: Option<PlannedMotion>,

    feedback: [AxisFeedback; MAX_AXES],
    /// Position commanded in the most recent cycle.
    targets: [f64; MAX_AXES],
    /// Position held while not executing.
    holds: [f64; MAX_AXES],
    /// Actuator command written in the most recent cycle.
    commands: [f64; MAX_AXES],

    /// Driver failures detected after the safety step, applied next cycle.
    deferred: FixedVec<SafetyEvent, MAX_CYCLE_EVENTS>,
    events: EventBuffer,
    conditions: ActiveConditions,
    cycle: u64,
}

impl std::fmt::Debug for ControlTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlTask")
            .field("state", &self.supervisor.state())
            .field("cycle", &self.cycle)
            .field("axis_count", &self.axis_count)
            .finish_non_exhaustive()
    }
}

impl ControlTask {
    pub fn new(shared: Arc<SharedState>, reports: ReportSender, config: &LoadedConfig) -> Self {
        let axis_count = config.axes.len().min(MAX_AXES);
        let period = config.period_s();
        Self {
            shared,
            reports,
            axis_count,
            period,
            diagnostics_interval: u64::from(config.machine.controller.diagnostics_interval.max(1)),
            limit_switch_blocks_reset: config.machine.safety.limit_switch_blocks_reset,
            supervisor: SafetySupervisor::new(axis_count),
            monitor: InterlockMonitor::new(&config.axes, config.machine.safety.overspeed_factor),
            control: ControlLoop::new(&config.axes),
            interpolator: Interpolator::new(period),
            active: None,
            spent: None,
            feedback: [AxisFeedback::default(); MAX_AXES],
            targets: [0.0; MAX_AXES],
            holds: [0.0; MAX_AXES],
            commands: [0.0; MAX_AXES],
            deferred: FixedVec::new(),
            events: EventBuffer::new(),
            conditions: ActiveConditions::default(),
            cycle: 0,
        }
    }

    #[inline]
    pub fn state(&self) -> ControlState {
        self.supervisor.state()
    }

    /// Completed ticks.
    #[inline]
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    #[inline]
    pub fn latched_faults(&self) -> FaultFlags {
        self.supervisor.latched()
    }

    #[inline]
    pub fn axis_count(&self) -> usize {
        self.axis_count
    }

    #[inline]
    pub fn shared(&self) -> &Arc<SharedState> {
        &self.shared
    }

    /// The previous tick overran its period; raises `WatchdogTimeout` next tick.
    pub fn signal_overrun(&mut self) {
        self.defer(SafetyEvent::WatchdogTimeout);
    }

    /// Run one control cycle against `driver`.
    pub fn tick<D: Actuator + Sensor>(&mut self, driver: &mut D) {
        let read_errors = self.read_inputs(driver);
        let interlocks = driver.read_interlocks();

        // ── SAFETY ──────────────────────────────────────────
        self.events.clear();
        for ev in self.deferred.iter() {
            let _ = self.events.push(*ev);
        }
        self.deferred.clear();

        let state = self.supervisor.state();
        let n = self.axis_count;
        let scan = ScanInput {
            feedback: &self.feedback[..n],
            read_errors,
            interlocks,
            commanded: (self.cycle > 0 && !state.is_fault()).then_some(&self.targets[..n]),
            soft_limits: matches!(state, ControlState::Executing | ControlState::Holding),
        };
        self.conditions = self.monitor.scan(&scan, &mut self.events);
        for k in 0..self.events.len() {
            let ev = self.events[k];
            self.trip(ev);
        }

        // ── MAILBOX ─────────────────────────────────────────
        if self.shared.mailbox.take_reset() {
            self.handle_reset();
        }
        self.handle_cancel();
        if self.shared.mailbox.take_pause() {
            self.handle_pause();
        }
        if self.shared.mailbox.take_resume() {
            self.handle_resume();
        }
        if self.shared.mailbox.take_estop() {
            self.trip(SafetyEvent::EstopPressed);
        }

        // ── HANDOFF ─────────────────────────────────────────
        self.handle_handoff();

        // ── CONTROL ─────────────────────────────────────────
        let setpoint = self.advance();
        self.write_outputs(driver, setpoint.as_ref());

        // ── PUBLISH ─────────────────────────────────────────
        self.cycle += 1;
        self.flush_spent();
        self.reports.flush();
        self.publish();
    }

    // ─── READ ───────────────────────────────────────────────

    fn read_inputs<D: Sensor>(&mut self, driver: &mut D) -> AxisMask {
        let mut read_errors = AxisMask::EMPTY;
        for i in 0..self.axis_count {
            match driver.read_state(i) {
                Ok(fb) => self.feedback[i] = fb,
                Err(_) => read_errors.insert(i),
            }
        }

        if self.cycle == 0 {
            for i in 0..self.axis_count {
                let fb = self.feedback[i];
                if !read_errors.contains(i) && fb.is_finite() {
                    self.holds[i] = fb.position;
                    self.targets[i] = fb.position;
                }
            }
        }
        read_errors
    }

    // ─── SAFETY ─────────────────────────────────────────────

    fn trip(&mut self, event: SafetyEvent) {
        let before = self.supervisor.state();
        self.supervisor.handle_event(SupervisorEvent::Safety(event));
        if self.supervisor.state() == before {
            return;
        }

        if let Some(motion) = self.active.take() {
            self.reports.send(ControlReport::Failed {
                id: motion.request_id,
                reason: FailureReason::Safety(event),
            });
            self.retire(motion);
        }
        self.reports.send(ControlReport::Faulted(event));
        self.control.reset_all();
    }

    fn defer(&mut self, event: SafetyEvent) {
        if !self.deferred.contains(&event) {
            let _ = self.deferred.push(event);
        }
    }

    fn defer_driver_fault(&mut self, axis: Option<usize>) {
        match axis {
            Some(i) => self.defer(SafetyEvent::DriveFault(i as AxisIndex)),
            None => self.defer(SafetyEvent::WatchdogTimeout),
        }
    }

    // ─── MAILBOX ────────────────────────────────────────────

    fn handle_reset(&mut self) {
        if !self.supervisor.state().is_fault() {
            self.reports
                .send(ControlReport::ResetRefused("controller not faulted"));
            return;
        }
        let blocker = self.conditions.reset_blocker(self.limit_switch_blocks_reset);
        match self
            .supervisor
            .handle_event(SupervisorEvent::Reset { blocker })
        {
            TransitionResult::Ok(_) => {
                for i in 0..self.axis_count {
                    self.holds[i] = self.feedback[i].position;
                    self.targets[i] = self.holds[i];
                }
                self.control.reset_all();
                self.reports.send(ControlReport::ResetAccepted);
            }
            TransitionResult::Rejected(reason) => {
                self.reports.send(ControlReport::ResetRefused(reason));
            }
        }
    }

    fn handle_cancel(&mut self) {
        let cancelled = self
            .active
            .as_ref()
            .is_some_and(|m| m.cancel.is_cancelled());
        if !cancelled {
            return;
        }
        if self.supervisor.state() == ControlState::Executing {
            self.supervisor.handle_event(SupervisorEvent::Cancel);
        }
        if self.supervisor.handle_event(SupervisorEvent::Cancel) != TransitionResult::Ok(ControlState::Idle) {
            return;
        }
        self.holds = self.targets;
        if let Some(motion) = self.active.take() {
            self.reports.send(ControlReport::Cancelled(motion.request_id));
            self.retire(motion);
        }
    }

    fn handle_pause(&mut self) {
        if self.supervisor.handle_event(SupervisorEvent::Pause) != TransitionResult::Ok(ControlState::Holding) {
            return;
        }
        self.holds = self.targets;
        if let Some(motion) = &self.active {
            self.reports.send(ControlReport::Paused(motion.request_id));
        }
    }

    fn handle_resume(&mut self) {
        if self.supervisor.handle_event(SupervisorEvent::Resume) != TransitionResult::Ok(ControlState::Executing) {
            return;
        }
        if let Some(motion) = &self.active {
            self.reports.send(ControlReport::Resumed(motion.request_id));
        }
    }

    // ─── HANDOFF ────────────────────────────────────────────

    fn handle_handoff(&mut self) {
        let state = self.supervisor.state();
        if state == ControlState::Idle && !self.shared.handoff.is_empty() {
            self.supervisor.handle_event(SupervisorEvent::PlanningStarted);
        }

        match self.supervisor.state() {
            ControlState::Planning => self.take_planned(),
            ControlState::Faulted | ControlState::Estopped => {
                if let Some(motion) = self.shared.handoff.try_take() {
                    let event = self
                        .supervisor
                        .first_fault()
                        .unwrap_or(SafetyEvent::WatchdogTimeout);
                    self.reports.send(ControlReport::Failed {
                        id: motion.request_id,
                        reason: FailureReason::Safety(event),
                    });
                    self.retire(motion);
                }
            }
            _ => {}
        }
    }

    fn take_planned(&mut self) {
        let Some(motion) = self.shared.handoff.try_take() else {
            if self.shared.handoff.is_empty() {
                // Revoked by the planning side before it was taken.
                self.supervisor.handle_event(SupervisorEvent::Cancel);
            }
            return;
        };

        if motion.cancel.is_cancelled() {
            self.supervisor.handle_event(SupervisorEvent::Cancel);
            self.reports.send(ControlReport::Cancelled(motion.request_id));
            self.retire(motion);
            return;
        }

        let stale = motion
            .outcome
            .as_ref()
            .ok()
            .and_then(|profile| self.stale_start(profile));
        if let Some(err) = stale {
            self.fail_planning(motion, err);
            return;
        }

        match &motion.outcome {
            Err(err) => {
                let err = err.clone();
                self.fail_planning(motion, err);
            }
            Ok(profile) if profile.is_empty() => {
                self.supervisor
                    .handle_event(SupervisorEvent::PlanningDone { executable: false });
                self.complete(motion);
            }
            Ok(_) => {
                self.supervisor
                    .handle_event(SupervisorEvent::PlanningDone { executable: true });
                self.interpolator.reset();
                self.reports.send(ControlReport::Started(motion.request_id));
                self.active = Some(motion);
            }
        }
    }

    fn fail_planning(&mut self, motion: PlannedMotion, err: PlanningError) {
        self.supervisor.handle_event(SupervisorEvent::PlanningFailed);
        self.reports.send(ControlReport::Failed {
            id: motion.request_id,
            reason: FailureReason::Planning(err),
        });
        self.retire(motion);
    }

    /// First axis whose profile does not start at the position it holds.
    fn stale_start(&self, profile: &MotionProfile) -> Option<PlanningError> {
        profile
            .axes()
            .iter()
            .take(self.axis_count)
            .enumerate()
            .find(|(i, axis)| (axis.start_position() - self.holds[*i]).abs() > START_TOLERANCE)
            .map(|(i, axis)| PlanningError::StaleStart {
                axis: i as AxisIndex,
                planned: axis.start_position(),
                held: self.holds[i],
            })
    }

    /// Settle holds on the profile end point and report arrival.
    fn complete(&mut self, motion: PlannedMotion) {
        if let Ok(profile) = &motion.outcome {
            for (i, p) in profile.final_positions().take(self.axis_count).enumerate() {
                self.holds[i] = p;
            }
        }
        let arrival_error = (0..self.axis_count)
            .map(|i| (self.feedback[i].position - self.holds[i]).abs())
            .fold(0.0, f64::max);
        let within_tolerance = motion.tolerance.is_none_or(|tol| arrival_error <= tol);
        self.reports.send(ControlReport::Completed {
            id: motion.request_id,
            arrival_error,
            within_tolerance,
        });
        self.retire(motion);
    }

    fn retire(&mut self, motion: PlannedMotion) {
        self.flush_spent();
        if let Err(motion) = self.shared.handoff.try_retire(motion) {
            self.spent = Some(motion);
        }
    }

    fn flush_spent(&mut self) {
        if let Some(motion) = self.spent.take() {
            if let Err(motion) = self.shared.handoff.try_retire(motion) {
                self.spent = Some(motion);
            }
        }
    }

    // ─── CONTROL ────────────────────────────────────────────

    /// Sample the active profile; completes it once the profile has ended.
    fn advance(&mut self) -> Option<Setpoint> {
        if self.supervisor.state() != ControlState::Executing {
            return None;
        }
        let sample = match &self.active {
            Some(PlannedMotion {
                outcome: Ok(profile),
                ..
            }) => self.interpolator.next(profile),
            _ => Sample::EndOfProfile,
        };
        match sample {
            Sample::Setpoint(sp) => Some(sp),
            Sample::EndOfProfile => {
                self.supervisor.handle_event(SupervisorEvent::EndOfProfile);
                if let Some(motion) = self.active.take() {
                    self.complete(motion);
                }
                None
            }
        }
    }

    fn write_outputs<D: Actuator>(&mut self, driver: &mut D, setpoint: Option<&Setpoint>) {
        let dt = self.period;
        let state = self.supervisor.state();

        for i in 0..self.axis_count {
            if state.is_fault() {
                self.commands[i] = 0.0;
                self.targets[i] = self.feedback[i].position;
                if let Err(err) = driver.engage_brake(i) {
                    self.defer_driver_fault(err.axis().or(Some(i)));
                }
                continue;
            }

            let fb = self.feedback[i];
            let out = match setpoint {
                Some(sp) => {
                    let target = sp
                        .axis(i)
                        .copied()
                        .unwrap_or_else(|| AxisSetpoint::at_rest(self.holds[i]));
                    self.targets[i] = target.position;
                    self.control.track(i, &target, &fb, dt)
                }
                None => {
                    self.targets[i] = self.holds[i];
                    self.control.hold(i, self.holds[i], &fb, dt)
                }
            };
            self.commands[i] = out.command;
            if let Err(err) = driver.write_command(i, out.command) {
                self.defer_driver_fault(err.axis().or(Some(i)));
            }
        }

        if let Err(err) = driver.flush() {
            self.defer_driver_fault(flush_fault_axis(&err));
        }
    }

    // ─── PUBLISH ────────────────────────────────────────────

    fn publish(&mut self) {
        let state = self.supervisor.state();
        let status = &self.shared.status;
        let active_request = self.active.as_ref().map(|m| m.request_id);

        for i in 0..self.axis_count {
            status.set_hold_position(i, self.holds[i]);
        }
        status.set_active_request(active_request);
        status.set_faults(self.supervisor.latched());
        status.set_condition_asserted(
            self.conditions
                .reset_blocker(self.limit_switch_blocks_reset)
                .is_some(),
        );
        // Last: an Acquire load of the state makes everything above visible.
        status.set_state(state);

        if self.cycle % self.diagnostics_interval == 0 {
            if let Some(mut snap) = self.shared.diagnostics.try_lock() {
                snap.cycle = self.cycle;
                snap.state = state;
                snap.faults = self.supervisor.latched();
                snap.active_request = active_request;
                snap.dropped_reports = self.reports.dropped();
                snap.axes.clear();
                let enabled = self.supervisor.enabled();
                for i in 0..self.axis_count {
                    let fb = self.feedback[i];
                    let _ = snap.axes.push(AxisSnapshot {
                        position: fb.position,
                        velocity: fb.velocity,
                        commanded: self.targets[i],
                        command: self.commands[i],
                        lag: self.targets[i] - fb.position,
                        enabled: enabled.contains(i),
                    });
                }
            }
        }

        status.set_cycle(self.cycle);
    }
}

/// Axis to blame for a failed frame commit. `None` means the link itself.
#[inline]
fn flush_fault_axis(err: &HalError) -> Option<usize> {
    match err {
        HalError::Communication(_) => None,
        other => other.axis(),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
