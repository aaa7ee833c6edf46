//! Planning-side motion service: the public API of the controller.
//!
//! Owns the request queue, the planner and all request status bookkeeping.
//! [`MotionService::poll`] drains control reports and, when the controller
//! is idle, plans the next queued request into the handoff. Every status
//! change is logged here; the control task itself stays silent.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use mc_common::control_unit::error::SubmitError;
use mc_common::control_unit::motion::{CancelToken, MotionRequest, Priority, RequestId, Waypoint};
use mc_common::control_unit::state::{ControlState, RequestStatus};
use tracing::{debug, error, info, warn};

use crate::axis::axis_limits;
use crate::config::LoadedConfig;
use crate::diagnostics::DiagnosticsSnapshot;
use crate::handoff::{ControlReport, PlannedMotion, SharedState};
use crate::motion::planner::TrajectoryPlanner;
use crate::motion::queue::MotionQueue;

/// Request handed to the control side and not yet resolved.
#[derive(Debug, Clone)]
struct InFlight {
    id: RequestId,
    cancel: CancelToken,
}

#[derive(Debug)]
pub struct MotionService {
    shared: Arc<SharedState>,
    reports: Receiver<ControlReport>,
    planner: TrajectoryPlanner,
    queue: MotionQueue,
    statuses: HashMap<RequestId, RequestStatus>,
    /// Resolved requests, oldest first; bounded by `status_history`.
    history: VecDeque<RequestId>,
    status_history: usize,
    in_flight: Option<InFlight>,
    next_id: u64,
}

impl MotionService {
    pub fn new(
        shared: Arc<SharedState>,
        reports: Receiver<ControlReport>,
        config: &LoadedConfig,
    ) -> Self {
        let controller = &config.machine.controller;
        Self {
            shared,
            reports,
            planner: TrajectoryPlanner::new(axis_limits(&config.axes)),
            queue: MotionQueue::new(controller.queue_capacity),
            statuses: HashMap::new(),
            history: VecDeque::with_capacity(controller.status_history),
            status_history: controller.status_history,
            in_flight: None,
            next_id: 1,
        }
    }

    // ─── Public API ─────────────────────────────────────────

    /// Queue a motion through `waypoints`.
    ///
    /// Waypoints are validated when the request is planned; a rejected
    /// request resolves to `Failed(Planning(..))`.
    ///
    /// # Errors
    /// `SubmitError::QueueFull` when the queue is at capacity.
    pub fn submit_motion(
        &mut self,
        waypoints: Vec<Waypoint>,
        priority: Priority,
    ) -> Result<RequestId, SubmitError> {
        let id = RequestId::new(self.next_id);
        let count = waypoints.len();
        self.queue
            .enqueue(MotionRequest::new(id, priority, waypoints))
            .inspect_err(|e| warn!("Motion request rejected: {e}"))?;
        self.next_id += 1;
        self.statuses.insert(id, RequestStatus::Queued);
        debug!("Request {id} queued ({count} waypoints, priority {})", priority.0);
        Ok(id)
    }

    /// Cancel a queued or in-flight request.
    ///
    /// Returns `false` for unknown or already resolved requests. An
    /// executing request stops at the next control cycle boundary.
    pub fn cancel_motion(&mut self, id: RequestId) -> bool {
        if self.queue.cancel(id) {
            info!("Request {id} cancelled while queued");
            self.resolve(id, RequestStatus::Cancelled);
            return true;
        }

        let Some(flight) = self.in_flight.as_ref().filter(|f| f.id == id) else {
            return false;
        };
        flight.cancel.cancel();

        if self.shared.handoff.revoke(id).is_some() {
            info!("Request {id} cancelled before execution");
            self.in_flight = None;
            self.resolve(id, RequestStatus::Cancelled);
        } else {
            debug!("Request {id} cancel requested");
        }
        true
    }

    /// Status of a request, or `None` if unknown or evicted from history.
    pub fn get_status(&self, id: RequestId) -> Option<RequestStatus> {
        self.statuses.get(&id).cloned()
    }

    /// Controller state as published by the control task.
    pub fn get_controller_state(&self) -> ControlState {
        self.shared.status.state()
    }

    /// Request a fault reset.
    ///
    /// Returns `false` unless the controller is Faulted or Estopped with no
    /// blocking condition (estop input, sensor fault, limit switch) asserted.
    /// The control task re-checks the conditions when it applies the reset.
    pub fn reset_fault(&mut self) -> bool {
        let status = &self.shared.status;
        let state = status.state();
        if !state.is_fault() {
            debug!("Reset ignored in state {state}");
            return false;
        }
        if status.condition_asserted() {
            warn!("Reset refused: safety condition still asserted");
            return false;
        }
        info!("Fault reset requested");
        self.shared.mailbox.request_reset();
        true
    }

    /// Suspend the executing request at its current commanded position.
    pub fn pause_motion(&mut self) -> bool {
        if self.shared.status.state() != ControlState::Executing {
            return false;
        }
        self.shared.mailbox.request_pause();
        true
    }

    /// Continue a paused request from the pause point.
    pub fn resume_motion(&mut self) -> bool {
        if self.shared.status.state() != ControlState::Holding {
            return false;
        }
        self.shared.mailbox.request_resume();
        true
    }

    /// Software emergency stop, latched until reset.
    pub fn emergency_stop(&mut self) {
        warn!("Software emergency stop requested");
        self.shared.mailbox.request_estop();
    }

    /// Latest diagnostics published by the control task.
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        self.shared.diagnostics.lock().clone()
    }

    #[inline]
    pub fn shared(&self) -> &Arc<SharedState> {
        &self.shared
    }

    /// Number of requests waiting in the queue.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    // ─── Planning task ──────────────────────────────────────

    /// One planning-task step: apply control reports, then plan if idle.
    pub fn poll(&mut self) {
        self.sync();
        self.plan_next();
    }

    /// Drain control reports and reclaim retired profiles.
    pub fn sync(&mut self) {
        while let Ok(report) = self.reports.try_recv() {
            self.apply_report(report);
        }
        while self.shared.handoff.collect_retired().is_some() {}
    }

    fn plan_next(&mut self) {
        let status = &self.shared.status;
        if self.in_flight.is_some()
            || status.cycle() == 0
            || status.state() != ControlState::Idle
            || !self.shared.handoff.is_empty()
        {
            return;
        }
        let Some(request) = self.queue.dequeue_next() else {
            return;
        };

        let id = request.id;
        self.shared.handoff.begin(id);
        self.set_status(id, RequestStatus::Planning);

        let start = self
            .shared
            .status
            .hold_positions(self.planner.axis_count());
        let outcome = self.planner.plan(&start, &request.waypoints);
        match &outcome {
            Ok(profile) => debug!(
                "Request {id} planned: {} segment(s), {:.3} s",
                profile.segment_count(),
                profile.duration()
            ),
            Err(e) => warn!("Request {id} planning failed: {e}"),
        }

        self.in_flight = Some(InFlight {
            id,
            cancel: request.cancel.clone(),
        });
        self.shared.handoff.publish(PlannedMotion {
            request_id: id,
            tolerance: request.final_tolerance(),
            cancel: request.cancel,
            outcome,
        });
    }

    fn apply_report(&mut self, report: ControlReport) {
        match report {
            ControlReport::Started(id) => {
                info!("Request {id} executing");
                self.set_status(id, RequestStatus::Executing);
            }
            ControlReport::Paused(id) => {
                info!("Request {id} paused");
                self.set_status(id, RequestStatus::Holding);
            }
            ControlReport::Resumed(id) => {
                info!("Request {id} resumed");
                self.set_status(id, RequestStatus::Executing);
            }
            ControlReport::Completed {
                id,
                arrival_error,
                within_tolerance,
            } => {
                if within_tolerance {
                    info!("Request {id} completed (arrival error {arrival_error:.6})");
                } else {
                    warn!("Request {id} completed outside tolerance (arrival error {arrival_error:.6})");
                }
                self.finish(id, RequestStatus::Completed);
            }
            ControlReport::Cancelled(id) => {
                info!("Request {id} cancelled");
                self.finish(id, RequestStatus::Cancelled);
            }
            ControlReport::Failed { id, reason } => {
                error!("Request {id} failed: {reason}");
                self.finish(id, RequestStatus::Failed(reason));
            }
            ControlReport::Faulted(event) => {
                error!("Controller stopped: {event}");
            }
            ControlReport::ResetAccepted => info!("Fault reset accepted"),
            ControlReport::ResetRefused(reason) => warn!("Fault reset refused: {reason}"),
        }
    }

    fn finish(&mut self, id: RequestId, status: RequestStatus) {
        if self.in_flight.as_ref().is_some_and(|f| f.id == id) {
            self.in_flight = None;
        }
        self.resolve(id, status);
    }

    fn set_status(&mut self, id: RequestId, status: RequestStatus) {
        if let Some(current) = self.statuses.get_mut(&id) {
            if !current.is_terminal() {
                *current = status;
            }
        }
    }

    /// Record a terminal status once; evict the oldest resolved entries.
    fn resolve(&mut self, id: RequestId, status: RequestStatus) {
        match self.statuses.get(&id) {
            Some(current) if current.is_terminal() => return,
            _ => {}
        }
        self.statuses.insert(id, status);
        self.history.push_back(id);
        while self.history.len() > self.status_history {
            if let Some(old) = self.history.pop_front() {
                self.statuses.remove(&old);
            }
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
