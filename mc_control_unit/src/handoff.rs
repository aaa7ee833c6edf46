//! Shared state between the planning side and the control side.
//!
//! - [`ProfileHandoff`] - single-slot profile handoff, double-buffered with a
//!   retire slot so profile memory is freed on the planning side
//! - [`CommandMailbox`] - atomic one-shot operator commands
//! - [`PublishedStatus`] - controller state published every cycle
//! - [`ReportSender`] - control → service report channel that never blocks
//!
//! The control side only ever uses atomics, `try_lock` and `try_send`.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use heapless::Deque;
use mc_common::consts::{MAX_AXES, REPORT_CHANNEL_CAPACITY};
use mc_common::control_unit::error::PlanningError;
use mc_common::control_unit::motion::{CancelToken, RequestId};
use mc_common::control_unit::safety::{FaultFlags, SafetyEvent};
use mc_common::control_unit::state::{ControlState, FailureReason};
use parking_lot::Mutex;

use crate::diagnostics::DiagnosticsSnapshot;
use crate::motion::profile::MotionProfile;

// ─── Planned Motion ─────────────────────────────────────────────────

/// Outcome of planning one request, handed to the control side.
#[derive(Debug)]
pub struct PlannedMotion {
    pub request_id: RequestId,
    pub cancel: CancelToken,
    /// Arrival window of the final waypoint.
    pub tolerance: Option<f64>,
    pub outcome: Result<MotionProfile, PlanningError>,
}

// ─── Profile Handoff ────────────────────────────────────────────────

/// Handoff slot phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HandoffPhase {
    Empty = 0,
    /// A request has been dequeued and is being planned.
    Planning = 1,
    /// A planned motion waits to be taken.
    Ready = 2,
}

impl HandoffPhase {
    #[inline]
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Planning,
            2 => Self::Ready,
            _ => Self::Empty,
        }
    }
}

#[derive(Debug)]
pub struct ProfileHandoff {
    phase: AtomicU8,
    planning_id: AtomicU64,
    pending: Mutex<Option<PlannedMotion>>,
    retired: Mutex<Option<PlannedMotion>>,
}

impl Default for ProfileHandoff {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileHandoff {
    pub const fn new() -> Self {
        Self {
            phase: AtomicU8::new(HandoffPhase::Empty as u8),
            planning_id: AtomicU64::new(0),
            pending: Mutex::new(None),
            retired: Mutex::new(None),
        }
    }

    #[inline]
    pub fn phase(&self) -> HandoffPhase {
        HandoffPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.phase() == HandoffPhase::Empty
    }

    // ── Planning side ───────────────────────────────────────

    /// Announce that `id` is being planned.
    pub fn begin(&self, id: RequestId) {
        self.planning_id.store(id.get(), Ordering::Relaxed);
        self.phase
            .store(HandoffPhase::Planning as u8, Ordering::Release);
    }

    /// Make a planned motion available to the control side.
    pub fn publish(&self, motion: PlannedMotion) {
        let mut slot = self.pending.lock();
        self.planning_id
            .store(motion.request_id.get(), Ordering::Relaxed);
        *slot = Some(motion);
        self.phase.store(HandoffPhase::Ready as u8, Ordering::Release);
    }

    /// Withdraw `id` before the control side has taken it.
    ///
    /// Returns the withdrawn motion (if it was already published), or `None`
    /// when `id` is not in the handoff any more.
    pub fn revoke(&self, id: RequestId) -> Option<Option<PlannedMotion>> {
        let mut slot = self.pending.lock();
        if self.is_empty() || self.planning_id.load(Ordering::Relaxed) != id.get() {
            return None;
        }
        let motion = slot.take();
        self.phase.store(HandoffPhase::Empty as u8, Ordering::Release);
        Some(motion)
    }

    /// Take back a motion the control side has finished with.
    pub fn collect_retired(&self) -> Option<PlannedMotion> {
        self.retired.lock().take()
    }

    // ── Control side ────────────────────────────────────────

    /// Take the ready motion without blocking.
    pub fn try_take(&self) -> Option<PlannedMotion> {
        if self.phase() != HandoffPhase::Ready {
            return None;
        }
        let mut slot = self.pending.try_lock()?;
        let motion = slot.take()?;
        self.phase.store(HandoffPhase::Empty as u8, Ordering::Release);
        Some(motion)
    }

    /// Hand a finished motion back without blocking.
    ///
    /// # Errors
    /// Returns the motion if the retire slot is contended or still occupied.
    pub fn try_retire(&self, motion: PlannedMotion) -> Result<(), PlannedMotion> {
        match self.retired.try_lock() {
            Some(mut slot) if slot.is_none() => {
                *slot = Some(motion);
                Ok(())
            }
            _ => Err(motion),
        }
    }
}

// ─── Command Mailbox ────────────────────────────────────────────────

/// One-shot operator commands. Each flag is consumed by the control task.
#[derive(Debug, Default)]
pub struct CommandMailbox {
    pause: AtomicBool,
    resume: AtomicBool,
    reset: AtomicBool,
    estop: AtomicBool,
}

impl CommandMailbox {
    #[inline]
    pub fn request_pause(&self) {
        self.pause.store(true, Ordering::Release);
    }

    #[inline]
    pub fn request_resume(&self) {
        self.resume.store(true, Ordering::Release);
    }

    #[inline]
    pub fn request_reset(&self) {
        self.reset.store(true, Ordering::Release);
    }

    #[inline]
    pub fn request_estop(&self) {
        self.estop.store(true, Ordering::Release);
    }

    #[inline]
    pub fn take_pause(&self) -> bool {
        self.pause.swap(false, Ordering::AcqRel)
    }

    #[inline]
    pub fn take_resume(&self) -> bool {
        self.resume.swap(false, Ordering::AcqRel)
    }

    #[inline]
    pub fn take_reset(&self) -> bool {
        self.reset.swap(false, Ordering::AcqRel)
    }

    #[inline]
    pub fn take_estop(&self) -> bool {
        self.estop.swap(false, Ordering::AcqRel)
    }
}

// ─── Published Status ───────────────────────────────────────────────

/// Controller status written by the control task once per cycle.
#[derive(Debug)]
pub struct PublishedStatus {
    state: AtomicU8,
    condition_asserted: AtomicBool,
    faults: AtomicU8,
    active_request: AtomicU64,
    cycle: AtomicU64,
    /// Hold positions as `f64` bits; the planner starts from these.
    holds: [AtomicU64; MAX_AXES],
}

impl Default for PublishedStatus {
    fn default() -> Self {
        Self {
            state: AtomicU8::new(ControlState::Idle as u8),
            condition_asserted: AtomicBool::new(false),
            faults: AtomicU8::new(0),
            active_request: AtomicU64::new(0),
            cycle: AtomicU64::new(0),
            holds: std::array::from_fn(|_| AtomicU64::new(0.0f64.to_bits())),
        }
    }
}

impl PublishedStatus {
    /// Current controller state. An undecodable value reads as `Faulted`.
    #[inline]
    pub fn state(&self) -> ControlState {
        ControlState::from_u8(self.state.load(Ordering::Acquire)).unwrap_or(ControlState::Faulted)
    }

    #[inline]
    pub fn set_state(&self, state: ControlState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// True while a safety condition that blocks reset is asserted.
    #[inline]
    pub fn condition_asserted(&self) -> bool {
        self.condition_asserted.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set_condition_asserted(&self, asserted: bool) {
        self.condition_asserted.store(asserted, Ordering::Release);
    }

    #[inline]
    pub fn faults(&self) -> FaultFlags {
        FaultFlags::from_bits_truncate(self.faults.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set_faults(&self, faults: FaultFlags) {
        self.faults.store(faults.bits(), Ordering::Release);
    }

    #[inline]
    pub fn active_request(&self) -> Option<RequestId> {
        match self.active_request.load(Ordering::Acquire) {
            0 => None,
            raw => Some(RequestId::new(raw)),
        }
    }

    #[inline]
    pub fn set_active_request(&self, id: Option<RequestId>) {
        self.active_request
            .store(id.map_or(0, |id| id.get()), Ordering::Release);
    }

    /// Completed control cycles.
    #[inline]
    pub fn cycle(&self) -> u64 {
        self.cycle.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set_cycle(&self, cycle: u64) {
        self.cycle.store(cycle, Ordering::Release);
    }

    #[inline]
    pub fn hold_position(&self, axis: usize) -> f64 {
        self.holds
            .get(axis)
            .map_or(0.0, |h| f64::from_bits(h.load(Ordering::Acquire)))
    }

    #[inline]
    pub fn set_hold_position(&self, axis: usize, position: f64) {
        if let Some(h) = self.holds.get(axis) {
            h.store(position.to_bits(), Ordering::Release);
        }
    }

    /// Hold positions of the first `count` axes.
    pub fn hold_positions(&self, count: usize) -> Vec<f64> {
        (0..count.min(MAX_AXES))
            .map(|i| self.hold_position(i))
            .collect()
    }
}

// ─── Shared State ───────────────────────────────────────────────────

/// Everything both sides share, held in an `Arc`.
#[derive(Debug, Default)]
pub struct SharedState {
    pub handoff: ProfileHandoff,
    pub mailbox: CommandMailbox,
    pub status: PublishedStatus,
    pub diagnostics: Mutex<DiagnosticsSnapshot>,
}

// ─── Control Reports ────────────────────────────────────────────────

/// Request and controller events sent from the control side.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlReport {
    Started(RequestId),
    Paused(RequestId),
    Resumed(RequestId),
    Completed {
        id: RequestId,
        /// Largest |final − target| across axes.
        arrival_error: f64,
        within_tolerance: bool,
    },
    Cancelled(RequestId),
    Failed {
        id: RequestId,
        reason: FailureReason,
    },
    Faulted(SafetyEvent),
    ResetAccepted,
    ResetRefused(&'static str),
}

/// Reports parked while the channel is full.
const REPORT_BACKLOG: usize = 16;

/// Non-blocking report sender with a small fixed backlog.
#[derive(Debug)]
pub struct ReportSender {
    tx: Sender<ControlReport>,
    backlog: Deque<ControlReport, REPORT_BACKLOG>,
    dropped: u64,
}

/// Bounded control → service report channel.
pub fn report_channel() -> (ReportSender, Receiver<ControlReport>) {
    let (tx, rx) = crossbeam_channel::bounded(REPORT_CHANNEL_CAPACITY);
    (
        ReportSender {
            tx,
            backlog: Deque::new(),
            dropped: 0,
        },
        rx,
    )
}

impl ReportSender {
    /// Send in order after any parked reports. Never blocks.
    pub fn send(&mut self, report: ControlReport) {
        self.flush();
        if !self.backlog.is_empty() {
            self.park(report);
            return;
        }
        match self.tx.try_send(report) {
            Ok(()) => {}
            Err(TrySendError::Full(report)) => self.park(report),
            Err(TrySendError::Disconnected(_)) => self.dropped += 1,
        }
    }

    /// Retry parked reports.
    pub fn flush(&mut self) {
        while let Some(report) = self.backlog.pop_front() {
            match self.tx.try_send(report) {
                Ok(()) => {}
                Err(TrySendError::Full(report)) => {
                    let _ = self.backlog.push_front(report);
                    break;
                }
                Err(TrySendError::Disconnected(_)) => {
                    self.dropped += 1 + self.backlog.len() as u64;
                    self.backlog.clear();
                    break;
                }
            }
        }
    }

    /// Reports lost so far.
    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn park(&mut self, report: ControlReport) {
        if self.backlog.push_back(report).is_err() {
            self.dropped += 1;
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
