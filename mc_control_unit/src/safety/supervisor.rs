//! Safety supervisor: owner of the global [`ControlState`].
//!
//! ```text
//! Idle ──PlanningStarted──▶ Planning ──PlanningDone──▶ Executing ──Pause──▶ Holding
//!   ▲                          │                          │  ▲                 │
//!   └──────────────────────────┴──EndOfProfile / Cancel───┘  └─────Resume──────┘
//!
//! any ──Safety(EstopPressed)──▶ Estopped
//! any ──Safety(other)─────────▶ Faulted   (Estopped stays Estopped)
//! Faulted | Estopped ──Reset{no blocker}──▶ Idle
//! ```
//!
//! Safety events always win: there is no rejected path for them. Both fault
//! states disable every axis until an accepted reset.

use mc_common::control_unit::safety::{AxisMask, FaultFlags, SafetyEvent};
use mc_common::control_unit::state::ControlState;

/// Result of a supervisor transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition succeeded: new state.
    Ok(ControlState),
    /// Transition rejected: reason.
    Rejected(&'static str),
}

/// Event fed to the supervisor by the control task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// A planned request is pending in the handoff.
    PlanningStarted,
    /// Planning finished. `executable` is false for an empty profile.
    PlanningDone { executable: bool },
    PlanningFailed,
    /// The interpolator ran past the profile duration.
    EndOfProfile,
    Pause,
    Resume,
    Cancel,
    Safety(SafetyEvent),
    /// Operator reset. `blocker` names a still-asserted condition.
    Reset { blocker: Option<&'static str> },
}

#[derive(Debug, Clone)]
pub struct SafetySupervisor {
    state: ControlState,
    axis_count: usize,
    enabled: AxisMask,
    latched: FaultFlags,
    first_fault: Option<SafetyEvent>,
}

impl SafetySupervisor {
    /// Supervisor in `Idle` with every axis enabled.
    pub const fn new(axis_count: usize) -> Self {
        Self {
            state: ControlState::Idle,
            axis_count,
            enabled: AxisMask::first(axis_count),
            latched: FaultFlags::empty(),
            first_fault: None,
        }
    }

    #[inline]
    pub const fn state(&self) -> ControlState {
        self.state
    }

    #[inline]
    pub const fn enabled(&self) -> AxisMask {
        self.enabled
    }

    /// Fault flags latched since the last accepted reset.
    #[inline]
    pub const fn latched(&self) -> FaultFlags {
        self.latched
    }

    /// The event that caused the current fault state.
    #[inline]
    pub const fn first_fault(&self) -> Option<SafetyEvent> {
        self.first_fault
    }

    #[inline]
    pub const fn all_axes_enabled(&self) -> bool {
        self.enabled.bits() == AxisMask::first(self.axis_count).bits()
    }

    pub fn handle_event(&mut self, event: SupervisorEvent) -> TransitionResult {
        use ControlState::*;
        use SupervisorEvent as E;

        let next = match (self.state, event) {
            (_, E::Safety(ev)) => return TransitionResult::Ok(self.trip(ev)),

            (Faulted | Estopped, E::Reset { blocker: Some(reason) }) => {
                return TransitionResult::Rejected(reason);
            }
            (Faulted | Estopped, E::Reset { blocker: None }) => {
                self.latched = FaultFlags::empty();
                self.first_fault = None;
                self.enabled = AxisMask::first(self.axis_count);
                Idle
            }
            (_, E::Reset { .. }) => {
                return TransitionResult::Rejected("reset only valid in Faulted or Estopped");
            }

            (Idle, E::PlanningStarted) if self.all_axes_enabled() => Planning,
            (Planning, E::PlanningDone { executable: true }) => Executing,
            (Planning, E::PlanningDone { executable: false }) => Idle,
            (Planning, E::PlanningFailed | E::Cancel) => Idle,

            (Executing, E::EndOfProfile) => Idle,
            (Executing, E::Pause | E::Cancel) => Holding,

            (Holding, E::Resume) => Executing,
            (Holding, E::Cancel) => Idle,

            _ => return TransitionResult::Rejected(invalid_transition_reason(self.state)),
        };

        self.state = next;
        TransitionResult::Ok(next)
    }

    fn trip(&mut self, event: SafetyEvent) -> ControlState {
        self.latched |= event.fault_flag();
        if self.first_fault.is_none() || !self.state.is_fault() {
            self.first_fault = Some(event);
        }
        self.enabled = AxisMask::EMPTY;
        self.state = match (self.state, event) {
            (_, SafetyEvent::EstopPressed) => ControlState::Estopped,
            (ControlState::Estopped, _) => ControlState::Estopped,
            _ => ControlState::Faulted,
        };
        self.state
    }
}

fn invalid_transition_reason(state: ControlState) -> &'static str {
    match state {
        ControlState::Idle => "Idle: invalid event for current state",
        ControlState::Planning => "Planning: invalid event for current state",
        ControlState::Executing => "Executing: invalid event for current state",
        ControlState::Holding => "Holding: invalid event for current state",
        ControlState::Faulted => "Faulted: only Reset allowed",
        ControlState::Estopped => "Estopped: only Reset allowed",
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
