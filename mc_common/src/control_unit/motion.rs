//! Motion request types.
//!
//! A [`MotionRequest`] is built by the service from the caller's waypoints,
//! owned by the queue until dequeued, then by the planner and the control
//! task. Only its [`CancelToken`] is shared.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

// ─── Identifiers ────────────────────────────────────────────────────

/// Unique, monotonically assigned request identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Scheduling priority. Higher values are served first; equal priorities are FIFO.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Priority(pub u8);

impl Priority {
    pub const LOW: Self = Self(0);
    pub const NORMAL: Self = Self(100);
    pub const HIGH: Self = Self(200);
}

// ─── Waypoint ───────────────────────────────────────────────────────

/// Target position for every axis, immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    positions: Vec<f64>,
    target_velocity: Option<f64>,
    tolerance: Option<f64>,
}

impl Waypoint {
    /// Waypoint with one target per configured axis, in axis order.
    pub fn new(positions: Vec<f64>) -> Self {
        Self {
            positions,
            target_velocity: None,
            tolerance: None,
        }
    }

    /// Cap the cruise speed of every axis on the segment ending here.
    pub fn with_velocity(mut self, velocity: f64) -> Self {
        self.target_velocity = Some(velocity);
        self
    }

    /// Arrival window checked when this waypoint ends the motion.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    #[inline]
    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    #[inline]
    pub fn target_velocity(&self) -> Option<f64> {
        self.target_velocity
    }

    #[inline]
    pub fn tolerance(&self) -> Option<f64> {
        self.tolerance
    }

    #[inline]
    pub fn axis_count(&self) -> usize {
        self.positions.len()
    }
}

// ─── Cancellation ───────────────────────────────────────────────────

/// Shared cancellation flag, checked by the control task at cycle boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ─── Request ────────────────────────────────────────────────────────

/// A queued or executing motion.
#[derive(Debug, Clone)]
pub struct MotionRequest {
    pub id: RequestId,
    pub priority: Priority,
    pub waypoints: Vec<Waypoint>,
    pub cancel: CancelToken,
}

impl MotionRequest {
    pub fn new(id: RequestId, priority: Priority, waypoints: Vec<Waypoint>) -> Self {
        Self {
            id,
            priority,
            waypoints,
            cancel: CancelToken::new(),
        }
    }

    /// Tolerance of the final waypoint, if it set one.
    pub fn final_tolerance(&self) -> Option<f64> {
        self.waypoints.last().and_then(Waypoint::tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waypoint_builders() {
        let wp = Waypoint::new(vec![1.0, 2.0])
            .with_velocity(5.0)
            .with_tolerance(0.1);
        assert_eq!(wp.positions(), &[1.0, 2.0]);
        assert_eq!(wp.target_velocity(), Some(5.0));
        assert_eq!(wp.tolerance(), Some(0.1));
        assert_eq!(wp.axis_count(), 2);
    }

    #[test]
    fn cancel_token_is_shared() {
        let req = MotionRequest::new(RequestId::new(1), Priority::NORMAL, Vec::new());
        let token = req.cancel.clone();
        assert!(!req.cancel.is_cancelled());
        token.cancel();
        assert!(req.cancel.is_cancelled());
    }

    #[test]
    fn priority_ordering() {
        assert!(Priority::HIGH > Priority::NORMAL);
        assert!(Priority::NORMAL > Priority::LOW);
        assert_eq!(Priority::default(), Priority::LOW);
    }

    #[test]
    fn final_tolerance_uses_last_waypoint() {
        let req = MotionRequest::new(
            RequestId::new(7),
            Priority::NORMAL,
            vec![
                Waypoint::new(vec![1.0]).with_tolerance(1.0),
                Waypoint::new(vec![2.0]),
            ],
        );
        assert_eq!(req.final_tolerance(), None);
        assert_eq!(req.id.to_string(), "#7");
    }
}
