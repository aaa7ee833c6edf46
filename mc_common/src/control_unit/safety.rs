//! Safety events, axis masks and latched fault flags.
//!
//! Axis numbers carried by [`SafetyEvent`] are 0-based indices into the
//! configured axis list, the same indices the driver traits use.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert;

use crate::consts::MAX_AXES;

/// 0-based axis index as carried in events and reports.
pub type AxisIndex = u8;

// ─── Safety Events ──────────────────────────────────────────────────

/// A condition detected during one control cycle.
///
/// Transient: consumed by the supervisor in the cycle that raised it. The
/// resulting state (and [`FaultFlags`]) is what persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SafetyEvent {
    /// Position, velocity, lag or limit switch out of bounds.
    LimitExceeded(AxisIndex),
    /// Feedback missing or non-finite.
    SensorFault(AxisIndex),
    /// Drive rejected a command.
    DriveFault(AxisIndex),
    /// Hardware or software emergency stop.
    EstopPressed,
    /// Control cycle missed its deadline.
    WatchdogTimeout,
}

impl SafetyEvent {
    /// Axis the event refers to, if any.
    #[inline]
    pub const fn axis(&self) -> Option<AxisIndex> {
        match self {
            Self::LimitExceeded(a) | Self::SensorFault(a) | Self::DriveFault(a) => Some(*a),
            Self::EstopPressed | Self::WatchdogTimeout => None,
        }
    }

    /// Flag latched when this event is handled.
    #[inline]
    pub const fn fault_flag(&self) -> FaultFlags {
        match self {
            Self::LimitExceeded(_) => FaultFlags::LIMIT_EXCEEDED,
            Self::SensorFault(_) => FaultFlags::SENSOR_FAULT,
            Self::DriveFault(_) => FaultFlags::DRIVE_FAULT,
            Self::EstopPressed => FaultFlags::ESTOP,
            Self::WatchdogTimeout => FaultFlags::WATCHDOG,
        }
    }
}

impl std::fmt::Display for SafetyEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LimitExceeded(a) => write!(f, "limit exceeded on axis {a}"),
            Self::SensorFault(a) => write!(f, "sensor fault on axis {a}"),
            Self::DriveFault(a) => write!(f, "drive fault on axis {a}"),
            Self::EstopPressed => f.write_str("emergency stop"),
            Self::WatchdogTimeout => f.write_str("watchdog timeout"),
        }
    }
}

bitflags! {
    /// Causes latched since the last accepted reset.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FaultFlags: u8 {
        const LIMIT_EXCEEDED = 0x01;
        const SENSOR_FAULT   = 0x02;
        const DRIVE_FAULT    = 0x04;
        const ESTOP          = 0x08;
        const WATCHDOG       = 0x10;
    }
}

impl FaultFlags {
    /// Flags that move the controller to `Estopped` rather than `Faulted`.
    pub const ESTOP_MASK: Self = Self::ESTOP;

    /// Returns true if any estop-class flag is latched.
    #[inline]
    pub const fn has_estop(&self) -> bool {
        self.intersects(Self::ESTOP_MASK)
    }
}

impl Default for FaultFlags {
    fn default() -> Self {
        Self::empty()
    }
}

impl Serialize for FaultFlags {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.bits())
    }
}

// ─── Axis Mask ──────────────────────────────────────────────────────

const_assert!(MAX_AXES <= 32);

/// Set of axes packed into a `u32`, bit `i` = axis index `i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AxisMask(u32);

impl AxisMask {
    pub const EMPTY: Self = Self(0);

    /// Mask with the first `count` axes set.
    #[inline]
    pub const fn first(count: usize) -> Self {
        if count >= 32 {
            Self(u32::MAX)
        } else {
            Self((1u32 << count) - 1)
        }
    }

    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(&self) -> u32 {
        self.0
    }

    #[inline]
    pub fn insert(&mut self, axis: usize) {
        if axis < 32 {
            self.0 |= 1 << axis;
        }
    }

    #[inline]
    pub fn remove(&mut self, axis: usize) {
        if axis < 32 {
            self.0 &= !(1 << axis);
        }
    }

    #[inline]
    pub const fn contains(&self, axis: usize) -> bool {
        axis < 32 && (self.0 >> axis) & 1 == 1
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn count(&self) -> u32 {
        self.0.count_ones()
    }

    /// Iterate over set axis indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> {
        let mask = *self;
        (0..32usize).filter(move |&i| mask.contains(i))
    }
}
