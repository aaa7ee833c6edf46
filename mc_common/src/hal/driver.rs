//! Driver traits and error type.
//!
//! - `Actuator` - per-axis command output, brake, frame commit
//! - `Sensor` - per-axis feedback and discrete interlock inputs
//! - `HalError` - failures reported by either side
//!
//! Both traits are called from the control task once per cycle and must not
//! block or allocate. Axis arguments are 0-based indices into the configured
//! axis list.

use thiserror::Error;

use crate::hal::types::{AxisFeedback, InterlockInputs};

/// Error types for driver operations.
///
/// Payloads are `&'static str` so that reporting an error from the cycle
/// never allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HalError {
    /// Axis index not served by this driver.
    #[error("axis {0} not available")]
    AxisUnavailable(usize),

    /// Drive rejected or failed to apply a command.
    #[error("drive fault on axis {axis}: {reason}")]
    DriveFault { axis: usize, reason: &'static str },

    /// Feedback device failed to deliver a value.
    #[error("sensor fault on axis {axis}: {reason}")]
    SensorFault { axis: usize, reason: &'static str },

    /// Bus or transport failure affecting the whole frame.
    #[error("communication error: {0}")]
    Communication(&'static str),
}

impl HalError {
    /// Axis the error refers to, if any.
    pub const fn axis(&self) -> Option<usize> {
        match self {
            Self::AxisUnavailable(axis)
            | Self::DriveFault { axis, .. }
            | Self::SensorFault { axis, .. } => Some(*axis),
            Self::Communication(_) => None,
        }
    }
}

/// Command output side of a driver.
///
/// `write_command` values are in the unit the drive expects for its control
/// mode (force, torque, or current). Commands are staged; `flush` commits the
/// frame for the current cycle.
pub trait Actuator {
    /// Stage the command for one axis.
    fn write_command(&mut self, axis: usize, value: f64) -> Result<(), HalError>;

    /// Command the axis to a safe stop.
    ///
    /// Default: zero command. Drivers with a mechanical brake override this.
    fn engage_brake(&mut self, axis: usize) -> Result<(), HalError> {
        self.write_command(axis, 0.0)
    }

    /// Commit all staged commands. Called once at the end of every cycle.
    fn flush(&mut self) -> Result<(), HalError> {
        Ok(())
    }
}

/// Feedback side of a driver.
pub trait Sensor {
    /// Read the measured position and velocity of one axis.
    fn read_state(&mut self, axis: usize) -> Result<AxisFeedback, HalError>;

    /// Read the discrete safety inputs.
    ///
    /// Default: no estop circuit, no limit switches wired.
    fn read_interlocks(&mut self) -> Result<InterlockInputs, HalError> {
        Ok(InterlockInputs::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        commands: Vec<(usize, f64)>,
        flushed: u32,
    }

    impl Actuator for Recorder {
        fn write_command(&mut self, axis: usize, value: f64) -> Result<(), HalError> {
            if axis > 1 {
                return Err(HalError::AxisUnavailable(axis));
            }
            self.commands.push((axis, value));
            Ok(())
        }

        fn flush(&mut self) -> Result<(), HalError> {
            self.flushed += 1;
            Ok(())
        }
    }

    impl Sensor for Recorder {
        fn read_state(&mut self, axis: usize) -> Result<AxisFeedback, HalError> {
            Ok(AxisFeedback::new(axis as f64, 0.0))
        }
    }

    #[test]
    fn default_brake_writes_zero() {
        let mut rec = Recorder {
            commands: Vec::new(),
            flushed: 0,
        };
        rec.write_command(0, 3.5).unwrap();
        rec.engage_brake(1).unwrap();
        rec.flush().unwrap();
        assert_eq!(rec.commands, vec![(0, 3.5), (1, 0.0)]);
        assert_eq!(rec.flushed, 1);
        assert_eq!(rec.engage_brake(4), Err(HalError::AxisUnavailable(4)));
    }

    #[test]
    fn default_interlocks_are_clear() {
        let mut rec = Recorder {
            commands: Vec::new(),
            flushed: 0,
        };
        assert!(rec.read_interlocks().unwrap().is_clear());
        assert_eq!(rec.read_state(1).unwrap().position, 1.0);
    }

    #[test]
    fn hal_error_display_and_axis() {
        let err = HalError::DriveFault {
            axis: 2,
            reason: "overcurrent",
        };
        assert!(err.to_string().contains("overcurrent"));
        assert_eq!(err.axis(), Some(2));
        assert_eq!(HalError::Communication("bus down").axis(), None);
    }
}
