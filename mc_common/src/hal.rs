//! Hardware abstraction for the motion controller.
//!
//! The control task only sees the [`driver::Actuator`] and [`driver::Sensor`]
//! traits. Concrete drivers (fieldbus, simulation) live outside this crate.

pub mod driver;
pub mod types;
