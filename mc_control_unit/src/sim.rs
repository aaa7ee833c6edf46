//! Simulated plant for tests, benches and the demo binary.
//!
//! Each axis is a damped mass driven by the actuator command:
//!
//! ```text
//! a = (u − b·v) / m
//! v ← v + a·dt
//! x ← x + v·dt      (semi-implicit Euler, stepped on flush)
//! ```
//!
//! Faults can be injected per axis (sensor, drive) or globally (estop,
//! interlock link).

use mc_common::control_unit::safety::AxisMask;
use mc_common::hal::driver::{Actuator, HalError, Sensor};
use mc_common::hal::types::{AxisFeedback, InterlockInputs};

#[derive(Debug, Clone, Copy, PartialEq)]
struct PlantAxis {
    mass: f64,
    damping: f64,
    position: f64,
    velocity: f64,
    command: f64,
    braked: bool,
    peak_velocity: f64,
}

impl PlantAxis {
    fn step(&mut self, dt: f64) {
        if self.braked {
            self.velocity = 0.0;
            self.braked = false;
            return;
        }
        let accel = (self.command - self.damping * self.velocity) / self.mass;
        self.velocity += accel * dt;
        self.position += self.velocity * dt;
        self.peak_velocity = self.peak_velocity.max(self.velocity.abs());
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedPlant {
    axes: Vec<PlantAxis>,
    dt: f64,
    interlocks: InterlockInputs,
    interlock_link_down: bool,
    sensor_faults: AxisMask,
    drive_faults: AxisMask,
    link_down: bool,
    flushes: u64,
}

impl SimulatedPlant {
    /// `axis_count` unit masses with light damping, at rest at 0.
    pub fn new(axis_count: usize, dt: f64) -> Self {
        let axis = PlantAxis {
            mass: 1.0,
            damping: 0.5,
            position: 0.0,
            velocity: 0.0,
            command: 0.0,
            braked: false,
            peak_velocity: 0.0,
        };
        Self {
            axes: vec![axis; axis_count],
            dt,
            interlocks: InterlockInputs::default(),
            interlock_link_down: false,
            sensor_faults: AxisMask::EMPTY,
            drive_faults: AxisMask::EMPTY,
            link_down: false,
            flushes: 0,
        }
    }

    pub fn with_dynamics(mut self, mass: f64, damping: f64) -> Self {
        for axis in &mut self.axes {
            axis.mass = mass;
            axis.damping = damping;
        }
        self
    }

    pub fn with_positions(mut self, positions: &[f64]) -> Self {
        for (axis, &p) in self.axes.iter_mut().zip(positions) {
            axis.position = p;
        }
        self
    }

    #[inline]
    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }

    pub fn position(&self, axis: usize) -> f64 {
        self.axes.get(axis).map_or(f64::NAN, |a| a.position)
    }

    pub fn velocity(&self, axis: usize) -> f64 {
        self.axes.get(axis).map_or(f64::NAN, |a| a.velocity)
    }

    /// Largest |v| seen since construction or the last [`Self::reset_peaks`].
    pub fn peak_velocity(&self, axis: usize) -> f64 {
        self.axes.get(axis).map_or(0.0, |a| a.peak_velocity)
    }

    pub fn reset_peaks(&mut self) {
        for axis in &mut self.axes {
            axis.peak_velocity = 0.0;
        }
    }

    /// Last command written to `axis`.
    pub fn command(&self, axis: usize) -> f64 {
        self.axes.get(axis).map_or(0.0, |a| a.command)
    }

    /// Completed frames.
    #[inline]
    pub fn flushes(&self) -> u64 {
        self.flushes
    }

    // ── Fault injection ─────────────────────────────────────

    pub fn set_estop(&mut self, pressed: bool) {
        self.interlocks.estop = pressed;
    }

    pub fn set_limit_switch(&mut self, axis: usize, active: bool) {
        set_bit(&mut self.interlocks.limit_switches, axis, active);
    }

    pub fn set_sensor_fault(&mut self, axis: usize, faulted: bool) {
        set_bit(&mut self.sensor_faults, axis, faulted);
    }

    pub fn set_drive_fault(&mut self, axis: usize, faulted: bool) {
        set_bit(&mut self.drive_faults, axis, faulted);
    }

    /// Fail `read_interlocks` with a communication error.
    pub fn set_interlock_link_down(&mut self, down: bool) {
        self.interlock_link_down = down;
    }

    /// Fail `flush` with a communication error.
    pub fn set_link_down(&mut self, down: bool) {
        self.link_down = down;
    }
}

fn set_bit(mask: &mut AxisMask, axis: usize, on: bool) {
    if on {
        mask.insert(axis);
    } else {
        mask.remove(axis);
    }
}

impl Actuator for SimulatedPlant {
    fn write_command(&mut self, axis: usize, value: f64) -> Result<(), HalError> {
        if self.drive_faults.contains(axis) {
            return Err(HalError::DriveFault {
                axis,
                reason: "injected drive fault",
            });
        }
        let a = self
            .axes
            .get_mut(axis)
            .ok_or(HalError::AxisUnavailable(axis))?;
        a.command = value;
        Ok(())
    }

    fn engage_brake(&mut self, axis: usize) -> Result<(), HalError> {
        let a = self
            .axes
            .get_mut(axis)
            .ok_or(HalError::AxisUnavailable(axis))?;
        a.command = 0.0;
        a.braked = true;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), HalError> {
        if self.link_down {
            return Err(HalError::Communication("simulated link down"));
        }
        for axis in &mut self.axes {
            axis.step(self.dt);
        }
        self.flushes += 1;
        Ok(())
    }
}

impl Sensor for SimulatedPlant {
    fn read_state(&mut self, axis: usize) -> Result<AxisFeedback, HalError> {
        if self.sensor_faults.contains(axis) {
            return Err(HalError::SensorFault {
                axis,
                reason: "injected sensor fault",
            });
        }
        self.axes
            .get(axis)
            .map(|a| AxisFeedback::new(a.position, a.velocity))
            .ok_or(HalError::AxisUnavailable(axis))
    }

    fn read_interlocks(&mut self) -> Result<InterlockInputs, HalError> {
        if self.interlock_link_down {
            return Err(HalError::Communication("simulated interlock link down"));
        }
        Ok(self.interlocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_force_accelerates_mass() {
        let mut plant = SimulatedPlant::new(1, 0.001).with_dynamics(2.0, 0.0);
        for _ in 0..1000 {
            plant.write_command(0, 4.0).unwrap();
            plant.flush().unwrap();
        }
        // a = 2, after 1 s: v = 2, x ≈ 1
        assert!((plant.velocity(0) - 2.0).abs() < 1e-9);
        assert!((plant.position(0) - 1.0).abs() < 1e-2);
        assert_eq!(plant.flushes(), 1000);
        assert!((plant.peak_velocity(0) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn brake_stops_axis() {
        let mut plant = SimulatedPlant::new(1, 0.001);
        for _ in 0..10 {
            plant.write_command(0, 100.0).unwrap();
            plant.flush().unwrap();
        }
        assert!(plant.velocity(0) > 0.0);
        plant.engage_brake(0).unwrap();
        plant.flush().unwrap();
        assert_eq!(plant.velocity(0), 0.0);
        assert_eq!(plant.command(0), 0.0);
    }

    #[test]
    fn injected_faults() {
        let mut plant = SimulatedPlant::new(2, 0.001);
        plant.set_sensor_fault(1, true);
        assert!(plant.read_state(0).is_ok());
        assert!(matches!(
            plant.read_state(1),
            Err(HalError::SensorFault { axis: 1, .. })
        ));
        plant.set_sensor_fault(1, false);
        assert!(plant.read_state(1).is_ok());

        plant.set_drive_fault(0, true);
        assert!(plant.write_command(0, 1.0).is_err());

        plant.set_estop(true);
        plant.set_limit_switch(1, true);
        let inputs = plant.read_interlocks().unwrap();
        assert!(inputs.estop);
        assert!(inputs.limit_switches.contains(1));

        plant.set_interlock_link_down(true);
        assert!(plant.read_interlocks().is_err());
        plant.set_link_down(true);
        assert_eq!(
            plant.flush(),
            Err(HalError::Communication("simulated link down"))
        );
        assert_eq!(plant.read_state(5), Err(HalError::AxisUnavailable(5)));
    }
}
