//! PID with backward Euler integration, filtered derivative (Tf) and
//! back-calculation anti-windup (Tt).

use mc_common::control_unit::control::ControlParameters;

/// PID gains extracted from [`ControlParameters`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    pub kp: f64,
    /// 0 = integral disabled.
    pub ki: f64,
    /// 0 = derivative disabled.
    pub kd: f64,
    /// Derivative filter time constant [s] (0 = unfiltered).
    pub tf: f64,
    /// Tracking time constant [s]. 0 selects `kp / ki` when both are set.
    pub tt: f64,
}

impl PidGains {
    pub fn from_params(params: &ControlParameters) -> Self {
        Self {
            kp: params.kp,
            ki: params.ki,
            kd: params.kd,
            tf: params.tf,
            tt: params.tt,
        }
    }

    /// Tracking time constant actually used, or 0 if anti-windup is off.
    #[inline]
    pub fn tracking_time(&self) -> f64 {
        if self.tt > 0.0 {
            self.tt
        } else if self.ki > 0.0 && self.kp > 0.0 {
            self.kp / self.ki
        } else {
            0.0
        }
    }
}

/// PID memory carried across cycles.
///
/// Reset on fault, on reset acceptance and whenever the axis is re-synced to
/// its measured position.
#[derive(Debug, Clone, Copy, Default)]
pub struct PidState {
    integral: f64,
    prev_error: f64,
    derivative: f64,
    primed: bool,
}

impl PidState {
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// One PID step on `error` (setpoint − measured). Returns the unsaturated output.
    pub fn update(&mut self, gains: &PidGains, error: f64, dt: f64) -> f64 {
        if dt <= 0.0 {
            return 0.0;
        }

        let p = gains.kp * error;

        if gains.ki != 0.0 {
            self.integral += gains.ki * error * dt;
        } else {
            self.integral = 0.0;
        }

        let d = if gains.kd != 0.0 && self.primed {
            let raw = (error - self.prev_error) / dt;
            if gains.tf > 0.0 {
                let alpha = dt / (gains.tf + dt);
                self.derivative += alpha * (raw - self.derivative);
            } else {
                self.derivative = raw;
            }
            gains.kd * self.derivative
        } else {
            self.derivative = 0.0;
            0.0
        };

        self.prev_error = error;
        self.primed = true;
        p + self.integral + d
    }

    /// Feed the saturation excess back into the integrator.
    ///
    /// `excess = saturated − unsaturated` of the total output this cycle.
    pub fn back_calculate(&mut self, gains: &PidGains, excess: f64, dt: f64) {
        let tt = gains.tracking_time();
        if gains.ki != 0.0 && tt > 0.0 && excess != 0.0 {
            self.integral += excess / tt * dt;
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
