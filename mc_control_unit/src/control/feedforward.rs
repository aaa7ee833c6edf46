//! Feedforward controller.
//!
//! Velocity FF (Kvff × v), acceleration FF (Kaff × a), static friction
//! compensation (Friction × sign(v)). Zero gains disable each component.

use mc_common::control_unit::control::ControlParameters;

/// Feedforward gains, extracted from [`ControlParameters`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedforwardGains {
    /// Velocity feedforward gain (0 = disabled).
    pub kvff: f64,
    /// Acceleration feedforward gain (0 = disabled).
    pub kaff: f64,
    /// Static friction offset (0 = disabled).
    pub friction: f64,
}

impl FeedforwardGains {
    pub fn from_params(params: &ControlParameters) -> Self {
        Self {
            kvff: params.kvff,
            kaff: params.kaff,
            friction: params.friction,
        }
    }

    /// Feedforward contribution for the commanded velocity and acceleration.
    ///
    /// ```text
    /// ff = Kvff × v + Kaff × a + Friction × sign(v)
    /// ```
    #[inline]
    pub fn compute(&self, velocity: f64, acceleration: f64) -> f64 {
        let mut output = 0.0;
        if self.kvff != 0.0 {
            output += self.kvff * velocity;
        }
        if self.kaff != 0.0 {
            output += self.kaff * acceleration;
        }
        if self.friction != 0.0 && velocity != 0.0 {
            output += self.friction * velocity.signum();
        }
        output
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
