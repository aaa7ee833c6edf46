//! Following (lag) error monitoring.
//!
//! |commanded − actual| against `lag_error_limit`. A limit of zero disables
//! the check. The interlock monitor turns an exceeded limit into
//! `SafetyEvent::LimitExceeded`.

/// Lag error evaluation for one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LagCheck {
    /// Absolute lag error.
    pub error: f64,
    pub exceeded: bool,
}

/// Evaluate the lag error of one axis. `limit <= 0` disables the check.
#[inline]
pub fn evaluate_lag(commanded: f64, actual: f64, limit: f64) -> LagCheck {
    let error = (commanded - actual).abs();
    LagCheck {
        error,
        exceeded: limit > 0.0 && error > limit,
    }
}
