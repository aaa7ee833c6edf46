//! Axis model: static limits and control gains of one axis.

use mc_common::control_unit::axis::AxisLimits;
use mc_common::control_unit::config::AxisConfig;
use mc_common::control_unit::control::ControlParameters;

/// Static description of one axis, built once at startup.
///
/// `index` is the 0-based position used by the driver traits and in
/// `SafetyEvent`; `id` is the configured 1-based identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisModel {
    pub index: usize,
    pub id: u8,
    pub name: String,
    pub limits: AxisLimits,
    pub control: ControlParameters,
}

impl AxisModel {
    /// Axis with default gains and a generated name.
    pub fn new(index: usize, limits: AxisLimits) -> Self {
        Self {
            index,
            id: u8::try_from(index + 1).unwrap_or(u8::MAX),
            name: format!("axis{index}"),
            limits,
            control: ControlParameters::default(),
        }
    }

    pub fn from_config(index: usize, config: &AxisConfig) -> Self {
        let name = if config.name.is_empty() {
            format!("axis{}", config.axis_id)
        } else {
            config.name.clone()
        };
        Self {
            index,
            id: config.axis_id,
            name,
            limits: config.limits(),
            control: config.control,
        }
    }

    pub fn with_control(mut self, control: ControlParameters) -> Self {
        self.control = control;
        self
    }
}

/// Limits of every axis, in index order.
pub fn axis_limits(axes: &[AxisModel]) -> Vec<AxisLimits> {
    axes.iter().map(|a| a.limits).collect()
}
