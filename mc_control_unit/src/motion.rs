//! Motion generation: planning, profile representation, sampling, queueing.

pub mod interpolator;
pub mod planner;
pub mod profile;
pub mod queue;
