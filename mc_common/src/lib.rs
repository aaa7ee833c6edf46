//! Motion Controller Common Library
//!
//! Shared types, system limits and configuration loading for the motion
//! controller workspace. The real-time core in `mc_control_unit` and any
//! external collaborator (CLI, HMI, bridge) speak through these types.
//!
//! # Module Structure
//!
//! - [`consts`] - System-wide numeric limits and defaults
//! - [`config`] - Configuration loading traits and shared config
//! - [`hal`] - Abstract actuator / sensor interfaces
//! - [`control_unit`] - Control state, motion requests, safety events, config
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use mc_common::prelude::*;
//!
//! let wp = Waypoint::new(vec![100.0]).with_tolerance(0.01);
//! assert_eq!(wp.positions(), &[100.0]);
//! ```

pub mod config;
pub mod consts;
pub mod control_unit;
pub mod hal;
pub mod prelude;
