//! Control unit shared types.
//!
//! Everything the real-time core exchanges with its collaborators: controller
//! and request state, safety events, planning errors, motion requests, axis
//! limits, control gains and the configuration structures.

pub mod axis;
pub mod config;
pub mod control;
pub mod error;
pub mod motion;
pub mod safety;
pub mod state;
