//! # Motion Controller Control Unit
//!
//! Real-time core of the motion controller: turns waypoint requests into
//! jerk- or acceleration-limited trajectories, tracks them at a fixed cycle
//! rate with PID + feedforward correction, and lets a safety supervisor
//! preempt everything on faults, emergency stop or cancellation.
//!
//! ## Task Split
//!
//! - **Planning side** ([`service::MotionService`]): queue, planner, request
//!   status bookkeeping, logging. May allocate and block.
//! - **Control side** ([`control_task::ControlTask`]): interlocks, supervisor,
//!   interpolator, control law. Fixed-size state, `try_lock` only, never logs.
//!
//! The two sides meet in [`handoff::SharedState`]: a single-slot profile
//! handoff, an atomic command mailbox and the published controller status.
//! Control-side outcomes travel back as [`handoff::ControlReport`]s.
//!
//! [`controller::MotionController`] bundles both halves for single-threaded
//! use (tests, benches); [`cycle::CycleRunner`] paces the control side on its
//! own thread.

#![deny(clippy::disallowed_types)]

pub mod axis;
pub mod config;
pub mod control;
pub mod control_task;
pub mod controller;
pub mod cycle;
pub mod diagnostics;
pub mod handoff;
pub mod motion;
pub mod safety;
pub mod service;
pub mod sim;
