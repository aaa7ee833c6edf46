//! Integration tests for the motion controller.
//!
//! These tests drive the planning service and the control task together
//! against the simulated plant, covering full request lifecycles, safety
//! preemption, cancellation and configuration loading.

mod integration;
