//! Safety module root.
//!
//! Interlock scanning, the controller state machine and reset gating.

pub mod interlock;
pub mod recovery;
pub mod supervisor;
