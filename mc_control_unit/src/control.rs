//! Control law root.
//!
//! Per-axis position loop: PID on the following error plus velocity,
//! acceleration and friction feedforward, clamped to `out_max`. Each
//! component is disabled by a zero gain.

pub mod feedforward;
pub mod lag;
pub mod output;
pub mod pid;
