//! Deterministic control cycle runner.
//!
//! ## RT Setup Sequence
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)`: lock all pages.
//! 2. Prefault stack pages.
//! 3. `sched_setaffinity`: pin to an isolated CPU core.
//! 4. `sched_setscheduler(SCHED_FIFO, prio)`: RT priority.
//!
//! Steps 1, 3 and 4 are no-ops without the `rt` feature.
//!
//! ## Cycle Loop
//! Absolute-time pacing: the next wake-up is always `previous + period`
//! (`clock_nanosleep(TIMER_ABSTIME)` on `CLOCK_MONOTONIC` with `rt`,
//! `Instant` deadlines otherwise). A tick that runs longer than the period
//! is counted as an overrun and reported to the control task, which raises
//! `WatchdogTimeout` on the next tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use mc_common::hal::driver::{Actuator, Sensor};
use thiserror::Error;
use tracing::debug;

use crate::control_task::ControlTask;

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
///
/// Updated every cycle with no allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: i64,
    /// Minimum cycle duration [ns].
    pub min_cycle_ns: i64,
    /// Maximum cycle duration [ns].
    pub max_cycle_ns: i64,
    /// Running sum for average computation.
    pub sum_cycle_ns: i64,
    /// Number of overruns detected.
    pub overruns: u64,
    /// Maximum wake-up latency [ns] (time between expected and actual wake).
    pub max_latency_ns: i64,
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
        }
    }

    /// Record a cycle duration. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns += duration_ns;
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
    }

    /// Average cycle time [ns] (returns 0 if no cycles).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Errors during RT setup or cycle pacing.
#[derive(Debug, Error)]
pub enum CycleError {
    /// RT system call failed.
    #[error("RT setup error: {0}")]
    RtSetup(String),
    /// Monotonic clock unavailable.
    #[error("clock error: {0}")]
    Clock(String),
}

/// Lock all current and future memory pages.
#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), CycleError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| CycleError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), CycleError> {
    Ok(())
}

/// Touch 256 KiB of stack so the control thread does not page-fault later.
fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, aligned, exclusive reference into `buf`.
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

/// Pin the current thread to a CPU core.
#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), CycleError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| CycleError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| CycleError::RtSetup(format!("sched_setaffinity failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), CycleError> {
    Ok(())
}

/// Switch the current thread to SCHED_FIFO.
#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), CycleError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` outlives the call; pid 0 targets the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(CycleError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), CycleError> {
    Ok(())
}

/// Full RT setup for the calling thread. Call before [`CycleRunner::run`].
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    debug!("RT setup done (cpu {cpu_core}, priority {rt_priority})");
    Ok(())
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Paces a [`ControlTask`] against a driver at the configured period.
pub struct CycleRunner<D> {
    task: ControlTask,
    driver: D,
    stats: CycleStats,
    cycle_time_ns: i64,
    running: Arc<AtomicBool>,
}

impl<D: Actuator + Sensor> CycleRunner<D> {
    pub fn new(task: ControlTask, driver: D, cycle_time_us: u32) -> Self {
        Self {
            task,
            driver,
            stats: CycleStats::new(),
            cycle_time_ns: i64::from(cycle_time_us) * 1000,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Flag that stops [`Self::run`] when cleared.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    #[inline]
    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    #[inline]
    pub fn task(&self) -> &ControlTask {
        &self.task
    }

    #[inline]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Run until the stop handle is cleared.
    pub fn run(&mut self) -> Result<(), CycleError> {
        self.run_loop(None)
    }

    /// Run at most `cycles` ticks (or until stopped).
    pub fn run_for(&mut self, cycles: u64) -> Result<(), CycleError> {
        self.run_loop(Some(cycles))
    }

    pub fn into_parts(self) -> (ControlTask, D, CycleStats) {
        (self.task, self.driver, self.stats)
    }

    fn should_continue(&self, done: u64, limit: Option<u64>) -> bool {
        self.running.load(Ordering::Acquire) && limit.is_none_or(|n| done < n)
    }

    fn account(&mut self, duration_ns: i64, latency_ns: i64) {
        self.stats.record(duration_ns, latency_ns);
        if duration_ns > self.cycle_time_ns {
            self.stats.overruns += 1;
            self.task.signal_overrun();
        }
    }

    #[cfg(not(feature = "rt"))]
    fn run_loop(&mut self, limit: Option<u64>) -> Result<(), CycleError> {
        use std::time::{Duration, Instant};

        let period = Duration::from_nanos(self.cycle_time_ns.unsigned_abs());
        let mut next_wake = Instant::now();
        let mut done = 0u64;

        while self.should_continue(done, limit) {
            let deadline = next_wake;
            next_wake += period;

            let start = Instant::now();
            let latency_ns = start.saturating_duration_since(deadline).as_nanos() as i64;
            self.task.tick(&mut self.driver);
            self.account(start.elapsed().as_nanos() as i64, latency_ns);
            done += 1;

            let now = Instant::now();
            match next_wake.checked_duration_since(now) {
                Some(remaining) => std::thread::sleep(remaining),
                // Missed the boundary: re-anchor instead of bursting.
                None => next_wake = now,
            }
        }
        Ok(())
    }

    #[cfg(feature = "rt")]
    fn run_loop(&mut self, limit: Option<u64>) -> Result<(), CycleError> {
        use nix::time::{ClockId, ClockNanosleepFlags, clock_gettime, clock_nanosleep};

        let clock = ClockId::CLOCK_MONOTONIC;
        let now = || clock_gettime(clock).map_err(|e| CycleError::Clock(e.to_string()));
        let mut next_wake = now()?;
        let mut done = 0u64;

        while self.should_continue(done, limit) {
            let deadline = next_wake;
            next_wake = timespec_add_ns(next_wake, self.cycle_time_ns);

            let start = now()?;
            let latency_ns = timespec_diff_ns(&start, &deadline).max(0);
            self.task.tick(&mut self.driver);
            let end = now()?;
            self.account(timespec_diff_ns(&end, &start), latency_ns);
            done += 1;

            let _ = clock_nanosleep(clock, ClockNanosleepFlags::TIMER_ABSTIME, &next_wake);
        }
        Ok(())
    }
}

// ─── Time Helpers ───────────────────────────────────────────────────

/// Add nanoseconds to a TimeSpec.
#[cfg(feature = "rt")]
fn timespec_add_ns(ts: nix::sys::time::TimeSpec, ns: i64) -> nix::sys::time::TimeSpec {
    use nix::sys::time::TimeSpec;
    let mut secs = ts.tv_sec();
    let mut nanos = ts.tv_nsec() + ns;
    while nanos >= 1_000_000_000 {
        secs += 1;
        nanos -= 1_000_000_000;
    }
    while nanos < 0 {
        secs -= 1;
        nanos += 1_000_000_000;
    }
    TimeSpec::new(secs, nanos)
}

/// Compute the difference (a - b) in nanoseconds.
#[cfg(feature = "rt")]
fn timespec_diff_ns(a: &nix::sys::time::TimeSpec, b: &nix::sys::time::TimeSpec) -> i64 {
    (a.tv_sec() - b.tv_sec()) * 1_000_000_000 + (a.tv_nsec() - b.tv_nsec())
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;
    use crate::controller::split;
    use crate::sim::SimulatedPlant;

    #[test]
    fn cycle_stats_basic() {
        let mut stats = CycleStats::new();
        assert_eq!(stats.cycle_count, 0);
        assert_eq!(stats.avg_cycle_ns(), 0);

        stats.record(500_000, 1_000);
        assert_eq!(stats.cycle_count, 1);
        assert_eq!(stats.last_cycle_ns, 500_000);
        assert_eq!(stats.min_cycle_ns, 500_000);
        assert_eq!(stats.max_cycle_ns, 500_000);
        assert_eq!(stats.max_latency_ns, 1_000);

        stats.record(600_000, 500);
        assert_eq!(stats.cycle_count, 2);
        assert_eq!(stats.min_cycle_ns, 500_000);
        assert_eq!(stats.max_cycle_ns, 600_000);
        assert_eq!(stats.max_latency_ns, 1_000);
        assert_eq!(stats.avg_cycle_ns(), 550_000);
    }

    #[test]
    fn rt_setup_no_rt_feature_is_noop() {
        #[cfg(not(feature = "rt"))]
        {
            assert!(rt_setup(0, 80).is_ok());
        }
    }

    #[test]
    fn runner_ticks_requested_cycles() {
        let config = load_config_from_str(
            "[controller]\ncycle_time_us = 500\n[[axes]]\naxis_id = 1\nmax_velocity = 1.0\nmax_acceleration = 1.0\n",
        )
        .unwrap();
        let (_service, task) = split(&config);
        let mut runner = CycleRunner::new(task, SimulatedPlant::new(1, 0.0005), 500);
        runner.run_for(5).unwrap();
        assert_eq!(runner.stats().cycle_count, 5);
        let (task, plant, _stats) = runner.into_parts();
        assert_eq!(task.cycle(), 5);
        assert_eq!(plant.flushes(), 5);
    }

    #[test]
    fn cleared_stop_handle_prevents_ticks() {
        let config = load_config_from_str(
            "[[axes]]\naxis_id = 1\nmax_velocity = 1.0\nmax_acceleration = 1.0\n",
        )
        .unwrap();
        let (_service, task) = split(&config);
        let mut runner = CycleRunner::new(task, SimulatedPlant::new(1, 0.001), 1000);
        runner.stop_handle().store(false, Ordering::Release);
        runner.run().unwrap();
        assert_eq!(runner.task().cycle(), 0);
    }

    #[test]
    fn cycle_error_display() {
        let err = CycleError::RtSetup("mlockall failed".to_string());
        assert_eq!(err.to_string(), "RT setup error: mlockall failed");
    }
}
