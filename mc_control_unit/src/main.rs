//! # Motion Controller
//!
//! Runs the control task on a dedicated (optionally RT) thread against the
//! simulated plant, drives the planning service from the main thread, and
//! executes the waypoints given with `--target`.
//!
//! ```text
//! mc_control_unit --config config/controller.toml --target 100,10 --target 0,0
//! ```

use std::path::PathBuf;
use std::process;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use clap::Parser;
use mc_common::config::LogLevel;
use mc_common::control_unit::motion::{Priority, Waypoint};
use mc_control_unit::config::{LoadedConfig, load_config};
use mc_control_unit::controller::split;
use mc_control_unit::cycle::{CycleRunner, rt_setup};
use mc_control_unit::sim::SimulatedPlant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Motion Controller: trajectory planning and closed-loop axis control
#[derive(Parser, Debug)]
#[command(name = "mc_control_unit")]
#[command(version)]
#[command(about = "Multi-axis motion controller running against a simulated plant")]
struct Args {
    /// Path to the controller configuration TOML.
    #[arg(short, long, default_value = "config/controller.toml")]
    config: PathBuf,

    /// Waypoint as comma-separated axis positions; repeat for a multi-waypoint move.
    #[arg(long = "target", value_name = "POSITIONS", value_parser = parse_waypoint)]
    targets: Vec<Waypoint>,

    /// Request priority (higher runs first).
    #[arg(long, default_value_t = Priority::NORMAL.0)]
    priority: u8,

    /// CPU core to pin the control thread to (default: 1).
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority (default: 80).
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn parse_waypoint(text: &str) -> Result<Waypoint, String> {
    let positions = text
        .split(',')
        .map(|p| {
            p.trim()
                .parse::<f64>()
                .map_err(|e| format!("invalid position '{p}': {e}"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Waypoint::new(positions))
}

fn main() {
    let args = Args::parse();
    let loaded = load_config(&args.config);
    let log_level = loaded
        .as_ref()
        .map(|c| c.machine.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, log_level);

    info!("Motion Controller v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = loaded
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
        .and_then(|loaded| run(&args, &loaded));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Motion Controller shutdown complete");
}

fn run(args: &Args, loaded: &LoadedConfig) -> Result<(), Box<dyn std::error::Error>> {
    let controller = &loaded.machine.controller;
    info!(
        "Config OK: service={}, cycle_time={}µs, axes={}",
        loaded.machine.shared.service_name,
        controller.cycle_time_us,
        loaded.axes.len(),
    );

    let (mut service, task) = split(loaded);
    let plant = SimulatedPlant::new(loaded.axes.len(), loaded.period_s());
    let mut runner = CycleRunner::new(task, plant, controller.cycle_time_us);
    let running = runner.stop_handle();

    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    let (cpu_core, rt_priority) = (args.cpu_core, args.rt_priority);
    let control = thread::Builder::new()
        .name("mc-control".to_string())
        .spawn(move || {
            rt_setup(cpu_core, rt_priority)?;
            runner.run()?;
            Ok::<_, mc_control_unit::cycle::CycleError>(runner.into_parts())
        })?;

    let request = if args.targets.is_empty() {
        info!("No targets given, holding position until Ctrl-C");
        None
    } else {
        let id = service.submit_motion(args.targets.clone(), Priority(args.priority))?;
        info!("Submitted request {id} with {} waypoint(s)", args.targets.len());
        Some(id)
    };

    let poll_interval = Duration::from_micros(u64::from(controller.cycle_time_us));
    while running.load(Ordering::SeqCst) && !control.is_finished() {
        service.poll();
        let done = request.is_some_and(|id| service.get_status(id).is_some_and(|s| s.is_terminal()));
        if done {
            break;
        }
        thread::sleep(poll_interval);
    }

    running.store(false, Ordering::SeqCst);
    let (_task, plant, stats) = control
        .join()
        .map_err(|_| "control thread panicked".to_string())??;
    service.sync();

    if let Some(id) = request {
        match service.get_status(id) {
            Some(status) => info!("Request {id}: {status:?}"),
            None => warn!("Request {id}: status unavailable"),
        }
    }
    for axis in 0..plant.axis_count() {
        info!(
            "Axis {axis}: position={:.4} peak_velocity={:.4}",
            plant.position(axis),
            plant.peak_velocity(axis)
        );
    }
    info!(
        "Cycle stats: count={}, avg={}ns, max={}ns, overruns={}, max_latency={}ns",
        stats.cycle_count,
        stats.avg_cycle_ns(),
        stats.max_cycle_ns,
        stats.overruns,
        stats.max_latency_ns
    );

    println!("{}", serde_json::to_string_pretty(&service.snapshot())?);
    Ok(())
}

/// Setup tracing subscriber: `RUST_LOG` wins, then `--verbose`, then the
/// configured `[shared] log_level`.
fn setup_tracing(args: &Args, log_level: LogLevel) {
    let directive = if args.verbose {
        LogLevel::Debug.as_directive()
    } else {
        log_level.as_directive()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
