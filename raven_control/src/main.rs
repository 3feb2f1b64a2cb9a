//! # Raven Homing Bench
//!
//! Runs the joint homing sequence at the control tick rate against two
//! simulated arms, with the run level held at INIT / AUTO_INIT.
//!
//! Configuration is a single homing TOML (`--config`); without one the
//! built-in defaults for standard hardware are used. The runner performs
//! RT setup, then steps the orchestrator until every joint is ready, the
//! tick budget runs out, or SIGINT arrives.

use clap::Parser;
use raven_common::config::load_homing_config;
use raven_common::homing::HomingConfig;
use raven_control::cycle::{BenchRunner, rt_setup};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Raven homing bench: joint homing against simulated arms
#[derive(Parser, Debug)]
#[command(name = "raven_control")]
#[command(version)]
#[command(about = "Joint homing bench runner for the Raven arm controller")]
struct Args {
    /// Path to the homing configuration TOML. Defaults apply when omitted.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Give up after this many ticks.
    #[arg(long, default_value_t = 30_000)]
    ticks: u64,

    /// Pace the loop at the configured tick period instead of running flat out.
    #[arg(long)]
    realtime: bool,

    /// CPU core to pin the RT thread to (default: 1).
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

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("Raven homing bench v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Raven homing bench shutdown complete");
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match args.config {
        Some(ref path) => {
            info!("Loading homing config from {}", path.display());
            load_homing_config(path)?
        }
        None => {
            info!("No --config given, using built-in defaults");
            HomingConfig::default()
        }
    };

    info!(
        "Config OK: hardware={:?}, tick={}µs, warmup={} ticks, settle={} ticks",
        config.hardware, config.tick_period_us, config.warmup_ticks, config.settle_ticks,
    );

    rt_setup(args.cpu_core, args.rt_priority)?;
    info!(
        "RT setup complete (cpu_core={}, priority={})",
        args.cpu_core, args.rt_priority
    );

    let mut runner = BenchRunner::new(config)?;
    info!("BenchRunner initialized, entering homing loop");

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    let summary = match runner.run(args.ticks, args.realtime, &running) {
        Ok(summary) => summary,
        Err(e) => {
            error!("homing loop error: {e}");
            return Err(Box::new(e) as Box<dyn std::error::Error>);
        }
    };

    let stats = &runner.stats;
    info!(
        ticks = summary.ticks,
        limits_found = summary.limits_found,
        calibrations = summary.calibrations,
        avg_cycle_ns = stats.avg_cycle_ns(),
        max_cycle_ns = stats.max_cycle_ns,
        overruns = stats.overruns,
        "homing run finished"
    );

    for mech in runner.device().mechanisms() {
        for joint in mech.joints() {
            info!(
                arm = ?mech.arm(),
                joint = ?joint.kind(),
                state = ?joint.state(),
                jpos = joint.jpos,
                enc_offset = joint.enc_offset(),
                "final joint state"
            );
        }
    }

    if !summary.completed {
        warn!("homing did not complete within {} ticks", summary.ticks);
    }
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

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
