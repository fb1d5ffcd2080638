//! Fleet simulation driver.
//!
//! Generates synthetic predictive-maintenance data from a simulated motor
//! fleet and writes one record per motor per tick to stdout, with a
//! mission log on stderr. Batch mode runs every motor to its maintenance
//! cycle target; live mode steps interactively and auto-resolves operator
//! decisions with an overhaul so headless runs never stall.
//!
//! # Usage
//! ```bash
//! ./simulate --motors 5 --cycles 2 --seed 7 --format csv > fleet.csv
//! RUST_LOG=fleetsim=debug ./simulate --mode live --ticks 2000
//! ```

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use fleetsim::{BaseConfig, Engine, GenerationMode, Observation, RunConfig};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "simulate")]
#[command(about = "Synthetic motor-fleet sensor data generator")]
#[command(version)]
struct Args {
    /// Number of motors in the fleet
    #[arg(short, long, default_value = "5")]
    motors: u32,

    /// Automatic-maintenance cycles per motor (batch mode)
    #[arg(short, long, default_value = "1")]
    cycles: u32,

    /// Generation mode: live or batch
    #[arg(long, default_value = "batch")]
    mode: String,

    /// Ticks to run in live mode
    #[arg(long, default_value = "2000")]
    ticks: u32,

    /// Tick ceiling for batch generation
    #[arg(long, default_value = "500000")]
    max_ticks: u64,

    /// Degradation speed multiplier (>1 ages motors faster)
    #[arg(long, default_value = "1.0")]
    degradation_speed: f64,

    /// Random seed for reproducibility
    #[arg(long, env = "FLEETSIM_SEED")]
    seed: Option<u64>,

    /// Output format: json or csv
    #[arg(short, long, default_value = "json")]
    format: String,

    /// TOML file overriding base/run configuration ([base] and [run] tables)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Suppress the mission log (only records on stdout)
    #[arg(short, long)]
    quiet: bool,
}

/// Optional configuration file layout.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    base: BaseConfig,
    run: RunConfig,
}

// ============================================================================
// Mission log
// ============================================================================

fn log_mission(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("[simulate] {message}");
    }
}

// ============================================================================
// Record output
// ============================================================================

fn csv_sensor(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.3}")).unwrap_or_default()
}

fn write_record(out: &mut impl Write, record: &Observation, format: &str) -> anyhow::Result<()> {
    match format {
        "csv" => {
            writeln!(
                out,
                "{},{},{},{:.4},{},{},{},{},{},{},{:.3},{},{}",
                record.time,
                record.motor_id,
                record.cycle_id,
                record.motor_health,
                record.health_state,
                record.degradation_stage,
                csv_sensor(record.temperature),
                csv_sensor(record.vibration),
                csv_sensor(record.current),
                csv_sensor(record.rpm),
                record.hours_since_maintenance,
                record.regime,
                record
                    .maintenance_event
                    .map(|k| k.to_string())
                    .unwrap_or_default(),
            )?;
        }
        _ => {
            writeln!(out, "{}", serde_json::to_string(record)?)?;
        }
    }
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    // Layer CLI flags over the optional config file.
    let (base, mut run) = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            let file: FileConfig =
                toml::from_str(&text).context("parsing config file")?;
            (file.base, file.run)
        }
        None => (BaseConfig::default(), RunConfig::default()),
    };
    run.num_motors = args.motors;
    run.target_maintenance_cycles = args.cycles;
    run.degradation_speed = args.degradation_speed;
    run.seed = args.seed.or(run.seed);
    run.mode = match args.mode.as_str() {
        "live" => GenerationMode::Live,
        "batch" => GenerationMode::Batch,
        other => anyhow::bail!("unknown mode '{other}' (expected live or batch)"),
    };

    log_mission(&"=".repeat(60), args.quiet);
    log_mission("MOTOR FLEET SIMULATION", args.quiet);
    log_mission(&"=".repeat(60), args.quiet);
    log_mission(&format!("  Motors: {}", run.num_motors), args.quiet);
    log_mission(&format!("  Mode: {}", run.mode), args.quiet);
    if run.mode == GenerationMode::Batch {
        log_mission(
            &format!(
                "  Cycle target: {} (ceiling {} ticks)",
                run.target_maintenance_cycles, args.max_ticks
            ),
            args.quiet,
        );
    } else {
        log_mission(&format!("  Ticks: {}", args.ticks), args.quiet);
    }
    log_mission(
        &format!("  Degradation speed: {}x", run.degradation_speed),
        args.quiet,
    );
    match run.seed {
        Some(seed) => log_mission(&format!("  Seed: {seed}"), args.quiet),
        None => log_mission("  Seed: from OS entropy (non-reproducible)", args.quiet),
    }
    log_mission(&"=".repeat(60), args.quiet);

    let mut engine = Engine::new(base, run.clone())?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.format == "csv" {
        writeln!(out, "{}", Observation::FIELD_NAMES.join(","))?;
    }

    let records_written = match run.mode {
        GenerationMode::Batch => {
            let outcome = engine.generate_batch(args.max_ticks)?;
            log_mission(
                &format!(
                    "generation stopped: {} after {} ticks",
                    outcome.reason, outcome.ticks
                ),
                args.quiet,
            );
            for record in &outcome.records {
                write_record(&mut out, record, &args.format)?;
            }
            outcome.records.len()
        }
        GenerationMode::Live => {
            let mut written = 0usize;
            for _ in 0..args.ticks {
                let records = engine.step(1)?;
                for record in &records {
                    write_record(&mut out, record, &args.format)?;
                }
                written += records.len();

                // Headless runs resolve every pending decision with an
                // overhaul so the fleet keeps emitting.
                for decision in engine.pending_decisions() {
                    log_mission(
                        &format!(
                            "tick {}: motor {} paused at {:.1}% health -> overhaul",
                            decision.paused_at_tick,
                            decision.motor_id,
                            decision.health * 100.0
                        ),
                        args.quiet,
                    );
                    engine.perform_maintenance(decision.motor_id)?;
                }
            }
            written
        }
    };
    out.flush()?;

    let status = engine.status();
    log_mission(&"=".repeat(60), args.quiet);
    log_mission("SIMULATION COMPLETE", args.quiet);
    log_mission(&format!("  Records: {records_written}"), args.quiet);
    log_mission(
        &format!("  Maintenance events: {}", status.maintenance_events),
        args.quiet,
    );
    log_mission(
        &format!("  Final tick: {} (regime {})", status.time, status.regime),
        args.quiet,
    );
    log_mission(&"=".repeat(60), args.quiet);

    Ok(())
}
