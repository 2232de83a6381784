//! Exclusive UI-automation task runner.
//!
//! `autopilot simulate` plays a scenario file (a scripted host timeline plus
//! scripted tasks) through the exclusive task scheduler and prints every key
//! fed to the host. `autopilot check` only validates the files, and
//! `autopilot init` writes a scheduler config to start from.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Result;
use autopilot::exit_codes;
use autopilot::io::config::{SchedulerConfig, load_config, write_config};
use autopilot::io::diagnostics::TracingDiagnostics;
use autopilot::io::scenario::load_scenario;
use autopilot::io::transcript::{Transcript, write_transcript};
use autopilot::logging;
use autopilot::sim::{KeyFeed, SimulationStop, run_simulation};
use clap::{Parser, Subcommand};

const DEFAULT_MAX_TICKS: u64 = 10_000;

#[derive(Parser)]
#[command(
    name = "autopilot",
    version,
    about = "Exclusive UI-automation task runner"
)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug). `RUST_LOG` overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a scenario's tasks against its scripted host timeline.
    Simulate {
        scenario: PathBuf,
        /// Scheduler config (TOML). Defaults apply when missing.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write a JSON transcript of the run here.
        #[arg(long)]
        transcript: Option<PathBuf>,
        /// Stop after this many host ticks.
        #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
        max_ticks: u64,
    },
    /// Write a scheduler config file.
    Init {
        /// Destination of the TOML config.
        #[arg(default_value = "autopilot.toml")]
        path: PathBuf,
        /// Replace an existing file.
        #[arg(short, long)]
        force: bool,
        /// Host ticks per step for tasks without their own rate.
        #[arg(long, default_value_t = 1)]
        default_wait_multiplier: usize,
        /// Fail a task after this many dismissed-screen waits in one delay.
        #[arg(long)]
        dismissed_wait_limit: Option<u32>,
        /// Hold blacklisted tasks while an alternate frontend is attached.
        #[arg(long)]
        alternate_frontend: bool,
    },
    /// Validate a scenario (and config) without running it.
    Check {
        scenario: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    match run(cli.command) {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            process::exit(exit_codes::INVALID);
        }
    }
}

fn run(command: Command) -> Result<i32> {
    match command {
        Command::Simulate {
            scenario,
            config,
            transcript,
            max_ticks,
        } => cmd_simulate(&scenario, config.as_deref(), transcript.as_deref(), max_ticks),
        Command::Init {
            path,
            force,
            default_wait_multiplier,
            dismissed_wait_limit,
            alternate_frontend,
        } => {
            let cfg = SchedulerConfig {
                default_wait_multiplier,
                dismissed_wait_limit,
                alternate_frontend,
            };
            write_config(&path, &cfg, force)?;
            println!("wrote {}", path.display());
            Ok(exit_codes::OK)
        }
        Command::Check { scenario, config } => cmd_check(&scenario, config.as_deref()),
    }
}

fn config_from(path: Option<&Path>) -> Result<SchedulerConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(SchedulerConfig::default()),
    }
}

fn cmd_simulate(
    scenario_path: &Path,
    config_path: Option<&Path>,
    transcript_path: Option<&Path>,
    max_ticks: u64,
) -> Result<i32> {
    let config = config_from(config_path)?;
    let scenario = load_scenario(scenario_path)?;

    let outcome = run_simulation(
        &scenario,
        &config,
        Box::new(TracingDiagnostics),
        max_ticks,
        |feed: &KeyFeed| {
            let keys: Vec<String> = feed.keys.iter().map(ToString::to_string).collect();
            println!("tick {}: {}", feed.tick, keys.join(" "));
        },
    )?;

    if let Some(path) = transcript_path {
        write_transcript(path, &Transcript::new(&scenario.name, &outcome))?;
    }

    let code = match &outcome.stop {
        SimulationStop::Drained => {
            println!(
                "completed {} task(s) in {} tick(s)",
                outcome.completed.len(),
                outcome.ticks
            );
            exit_codes::OK
        }
        SimulationStop::TickLimit { max_ticks } => {
            eprintln!("tick limit reached ({max_ticks}) with tasks still queued");
            exit_codes::INCOMPLETE
        }
        SimulationStop::Halted { task, error } => {
            eprintln!("task \"{task}\" halted: {error}");
            exit_codes::HALTED
        }
    };
    Ok(code)
}

fn cmd_check(scenario_path: &Path, config_path: Option<&Path>) -> Result<i32> {
    config_from(config_path)?;
    let scenario = load_scenario(scenario_path)?;
    println!(
        "ok: {} task(s), {} screen frame(s)",
        scenario.tasks.len(),
        scenario.screens.len()
    );
    Ok(exit_codes::OK)
}
