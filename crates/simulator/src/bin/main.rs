//! Block Simulator CLI
//!
//! Run a demo scenario and print what happened.
//!
//! # Example
//!
//! ```bash
//! # Flood a hop counter down a line of 32 blocks
//! blocksim flood -n 32
//!
//! # Ten radios beaconing with shadowing, JSON report
//! blocksim beacon -n 10 --spacing 5 --shadowing 4 --seed 7 --json
//! ```

use blocksim_simulator::{Scenario, Simulator, SimulatorConfig};
use blocksim_types::VirtualTime;
use clap::{Parser, ValueEnum};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ScenarioArg {
    Flood,
    Beacon,
}

impl From<ScenarioArg> for Scenario {
    fn from(arg: ScenarioArg) -> Self {
        match arg {
            ScenarioArg::Flood => Scenario::Flood,
            ScenarioArg::Beacon => Scenario::Beacon,
        }
    }
}

/// Block Simulator
///
/// Runs modular robot blocks in virtual time. Reproducible when the same
/// seed is used and real-time pacing is off.
#[derive(Parser, Debug)]
#[command(name = "blocksim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Scenario to run
    #[arg(value_enum, default_value = "flood")]
    scenario: ScenarioArg,

    /// Number of blocks
    #[arg(short = 'n', long, default_value = "8")]
    blocks: u32,

    /// Distance between neighbouring blocks
    #[arg(long, default_value = "10")]
    spacing: f64,

    /// Message size in bytes
    #[arg(long, default_value = "4")]
    size: u32,

    /// Data rate in bit/s
    #[arg(short = 'r', long, default_value = "1000000")]
    rate: f64,

    /// Draw each transmission's rate from rate·(1±jitter)
    #[arg(long)]
    rate_jitter: Option<f64>,

    /// Beacons per block
    #[arg(long, default_value = "5")]
    beacons: u32,

    /// Beacon period in microseconds
    #[arg(long, default_value = "1000")]
    period: u64,

    /// Log-normal shadowing deviation in dB (beacon scenario)
    #[arg(long)]
    shadowing: Option<f64>,

    /// Start the flood with a tap on block 0 at this date (microseconds)
    #[arg(long)]
    tap_at: Option<u64>,

    /// Stop at this virtual date (microseconds)
    #[arg(long)]
    max_date: Option<u64>,

    /// Pace against the wall clock at this speed (1.0 = real time)
    #[arg(long)]
    real_time: Option<f64>,

    /// Random seed for reproducible results. When omitted, a random seed is used.
    #[arg(long)]
    seed: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn to_config(&self, seed: u64) -> SimulatorConfig {
        let mut config = SimulatorConfig::new(self.scenario.into(), self.blocks)
            .with_spacing(self.spacing)
            .with_message_size(self.size)
            .with_data_rate(self.rate)
            .with_beacons(self.beacons, self.period)
            .with_seed(seed);
        if let Some(jitter) = self.rate_jitter {
            config = config.with_rate_jitter(jitter);
        }
        if let Some(deviation) = self.shadowing {
            config = config.with_shadowing(deviation);
        }
        if let Some(at) = self.tap_at {
            config = config.with_tap_at(VirtualTime::from_micros(at));
        }
        if let Some(date) = self.max_date {
            config = config.with_max_date(VirtualTime::from_micros(date));
        }
        if let Some(speed) = self.real_time {
            config = config.with_real_time(speed);
        }
        config
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,blocksim=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);
    info!(?args, seed, "Starting simulation");

    let result = Simulator::new(args.to_config(seed)).and_then(|simulator| simulator.run());
    let report = match result {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "simulation failed");
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if args.json {
        match report.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        report.print_summary();
    }
    ExitCode::SUCCESS
}
