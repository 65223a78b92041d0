//! Relaynet Simulator CLI
//!
//! Run deterministic relay-network simulations with configurable parameters.
//!
//! # Example
//!
//! ```bash
//! # Reproducible random walk on a six-node mesh
//! relaynet-sim --scenario random-hop --nodes 6 --seed 42 --max-time 120
//!
//! # Retry pair with a harsher responder, random seed, JSON report
//! relaynet-sim --scenario retry --loss 0.5 --timeout 0.5 --json
//! ```

use clap::{Parser, ValueEnum};
use relaynet_simulation::RunLimits;
use relaynet_simulator::{Scenario, ScenarioConfig, Simulator};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ScenarioArg {
    /// Retransmitting sender against a lossy responder
    Retry,
    /// Hold-and-forward ring
    Delay,
    /// Random walk over a full mesh
    RandomHop,
}

impl From<ScenarioArg> for Scenario {
    fn from(arg: ScenarioArg) -> Self {
        match arg {
            ScenarioArg::Retry => Scenario::Retry,
            ScenarioArg::Delay => Scenario::Delay,
            ScenarioArg::RandomHop => Scenario::RandomHop,
        }
    }
}

/// Relaynet Simulator
///
/// Runs deterministic relay-network simulations. Single-threaded,
/// reproducible when the same seed is used.
#[derive(Parser, Debug)]
#[command(name = "relaynet-sim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Scenario to run
    #[arg(short = 'S', long, value_enum, default_value = "retry")]
    scenario: ScenarioArg,

    /// Number of nodes. Defaults to the scenario preset; the retry
    /// scenario is always a pair.
    #[arg(short = 'n', long)]
    nodes: Option<u32>,

    /// Random seed for reproducible results. When omitted, a random seed is used.
    #[arg(long)]
    seed: Option<u64>,

    /// Drop probability at the lossy responder (0.0-1.0)
    #[arg(long)]
    loss: Option<f64>,

    /// Hold delay in seconds at each delay forwarder
    #[arg(long)]
    delay: Option<f64>,

    /// Retransmission timeout in seconds
    #[arg(long)]
    timeout: Option<f64>,

    /// Stop after this much simulated time, in seconds
    #[arg(long, default_value = "30")]
    max_time: f64,

    /// Stop after this many processed events
    #[arg(long)]
    max_events: Option<u64>,

    /// Print the report as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,relaynet_simulator=info,relaynet_sim=info")),
        )
        .init();

    let args = Args::parse();

    if !args.max_time.is_finite() || args.max_time < 0.0 {
        eprintln!("--max-time must be a non-negative number of seconds");
        std::process::exit(2);
    }

    let seed = args.seed.unwrap_or_else(rand::random);

    let mut config = ScenarioConfig::new(args.scenario.into()).with_seed(seed);
    if let Some(nodes) = args.nodes {
        config = config.with_nodes(nodes);
    }
    if let Some(loss) = args.loss {
        config = config.with_p_loss(loss);
    }
    if let Some(delay) = args.delay {
        config = config.with_hold_delay(delay);
    }
    if let Some(timeout) = args.timeout {
        config = config.with_retry_timeout(timeout);
    }

    info!(
        scenario = %config.scenario,
        nodes = config.nodes,
        seed,
        max_time_secs = args.max_time,
        "starting simulation"
    );

    let mut limits = RunLimits::new().with_max_time(Duration::from_secs_f64(args.max_time));
    if let Some(max_events) = args.max_events {
        limits = limits.with_max_events(max_events);
    }

    let mut simulator = Simulator::new(config).expect("failed to assemble scenario");
    simulator.initialize().expect("node initialization failed");

    let report = simulator.run(limits).expect("simulation failed");

    if args.json {
        println!("{}", report.to_json());
    } else {
        report.print_summary();
    }
}
