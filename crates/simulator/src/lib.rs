//! Relaynet Simulator
//!
//! Scenario presets and reporting built on top of the simulation driver.
//! Assembles one of the three reference relay networks, runs it for a
//! bounded span of simulated time, and reduces the run to a report.
//!
//! # Example
//!
//! ```ignore
//! use relaynet_simulator::{ScenarioConfig, Simulator};
//! use std::time::Duration;
//!
//! let config = ScenarioConfig::random_hop().with_nodes(6).with_seed(42);
//! let mut simulator = Simulator::new(config)?;
//! simulator.initialize()?;
//!
//! let report = simulator.run_for(Duration::from_secs(60))?;
//! report.print_summary();
//! ```

pub mod config;
pub mod report;
pub mod runner;

pub use config::{Scenario, ScenarioConfig};
pub use report::{HopDistribution, NodeTraffic, RunReport, RunSummary};
pub use runner::{Simulator, SimulatorError};
