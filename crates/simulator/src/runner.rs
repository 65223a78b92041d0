//! Scenario assembly and execution on top of the simulation driver.

use crate::config::{Scenario, ScenarioConfig};
use crate::report::{NodeTraffic, RunReport};
use relaynet_node::{Behavior, DelayForwarder, HopForwarder, LossRelay, RetrySender};
use relaynet_simulation::{MemorySink, MetricSink, RunLimits, SimulationError, SimulationRunner};
use relaynet_types::{Link, NodeId, Topology};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Upper bound on config-supplied durations, in seconds.
const MAX_SECONDS: f64 = 1e9;

/// Errors from scenario assembly or the run itself.
#[derive(Debug, Error)]
pub enum SimulatorError {
    /// The configuration cannot describe a runnable network.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A node rejected an event; the run is not salvageable.
    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

/// Assembles one of the preset relay networks and runs it to a report.
pub struct Simulator {
    config: ScenarioConfig,
    runner: SimulationRunner,
    arrivals: Arc<MemorySink>,
}

impl fmt::Debug for Simulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Simulator {
    /// Build the network described by the configuration.
    pub fn new(config: ScenarioConfig) -> Result<Self, SimulatorError> {
        validate(&config)?;

        let topology = build_topology(&config);
        let behaviors = build_behaviors(&config);
        let arrivals = Arc::new(MemorySink::new());
        let runner = SimulationRunner::new(topology, behaviors, config.seed)
            .with_metric_sink(Arc::clone(&arrivals) as Arc<dyn MetricSink>);

        info!(
            scenario = %config.scenario,
            nodes = config.nodes,
            seed = config.seed,
            "assembled scenario"
        );
        Ok(Self {
            config,
            runner,
            arrivals,
        })
    }

    /// Deliver the initialization hook to every node. Call once, before
    /// running.
    pub fn initialize(&mut self) -> Result<(), SimulatorError> {
        self.runner.init()?;
        Ok(())
    }

    /// Run for a span of simulated time and report.
    pub fn run_for(&mut self, duration: Duration) -> Result<RunReport, SimulatorError> {
        let end = self.runner.now() + duration;
        self.runner.run_until(end)?;
        Ok(self.report())
    }

    /// Run under the given limits and report.
    pub fn run(&mut self, limits: RunLimits) -> Result<RunReport, SimulatorError> {
        self.runner.run(limits)?;
        Ok(self.report())
    }

    /// Snapshot the current state of the run.
    pub fn report(&self) -> RunReport {
        let nodes = self
            .runner
            .nodes()
            .map(|node| NodeTraffic {
                node: node.id().0,
                behavior: node.behavior_name(),
                sent: node.counters().sent,
                received: node.counters().received,
                label: node.label().map(str::to_string),
            })
            .collect();

        RunReport::new(
            self.config.scenario,
            self.config.seed,
            self.runner.now(),
            self.runner.stats().clone(),
            nodes,
            &self.arrivals.values("arrival"),
        )
    }

    /// The underlying driver, for direct inspection.
    pub fn runner(&self) -> &SimulationRunner {
        &self.runner
    }
}

fn validate(config: &ScenarioConfig) -> Result<(), SimulatorError> {
    if config.nodes < 2 {
        return Err(SimulatorError::InvalidConfig(format!(
            "a relay network needs at least two nodes, got {}",
            config.nodes
        )));
    }
    if config.scenario == Scenario::Retry && config.nodes != 2 {
        return Err(SimulatorError::InvalidConfig(format!(
            "the retry scenario is a fixed pair, got {} nodes",
            config.nodes
        )));
    }
    for (name, seconds) in [
        ("retry-timeout", config.retry_timeout),
        ("hold-delay", config.hold_delay),
        ("link-delay", config.link_delay),
    ] {
        if !seconds.is_finite() || !(0.0..=MAX_SECONDS).contains(&seconds) {
            return Err(SimulatorError::InvalidConfig(format!(
                "{name} must be between 0 and {MAX_SECONDS} seconds, got {seconds}"
            )));
        }
    }
    Ok(())
}

fn build_topology(config: &ScenarioConfig) -> Topology {
    let delay = config.link_delay();
    let link = |to: u32| {
        Link::to(NodeId(to))
            .with_delay(delay)
            .with_loss(config.link_loss)
    };

    let links = match config.scenario {
        Scenario::Retry => vec![vec![link(1)], vec![link(0)]],
        Scenario::Delay => (0..config.nodes)
            .map(|i| vec![link((i + 1) % config.nodes)])
            .collect(),
        Scenario::RandomHop => (0..config.nodes)
            .map(|i| (0..config.nodes).filter(|&j| j != i).map(|j| link(j)).collect())
            .collect(),
    };
    Topology::new(links)
}

fn build_behaviors(config: &ScenarioConfig) -> Vec<Behavior> {
    match config.scenario {
        Scenario::Retry => vec![
            Behavior::RetrySender(RetrySender::new(NodeId(0), config.retry_timeout())),
            Behavior::LossRelay(LossRelay::new(config.p_loss)),
        ],
        Scenario::Delay => (0..config.nodes)
            .map(|_| Behavior::DelayForwarder(DelayForwarder::new(config.hold_delay())))
            .collect(),
        Scenario::RandomHop => (0..config.nodes)
            .map(|_| Behavior::HopForwarder(HopForwarder::new()))
            .collect(),
    }
}
