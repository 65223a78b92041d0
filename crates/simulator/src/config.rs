//! Configuration types for the scenario runner.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Which relay network to assemble.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Two nodes: a retransmitting sender against a lossy responder.
    #[default]
    Retry,

    /// Unidirectional ring of hold-and-forward nodes.
    Delay,

    /// Full mesh walked by a single randomly forwarded message.
    RandomHop,
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scenario::Retry => write!(f, "retry"),
            Scenario::Delay => write!(f, "delay"),
            Scenario::RandomHop => write!(f, "random-hop"),
        }
    }
}

/// Configuration for a simulation run.
///
/// Time-valued fields are seconds as `f64`; they are converted to
/// `Duration` when the network is assembled. Consumed once at build time,
/// immutable afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Network to assemble.
    pub scenario: Scenario,

    /// Number of nodes. The retry scenario is always a pair.
    pub nodes: u32,

    /// Retransmission timeout in seconds (retry scenario).
    pub retry_timeout: f64,

    /// Per-message drop probability at the lossy responder.
    pub p_loss: f64,

    /// Hold duration in seconds applied by each delay forwarder.
    pub hold_delay: f64,

    /// Propagation delay in seconds on every link.
    pub link_delay: f64,

    /// Transit loss probability on every link.
    pub link_loss: f64,

    /// Random seed for deterministic simulation.
    pub seed: u64,
}

impl ScenarioConfig {
    /// Create a configuration for the given scenario with its preset
    /// shape.
    pub fn new(scenario: Scenario) -> Self {
        match scenario {
            Scenario::Retry => Self::retry(),
            Scenario::Delay => Self::delay(),
            Scenario::RandomHop => Self::random_hop(),
        }
    }

    /// Retransmitting sender and lossy responder on a two-node pair.
    pub fn retry() -> Self {
        Self {
            scenario: Scenario::Retry,
            nodes: 2,
            retry_timeout: 1.0,
            p_loss: 0.1,
            hold_delay: 1.0,
            link_delay: 0.1,
            link_loss: 0.0,
            seed: 12345,
        }
    }

    /// Hold-and-forward ring. Links carry no delay of their own; the hold
    /// models the propagation time.
    pub fn delay() -> Self {
        Self {
            scenario: Scenario::Delay,
            nodes: 2,
            retry_timeout: 1.0,
            p_loss: 0.0,
            hold_delay: 1.0,
            link_delay: 0.0,
            link_loss: 0.0,
            seed: 12345,
        }
    }

    /// Random walk over a full mesh.
    pub fn random_hop() -> Self {
        Self {
            scenario: Scenario::RandomHop,
            nodes: 4,
            retry_timeout: 1.0,
            p_loss: 0.0,
            hold_delay: 1.0,
            link_delay: 0.1,
            link_loss: 0.0,
            seed: 12345,
        }
    }

    /// Set the number of nodes.
    pub fn with_nodes(mut self, nodes: u32) -> Self {
        self.nodes = nodes;
        self
    }

    /// Set the retransmission timeout in seconds.
    pub fn with_retry_timeout(mut self, seconds: f64) -> Self {
        self.retry_timeout = seconds;
        self
    }

    /// Set the responder drop probability, clamped to [0, 1].
    pub fn with_p_loss(mut self, p_loss: f64) -> Self {
        self.p_loss = p_loss.clamp(0.0, 1.0);
        self
    }

    /// Set the per-node hold duration in seconds.
    pub fn with_hold_delay(mut self, seconds: f64) -> Self {
        self.hold_delay = seconds;
        self
    }

    /// Set the propagation delay in seconds on every link.
    pub fn with_link_delay(mut self, seconds: f64) -> Self {
        self.link_delay = seconds;
        self
    }

    /// Set the transit loss probability on every link, clamped to [0, 1].
    pub fn with_link_loss(mut self, loss: f64) -> Self {
        self.link_loss = loss.clamp(0.0, 1.0);
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Retransmission timeout as a duration.
    pub fn retry_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.retry_timeout)
    }

    /// Hold duration as a duration.
    pub fn hold_delay(&self) -> Duration {
        Duration::from_secs_f64(self.hold_delay)
    }

    /// Link propagation delay as a duration.
    pub fn link_delay(&self) -> Duration {
        Duration::from_secs_f64(self.link_delay)
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self::retry()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_match_their_scenario() {
        assert_eq!(ScenarioConfig::retry().scenario, Scenario::Retry);
        assert_eq!(ScenarioConfig::delay().scenario, Scenario::Delay);
        assert_eq!(ScenarioConfig::random_hop().scenario, Scenario::RandomHop);
        assert_eq!(ScenarioConfig::new(Scenario::Delay).scenario, Scenario::Delay);
    }

    #[test]
    fn test_builders_override_presets() {
        let config = ScenarioConfig::random_hop()
            .with_nodes(8)
            .with_link_delay(0.25)
            .with_seed(7);

        assert_eq!(config.nodes, 8);
        assert_eq!(config.link_delay(), Duration::from_millis(250));
        assert_eq!(config.seed, 7);
    }

    #[test]
    fn test_probabilities_are_clamped() {
        let config = ScenarioConfig::retry().with_p_loss(1.7).with_link_loss(-0.3);
        assert_eq!(config.p_loss, 1.0);
        assert_eq!(config.link_loss, 0.0);
    }

    #[test]
    fn test_seconds_convert_to_durations() {
        let config = ScenarioConfig::retry()
            .with_retry_timeout(1.5)
            .with_hold_delay(100.0);
        assert_eq!(config.retry_timeout(), Duration::from_millis(1500));
        assert_eq!(config.hold_delay(), Duration::from_secs(100));
    }

    #[test]
    fn test_scenario_names_are_kebab_case() {
        assert_eq!(Scenario::RandomHop.to_string(), "random-hop");
        let json = serde_json::to_string(&Scenario::RandomHop).unwrap();
        assert_eq!(json, "\"random-hop\"");
    }
}
