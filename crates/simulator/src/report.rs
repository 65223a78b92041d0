//! Run reports: aggregate statistics plus the hop-count distribution.

use crate::config::Scenario;
use hdrhistogram::Histogram;
use relaynet_simulation::SimulationStats;
use serde::Serialize;
use std::time::Duration;

/// Per-node traffic snapshot taken at the end of a run.
#[derive(Clone, Debug, Serialize)]
pub struct NodeTraffic {
    pub node: u32,
    pub behavior: &'static str,
    pub sent: u64,
    pub received: u64,
    pub label: Option<String>,
}

/// Hop-count percentiles over all arrivals, absent when nothing arrived.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct HopDistribution {
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    pub max: u64,
    pub mean: f64,
}

/// Everything measured during one simulation run.
pub struct RunReport {
    scenario: Scenario,
    seed: u64,
    simulated: Duration,
    stats: SimulationStats,
    nodes: Vec<NodeTraffic>,
    hops: Histogram<u64>,
}

/// Serializable snapshot of a [`RunReport`] for `--json` output.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub scenario: Scenario,
    pub seed: u64,
    pub simulated_secs: f64,
    pub events_processed: u64,
    pub messages_sent: u64,
    pub messages_delivered: u64,
    pub messages_dropped_loss: u64,
    pub delivery_rate: f64,
    pub timers_set: u64,
    pub timers_fired: u64,
    pub timers_cancelled: u64,
    pub arrivals: u64,
    pub hops: Option<HopDistribution>,
    pub nodes: Vec<NodeTraffic>,
}

impl RunReport {
    pub(crate) fn new(
        scenario: Scenario,
        seed: u64,
        simulated: Duration,
        stats: SimulationStats,
        nodes: Vec<NodeTraffic>,
        walk_lengths: &[u64],
    ) -> Self {
        let mut hops =
            Histogram::new(3).expect("histogram creation should succeed");
        for &length in walk_lengths {
            // Auto-resizing histogram; only a zero value can be rejected,
            // and walks are at least one hop.
            let _ = hops.record(length);
        }
        Self {
            scenario,
            seed,
            simulated,
            stats,
            nodes,
            hops,
        }
    }

    /// The scenario that was run.
    pub fn scenario(&self) -> Scenario {
        self.scenario
    }

    /// The seed the run was started with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Final simulated time.
    pub fn simulated(&self) -> Duration {
        self.simulated
    }

    /// Driver statistics for the run.
    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Per-node traffic, in node-id order.
    pub fn nodes(&self) -> &[NodeTraffic] {
        &self.nodes
    }

    /// Number of terminal deliveries that reported a walk length.
    pub fn arrivals(&self) -> u64 {
        self.hops.len()
    }

    /// Hop-count distribution over all arrivals.
    pub fn hop_distribution(&self) -> Option<HopDistribution> {
        if self.hops.is_empty() {
            return None;
        }
        Some(HopDistribution {
            p50: self.hops.value_at_quantile(0.50),
            p90: self.hops.value_at_quantile(0.90),
            p99: self.hops.value_at_quantile(0.99),
            max: self.hops.max(),
            mean: self.hops.mean(),
        })
    }

    /// Snapshot for serialization.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            scenario: self.scenario,
            seed: self.seed,
            simulated_secs: self.simulated.as_secs_f64(),
            events_processed: self.stats.events_processed,
            messages_sent: self.stats.messages_sent,
            messages_delivered: self.stats.messages_delivered,
            messages_dropped_loss: self.stats.messages_dropped_loss,
            delivery_rate: self.stats.delivery_rate(),
            timers_set: self.stats.timers_set,
            timers_fired: self.stats.timers_fired,
            timers_cancelled: self.stats.timers_cancelled,
            arrivals: self.arrivals(),
            hops: self.hop_distribution(),
            nodes: self.nodes.clone(),
        }
    }

    /// The report as pretty-printed JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.summary())
            .expect("report serialization should succeed")
    }

    /// Print a human-readable summary of the run.
    pub fn print_summary(&self) {
        println!("\n=== Simulation Report ===");
        println!("Scenario:  {}", self.scenario);
        println!("Seed:      {}", self.seed);
        println!("Simulated: {:?}", self.simulated);
        println!();
        println!("Events processed: {}", self.stats.events_processed);
        println!("Messages sent:    {}", self.stats.messages_sent);
        println!("Delivered:        {}", self.stats.messages_delivered);
        println!("Lost in transit:  {}", self.stats.messages_dropped_loss);
        println!("Delivery rate:    {:.2}%", self.stats.delivery_rate() * 100.0);
        println!(
            "Timers:           {} set, {} fired, {} cancelled",
            self.stats.timers_set, self.stats.timers_fired, self.stats.timers_cancelled
        );

        if let Some(hops) = self.hop_distribution() {
            println!();
            println!("Walk lengths ({} arrivals):", self.arrivals());
            println!("  P50:  {}", hops.p50);
            println!("  P90:  {}", hops.p90);
            println!("  P99:  {}", hops.p99);
            println!("  Max:  {}", hops.max);
            println!("  Mean: {:.2}", hops.mean);
        }

        println!();
        println!("Per node:");
        for traffic in &self.nodes {
            let label = traffic.label.as_deref().unwrap_or("-");
            println!(
                "  Node({})  {:<14}  sent {:<6} received {:<6} [{}]",
                traffic.node, traffic.behavior, traffic.sent, traffic.received, label
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats_with(events: u64, sent: u64) -> SimulationStats {
        SimulationStats {
            events_processed: events,
            messages_sent: sent,
            ..Default::default()
        }
    }

    fn report(walks: &[u64]) -> RunReport {
        RunReport::new(
            Scenario::RandomHop,
            42,
            Duration::from_secs(60),
            stats_with(100, 50),
            vec![NodeTraffic {
                node: 0,
                behavior: "HopForwarder",
                sent: 10,
                received: 9,
                label: Some("last hopCount = 3".to_string()),
            }],
            walks,
        )
    }

    #[test]
    fn test_hop_distribution_percentiles() {
        let walks: Vec<u64> = (1..=100).collect();
        let report = report(&walks);

        assert_eq!(report.arrivals(), 100);
        let hops = report.hop_distribution().unwrap();
        assert_eq!(hops.p50, 50);
        assert_eq!(hops.max, 100);
        assert!(hops.p99 >= 99);
        assert!((hops.mean - 50.5).abs() < 1.0);
    }

    #[test]
    fn test_no_arrivals_no_distribution() {
        let report = report(&[]);
        assert_eq!(report.arrivals(), 0);
        assert!(report.hop_distribution().is_none());
    }

    #[test]
    fn test_json_summary_carries_the_run() {
        let json = report(&[1, 2, 3]).to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["scenario"], "random-hop");
        assert_eq!(value["seed"], 42);
        assert_eq!(value["arrivals"], 3);
        assert_eq!(value["nodes"][0]["label"], "last hopCount = 3");
        assert_eq!(value["hops"]["max"], 3);
    }
}
