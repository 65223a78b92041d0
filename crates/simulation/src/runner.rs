//! Deterministic simulation driver.
//!
//! The runner owns the event queue, the shared routing RNG, and every
//! node. It pops events one at a time, hands them to the owning node's
//! handler, and turns the returned actions into new queue entries. All
//! randomness flows through one seeded stream, so a run replays exactly
//! from its seed.

use crate::event_queue::{Event, EventHandle, EventQueue};
use crate::metrics::MetricSink;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use relaynet_core::{Action, EventPayload, ProtocolError, TimerId};
use relaynet_node::{Behavior, Context, RelayNode};
use relaynet_types::{Message, MessageIdGen, NodeId, Topology};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

/// Fatal simulation failure: a node or the driver violated a protocol
/// invariant. The run stops here; the error names the offending node and
/// event so the violation can be replayed from the seed.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("node {node} at {at:?} (event #{sequence}): {source}")]
    Protocol {
        node: NodeId,
        at: Duration,
        /// Sequence number of the event being processed, 0 during init.
        sequence: u64,
        #[source]
        source: ProtocolError,
    },
}

/// Stop conditions for [`SimulationRunner::run`].
///
/// Both limits are optional; with neither set, the run continues until
/// the event queue drains.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunLimits {
    max_time: Option<Duration>,
    max_events: Option<u64>,
}

impl RunLimits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop before processing any event past this simulated time.
    pub fn with_max_time(mut self, max_time: Duration) -> Self {
        self.max_time = Some(max_time);
        self
    }

    /// Stop once this many events have been processed in total.
    pub fn with_max_events(mut self, max_events: u64) -> Self {
        self.max_events = Some(max_events);
        self
    }
}

/// Statistics collected during simulation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SimulationStats {
    /// Total events processed.
    pub events_processed: u64,
    /// Message deliveries handed to node handlers.
    pub messages_delivered: u64,
    /// Timer expiries handed to node handlers.
    pub timers_fired: u64,
    /// Total actions generated by handlers.
    pub actions_generated: u64,
    /// Messages scheduled for wire delivery.
    pub messages_sent: u64,
    /// Messages dropped by per-link transit loss.
    pub messages_dropped_loss: u64,
    /// Reschedule-to-self hops (delay modeling, not wire traffic).
    pub self_scheduled: u64,
    /// Timers armed.
    pub timers_set: u64,
    /// Timers cancelled or replaced before firing.
    pub timers_cancelled: u64,
    /// Metric values emitted by nodes.
    pub metrics_emitted: u64,
}

impl SimulationStats {
    /// Fraction of wire sends that reached the queue (1.0 when nothing
    /// was sent).
    pub fn delivery_rate(&self) -> f64 {
        let total = self.messages_sent + self.messages_dropped_loss;
        if total == 0 {
            1.0
        } else {
            self.messages_sent as f64 / total as f64
        }
    }
}

/// Deterministic simulation driver.
///
/// Single-threaded: handlers run to completion one event at a time, and
/// interleaving exists only as event ordering in the queue. Given the
/// same topology, behaviors, and seed, every run is identical.
pub struct SimulationRunner {
    /// All nodes, indexed by their id's value.
    nodes: Vec<RelayNode>,

    /// Immutable link structure shared by every node.
    topology: Topology,

    /// Global event queue, ordered deterministically.
    queue: EventQueue,

    /// Current simulation time.
    now: Duration,

    /// RNG for routing picks and link loss (seeded for determinism).
    rng: ChaCha8Rng,

    /// Message id allocator shared across nodes.
    message_ids: MessageIdGen,

    /// Armed timer registry. Maps (node, timer) to the live queue entry
    /// so cancellation and replacement can reach it.
    timers: HashMap<(NodeId, TimerId), EventHandle>,

    /// Statistics.
    stats: SimulationStats,

    /// Optional sink for node-emitted metrics.
    metrics: Option<Arc<dyn MetricSink>>,
}

impl SimulationRunner {
    /// Create a runner with one behavior per topology node.
    ///
    /// Node ids are assigned by vector position.
    ///
    /// # Panics
    /// If the behavior count does not match the topology's node count.
    pub fn new(topology: Topology, behaviors: Vec<Behavior>, seed: u64) -> Self {
        assert_eq!(
            behaviors.len(),
            topology.node_count(),
            "one behavior per topology node"
        );

        let nodes: Vec<RelayNode> = behaviors
            .into_iter()
            .enumerate()
            .map(|(index, behavior)| RelayNode::new(NodeId(index as u32), behavior))
            .collect();

        info!(num_nodes = nodes.len(), seed, "created simulation runner");

        Self {
            nodes,
            topology,
            queue: EventQueue::new(),
            now: Duration::ZERO,
            rng: ChaCha8Rng::seed_from_u64(seed),
            message_ids: MessageIdGen::new(),
            timers: HashMap::new(),
            stats: SimulationStats::default(),
            metrics: None,
        }
    }

    /// Attach a metric sink; node `Emit` actions are recorded into it.
    pub fn with_metric_sink(mut self, sink: Arc<dyn MetricSink>) -> Self {
        self.metrics = Some(sink);
        self
    }

    /// Run every node's startup handler and process the resulting
    /// actions. Call once before stepping.
    pub fn init(&mut self) -> Result<(), SimulationError> {
        for index in 0..self.nodes.len() {
            let node_id = NodeId(index as u32);
            let mut ctx = Context {
                now: self.now,
                topology: &self.topology,
                rng: &mut self.rng,
                messages: &mut self.message_ids,
            };
            let actions = self.nodes[index].on_init(&mut ctx).map_err(|source| {
                SimulationError::Protocol {
                    node: node_id,
                    at: self.now,
                    sequence: 0,
                    source,
                }
            })?;

            self.stats.actions_generated += actions.len() as u64;
            for action in actions {
                self.process_action(node_id, action).map_err(|source| {
                    SimulationError::Protocol {
                        node: node_id,
                        at: self.now,
                        sequence: 0,
                        source,
                    }
                })?;
            }
        }
        Ok(())
    }

    /// Pop and dispatch one event. Returns `Ok(false)` once the queue is
    /// empty.
    pub fn step(&mut self) -> Result<bool, SimulationError> {
        match self.queue.pop_next() {
            Some(event) => {
                self.dispatch(event)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run until the queue drains or a limit is hit.
    pub fn run(&mut self, limits: RunLimits) -> Result<(), SimulationError> {
        loop {
            if let Some(max) = limits.max_events {
                if self.stats.events_processed >= max {
                    debug!(events = self.stats.events_processed, "event limit reached");
                    return Ok(());
                }
            }

            let Some(next) = self.queue.next_time() else {
                debug!(final_time = ?self.now, "event queue drained");
                return Ok(());
            };
            if let Some(max) = limits.max_time {
                if next > max {
                    debug!(remaining_events = self.queue.len(), "time limit reached");
                    return Ok(());
                }
            }

            if let Some(event) = self.queue.pop_next() {
                self.dispatch(event)?;
            }
        }
    }

    /// Run until the given simulated time.
    ///
    /// Always advances the clock to `end_time`, even if the queue drains
    /// first, so callers polling `now()` make progress.
    pub fn run_until(&mut self, end_time: Duration) -> Result<(), SimulationError> {
        self.run(RunLimits::new().with_max_time(end_time))?;
        if self.now < end_time {
            self.now = end_time;
        }
        Ok(())
    }

    /// Schedule an event from outside the simulation (e.g. injected
    /// traffic in tests).
    pub fn schedule_initial_event(
        &mut self,
        node: NodeId,
        delay: Duration,
        payload: EventPayload,
    ) -> EventHandle {
        self.queue.schedule(self.now + delay, node, payload)
    }

    /// Current simulation time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Get simulation statistics.
    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Get a node by id.
    pub fn node(&self, id: NodeId) -> Option<&RelayNode> {
        self.nodes.get(id.index())
    }

    /// Iterate all nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &RelayNode> {
        self.nodes.iter()
    }

    /// The topology the run was built with.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Queued events, inert ones included.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Deliver one popped event to its node and process the actions.
    fn dispatch(&mut self, event: Event) -> Result<(), SimulationError> {
        self.now = event.time;
        self.stats.events_processed += 1;
        let target = event.target;

        trace!(
            time = ?self.now,
            node = %target,
            kind = event.payload.type_name(),
            "processing event"
        );

        let handled = match event.payload {
            EventPayload::Message(message) => {
                self.stats.messages_delivered += 1;
                // Node-generated traffic was checked at send time; this
                // catches frames injected from outside.
                self.check_message(&message).and_then(|()| {
                    let mut ctx = Context {
                        now: self.now,
                        topology: &self.topology,
                        rng: &mut self.rng,
                        messages: &mut self.message_ids,
                    };
                    self.nodes[target.index()].on_message(message, &mut ctx)
                })
            }
            EventPayload::Timer(id) => {
                self.stats.timers_fired += 1;
                // A live expiry always has a registry entry; a missing one
                // means the wiring lost track of the deadline.
                if self.timers.remove(&(target, id)).is_none() {
                    Err(ProtocolError::timer_misuse(
                        target,
                        format!("{id} fired with no armed registration"),
                    ))
                } else {
                    let mut ctx = Context {
                        now: self.now,
                        topology: &self.topology,
                        rng: &mut self.rng,
                        messages: &mut self.message_ids,
                    };
                    self.nodes[target.index()].on_timer(id, &mut ctx)
                }
            }
        };

        let actions = handled.map_err(|source| SimulationError::Protocol {
            node: target,
            at: self.now,
            sequence: event.sequence,
            source,
        })?;

        self.stats.actions_generated += actions.len() as u64;
        for action in actions {
            self.process_action(target, action)
                .map_err(|source| SimulationError::Protocol {
                    node: target,
                    at: self.now,
                    sequence: event.sequence,
                    source,
                })?;
        }
        Ok(())
    }

    /// Process an action from a node.
    fn process_action(&mut self, from: NodeId, action: Action) -> Result<(), ProtocolError> {
        match action {
            Action::Send { link, message } => {
                self.check_message(&message)?;
                let link = *self
                    .topology
                    .link(from, link)
                    .map_err(|e| ProtocolError::routing(from, e))?;

                // Transit loss on the link, distinct from any loss the
                // receiving node models itself.
                if link.loss > 0.0 && self.rng.gen::<f64>() < link.loss {
                    self.stats.messages_dropped_loss += 1;
                    trace!(%from, to = %link.to, %message, "message dropped in transit");
                    return Ok(());
                }

                let delivery = self.now + link.delay;
                self.queue
                    .schedule(delivery, link.to, EventPayload::Message(message));
                self.stats.messages_sent += 1;
            }

            Action::ScheduleSelf { delay, message } => {
                self.check_message(&message)?;
                self.queue
                    .schedule(self.now + delay, from, EventPayload::Message(message));
                self.stats.self_scheduled += 1;
            }

            Action::SetTimer { id, timeout } => {
                let handle =
                    self.queue
                        .schedule(self.now + timeout, from, EventPayload::Timer(id));
                if let Some(superseded) = self.timers.insert((from, id), handle) {
                    // Re-arm replaces the outstanding deadline.
                    self.queue.cancel(superseded);
                    self.stats.timers_cancelled += 1;
                }
                self.stats.timers_set += 1;
            }

            Action::CancelTimer { id } => {
                if let Some(handle) = self.timers.remove(&(from, id)) {
                    self.queue.cancel(handle);
                    self.stats.timers_cancelled += 1;
                }
            }

            Action::Emit { metric, value } => {
                if let Some(sink) = &self.metrics {
                    sink.record(metric, value);
                }
                self.stats.metrics_emitted += 1;
            }

            Action::SetLabel { label } => {
                trace!(node = %from, %label, "label updated");
                self.nodes[from.index()].set_label(label);
            }
        }
        Ok(())
    }

    /// Fail fast on messages the routing layer could never have produced.
    fn check_message(&self, message: &Message) -> Result<(), ProtocolError> {
        if message.content == 0 {
            return Err(ProtocolError::malformed(format!(
                "{message} has no content byte"
            )));
        }
        if !self.topology.contains(message.source) {
            return Err(ProtocolError::malformed(format!(
                "{message} names source outside the topology"
            )));
        }
        if !self.topology.contains(message.destination) {
            return Err(ProtocolError::InvalidDestination {
                destination: message.destination,
                nodes: self.topology.node_count() as u32,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaynet_node::LossRelay;
    use relaynet_types::MessageId;

    fn two_loss_relays(p_loss: f64) -> SimulationRunner {
        SimulationRunner::new(
            Topology::pair(Duration::ZERO),
            vec![
                Behavior::LossRelay(LossRelay::new(p_loss)),
                Behavior::LossRelay(LossRelay::new(p_loss)),
            ],
            7,
        )
    }

    #[test]
    fn test_invalid_destination_is_fatal() {
        let mut runner = two_loss_relays(0.0);
        let bad = Message::data(MessageId(1), NodeId(0), NodeId(9));
        runner.schedule_initial_event(NodeId(0), Duration::ZERO, EventPayload::Message(bad));

        let err = runner.run(RunLimits::new()).unwrap_err();
        let SimulationError::Protocol { node, source, .. } = err;
        assert_eq!(node, NodeId(0));
        assert!(matches!(
            source,
            ProtocolError::InvalidDestination {
                destination: NodeId(9),
                nodes: 2
            }
        ));
    }

    #[test]
    fn test_malformed_message_is_fatal() {
        let mut runner = two_loss_relays(0.0);
        let mut bad = Message::data(MessageId(1), NodeId(0), NodeId(1));
        bad.content = 0;
        runner.schedule_initial_event(NodeId(1), Duration::ZERO, EventPayload::Message(bad));

        let err = runner.run(RunLimits::new()).unwrap_err();
        let SimulationError::Protocol { source, .. } = err;
        assert!(matches!(source, ProtocolError::MalformedMessage { .. }));
    }

    #[test]
    fn test_unregistered_timer_expiry_is_fatal() {
        let mut runner = two_loss_relays(0.0);
        runner.schedule_initial_event(
            NodeId(0),
            Duration::from_secs(1),
            EventPayload::Timer(TimerId::Retransmit),
        );

        let err = runner.run(RunLimits::new()).unwrap_err();
        let SimulationError::Protocol { node, at, source, .. } = err;
        assert_eq!(node, NodeId(0));
        assert_eq!(at, Duration::from_secs(1));
        assert!(matches!(source, ProtocolError::TimerMisuse { .. }));
    }

    #[test]
    fn test_event_limit_stops_the_run() {
        // Two zero-loss relays ping-pong forever; only the event budget
        // ends the run.
        let mut runner = two_loss_relays(0.0);
        let seed = Message::data(MessageId(900), NodeId(1), NodeId(0));
        runner.schedule_initial_event(NodeId(0), Duration::ZERO, EventPayload::Message(seed));

        runner.run(RunLimits::new().with_max_events(25)).unwrap();
        assert_eq!(runner.stats().events_processed, 25);
    }

    #[test]
    fn test_run_until_advances_clock_past_drained_queue() {
        let mut runner = two_loss_relays(1.0);
        let seed = Message::data(MessageId(900), NodeId(1), NodeId(0));
        runner.schedule_initial_event(NodeId(0), Duration::ZERO, EventPayload::Message(seed));

        // The relay drops everything, so the queue drains immediately.
        runner.run_until(Duration::from_secs(30)).unwrap();
        assert_eq!(runner.now(), Duration::from_secs(30));
        assert_eq!(runner.pending_events(), 0);
    }
}
