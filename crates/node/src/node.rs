//! The relay node wrapper and behavior dispatch.

use crate::{Context, DelayForwarder, HopForwarder, LossRelay, RetrySender};
use relaynet_core::{Action, ProtocolError, TimerId};
use relaynet_types::{Message, NodeId};

/// Per-node traffic counters.
///
/// `sent` counts originated messages; retransmitted copies and forwarded
/// hops are not originations. `received` counts messages that terminated
/// at this node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrafficCounters {
    pub sent: u64,
    pub received: u64,
}

/// The four relay policies. A closed set dispatched by `match`, so the
/// driver pays no virtual-call indirection per event.
#[derive(Debug)]
pub enum Behavior {
    RetrySender(RetrySender),
    LossRelay(LossRelay),
    DelayForwarder(DelayForwarder),
    HopForwarder(HopForwarder),
}

impl Behavior {
    /// Short name for logging and diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Behavior::RetrySender(_) => "RetrySender",
            Behavior::LossRelay(_) => "LossRelay",
            Behavior::DelayForwarder(_) => "DelayForwarder",
            Behavior::HopForwarder(_) => "HopForwarder",
        }
    }
}

/// A simulated node: identity, relay policy, counters, display label.
///
/// Mutated only from its own handler invocations (single writer); the
/// driver owns the vector of nodes and dispatches one event at a time.
#[derive(Debug)]
pub struct RelayNode {
    id: NodeId,
    behavior: Behavior,
    counters: TrafficCounters,
    label: Option<String>,
}

impl RelayNode {
    /// Create a node with the given policy.
    pub fn new(id: NodeId, behavior: Behavior) -> Self {
        Self {
            id,
            behavior,
            counters: TrafficCounters::default(),
            label: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn behavior_name(&self) -> &'static str {
        self.behavior.type_name()
    }

    pub fn counters(&self) -> TrafficCounters {
        self.counters
    }

    /// Current display label, if any handler has set one.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Apply a display-label update. Called by the driver when it
    /// processes [`Action::SetLabel`].
    pub fn set_label(&mut self, label: String) {
        self.label = Some(label);
    }

    /// Startup actions: initial sends, seed messages, first timers.
    pub fn on_init(&mut self, ctx: &mut Context<'_>) -> Result<Vec<Action>, ProtocolError> {
        match &mut self.behavior {
            Behavior::RetrySender(b) => b.on_init(self.id, &mut self.counters, ctx),
            Behavior::LossRelay(_) => Ok(Vec::new()),
            Behavior::DelayForwarder(b) => b.on_init(self.id, &mut self.counters, ctx),
            Behavior::HopForwarder(b) => b.on_init(self.id, &mut self.counters, ctx),
        }
    }

    /// Handle a delivered message.
    pub fn on_message(
        &mut self,
        message: Message,
        ctx: &mut Context<'_>,
    ) -> Result<Vec<Action>, ProtocolError> {
        match &mut self.behavior {
            Behavior::RetrySender(b) => b.on_message(self.id, &mut self.counters, message, ctx),
            Behavior::LossRelay(b) => b.on_message(self.id, &mut self.counters, message, ctx),
            Behavior::DelayForwarder(b) => b.on_message(self.id, &mut self.counters, message, ctx),
            Behavior::HopForwarder(b) => b.on_message(self.id, &mut self.counters, message, ctx),
        }
    }

    /// Handle a timer expiry. Only the retry sender owns a timer; expiry
    /// delivered to any other policy is a wiring bug.
    pub fn on_timer(
        &mut self,
        id: TimerId,
        ctx: &mut Context<'_>,
    ) -> Result<Vec<Action>, ProtocolError> {
        match &mut self.behavior {
            Behavior::RetrySender(b) => b.on_timer(self.id, id, ctx),
            _ => Err(ProtocolError::timer_misuse(
                self.id,
                format!("{id} expiry delivered to {}", self.behavior.type_name()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use relaynet_types::{MessageIdGen, Topology};
    use std::time::Duration;

    #[test]
    fn test_timer_expiry_on_timerless_behavior_is_misuse() {
        let topology = Topology::pair(Duration::ZERO);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut messages = MessageIdGen::new();
        let mut ctx = Context {
            now: Duration::ZERO,
            topology: &topology,
            rng: &mut rng,
            messages: &mut messages,
        };

        let mut node = RelayNode::new(NodeId(1), Behavior::LossRelay(LossRelay::new(0.1)));
        let err = node.on_timer(TimerId::Retransmit, &mut ctx).unwrap_err();
        assert!(matches!(err, ProtocolError::TimerMisuse { node, .. } if node == NodeId(1)));
    }

    #[test]
    fn test_label_round_trip() {
        let mut node = RelayNode::new(NodeId(0), Behavior::HopForwarder(HopForwarder::new()));
        assert_eq!(node.label(), None);
        node.set_label("last hopCount = 4".into());
        assert_eq!(node.label(), Some("last hopCount = 4"));
    }

    #[test]
    fn test_behavior_names() {
        assert_eq!(
            Behavior::RetrySender(RetrySender::new(NodeId(0), Duration::from_secs(1))).type_name(),
            "RetrySender"
        );
        assert_eq!(Behavior::LossRelay(LossRelay::new(0.1)).type_name(), "LossRelay");
        assert_eq!(
            Behavior::DelayForwarder(DelayForwarder::new(Duration::from_secs(100))).type_name(),
            "DelayForwarder"
        );
        assert_eq!(Behavior::HopForwarder(HopForwarder::new()).type_name(), "HopForwarder");
    }
}
