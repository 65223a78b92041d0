//! Random-walk relay: each hop exits on a uniformly chosen link.

use crate::{Context, TrafficCounters};
use relaynet_core::{Action, ProtocolError};
use relaynet_types::{Message, NodeId};
use std::time::Duration;
use tracing::{debug, info};

/// Forwarder that relays every transit message on a uniformly random
/// outgoing link, with no memory of where it came from. Messages wander
/// the topology until they land on their destination; the hop count at
/// arrival is the walk length, reported through [`Action::Emit`] under the
/// `"arrival"` metric. Only the node at vector index 0 seeds the initial
/// message, at time 0.
#[derive(Debug, Default)]
pub struct HopForwarder;

impl HopForwarder {
    pub fn new() -> Self {
        Self
    }

    pub(crate) fn on_init(
        &mut self,
        node: NodeId,
        counters: &mut TrafficCounters,
        ctx: &mut Context<'_>,
    ) -> Result<Vec<Action>, ProtocolError> {
        if node.index() != 0 {
            return Ok(Vec::new());
        }

        let seed = self.originate(node, counters, ctx)?;
        debug!(%node, message = %seed, "seeding initial message");

        // Hand the seed back through the queue so it takes the ordinary
        // forwarding path at time zero.
        Ok(vec![Action::ScheduleSelf {
            delay: Duration::ZERO,
            message: seed,
        }])
    }

    pub(crate) fn on_message(
        &mut self,
        node: NodeId,
        counters: &mut TrafficCounters,
        message: Message,
        ctx: &mut Context<'_>,
    ) -> Result<Vec<Action>, ProtocolError> {
        if !message.is_addressed_to(node) {
            return Ok(vec![self.forward(node, message, ctx)?]);
        }

        let hops = message.hop_count;
        info!(%node, %message, hops, "message arrived");
        counters.received += 1;

        let next = self.originate(node, counters, ctx)?;
        debug!(%node, message = %next, "generating another message");

        Ok(vec![
            Action::Emit {
                metric: "arrival",
                value: hops as u64,
            },
            Action::SetLabel {
                label: format!("last hopCount = {hops}"),
            },
            self.forward(node, next, ctx)?,
        ])
    }

    /// A fresh message toward a uniformly chosen other node.
    fn originate(
        &self,
        node: NodeId,
        counters: &mut TrafficCounters,
        ctx: &mut Context<'_>,
    ) -> Result<Message, ProtocolError> {
        let destination = ctx
            .topology
            .pick_uniform_destination(node, true, ctx.rng)
            .map_err(|e| ProtocolError::routing(node, e))?;
        counters.sent += 1;
        Ok(Message::data(ctx.messages.next_id(), node, destination))
    }

    /// One hop of the walk. The link draw includes the one the message
    /// came in on, so walks can backtrack.
    fn forward(
        &self,
        node: NodeId,
        mut message: Message,
        ctx: &mut Context<'_>,
    ) -> Result<Action, ProtocolError> {
        message.record_hop();
        let link = ctx
            .topology
            .pick_uniform_link(node, ctx.rng)
            .map_err(|e| ProtocolError::routing(node, e))?;
        debug!(%node, %message, %link, "forwarding message");
        Ok(Action::Send { link, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use relaynet_types::{LinkId, MessageId, MessageIdGen, Topology};
    use std::collections::HashSet;

    struct Env {
        topology: Topology,
        rng: ChaCha8Rng,
        messages: MessageIdGen,
    }

    impl Env {
        fn new(topology: Topology) -> Self {
            Self {
                topology,
                rng: ChaCha8Rng::seed_from_u64(42),
                messages: MessageIdGen::new(),
            }
        }

        fn ctx(&mut self) -> Context<'_> {
            Context {
                now: Duration::ZERO,
                topology: &self.topology,
                rng: &mut self.rng,
                messages: &mut self.messages,
            }
        }
    }

    #[test]
    fn test_only_node_zero_seeds() {
        let mut env = Env::new(Topology::full_mesh(4, Duration::ZERO));
        let mut counters = TrafficCounters::default();

        let actions = HopForwarder::new()
            .on_init(NodeId(2), &mut counters, &mut env.ctx())
            .unwrap();
        assert!(actions.is_empty());
        assert_eq!(counters.sent, 0);

        let actions = HopForwarder::new()
            .on_init(NodeId(0), &mut counters, &mut env.ctx())
            .unwrap();
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            Action::ScheduleSelf { delay, message } => {
                assert_eq!(*delay, Duration::ZERO);
                assert_eq!(message.source, NodeId(0));
                assert_ne!(message.destination, NodeId(0));
                assert_eq!(message.hop_count, 0);
            }
            other => panic!("expected ScheduleSelf, got {}", other.type_name()),
        }
        assert_eq!(counters.sent, 1);
    }

    #[test]
    fn test_transit_message_hops_on_some_link() {
        let mut env = Env::new(Topology::full_mesh(4, Duration::ZERO));
        let mut forwarder = HopForwarder::new();
        let mut counters = TrafficCounters::default();

        let mut transit = Message::data(MessageId(7), NodeId(0), NodeId(3));
        transit.record_hop();
        let actions = forwarder
            .on_message(NodeId(1), &mut counters, transit, &mut env.ctx())
            .unwrap();

        assert_eq!(actions.len(), 1);
        match &actions[0] {
            Action::Send { link, message } => {
                assert!((link.index() as usize) < env.topology.neighbor_count(NodeId(1)).unwrap());
                assert_eq!(message.id, MessageId(7));
                assert_eq!(message.hop_count, 2);
            }
            other => panic!("expected Send, got {}", other.type_name()),
        }
        assert_eq!(counters.received, 0);
        assert_eq!(counters.sent, 0);
    }

    #[test]
    fn test_arrival_emits_labels_and_originates() {
        let mut env = Env::new(Topology::full_mesh(4, Duration::ZERO));
        let mut forwarder = HopForwarder::new();
        let mut counters = TrafficCounters::default();

        let mut arriving = Message::data(MessageId(7), NodeId(0), NodeId(2));
        for _ in 0..3 {
            arriving.record_hop();
        }
        let actions = forwarder
            .on_message(NodeId(2), &mut counters, arriving, &mut env.ctx())
            .unwrap();

        assert_eq!(counters.received, 1);
        assert_eq!(counters.sent, 1);
        assert_eq!(actions.len(), 3);
        assert!(matches!(
            &actions[0],
            Action::Emit { metric: "arrival", value: 3 }
        ));
        assert!(matches!(
            &actions[1],
            Action::SetLabel { label } if label == "last hopCount = 3"
        ));
        match &actions[2] {
            Action::Send { message, .. } => {
                assert_ne!(message.id, MessageId(7));
                assert_eq!(message.source, NodeId(2));
                assert_ne!(message.destination, NodeId(2));
                assert_eq!(message.hop_count, 1);
            }
            other => panic!("expected Send, got {}", other.type_name()),
        }
    }

    #[test]
    fn test_walk_uses_every_link_eventually() {
        let mut env = Env::new(Topology::full_mesh(4, Duration::ZERO));
        let mut forwarder = HopForwarder::new();
        let mut counters = TrafficCounters::default();

        let mut seen = HashSet::new();
        for _ in 0..200 {
            let transit = Message::data(MessageId(1), NodeId(0), NodeId(3));
            let actions = forwarder
                .on_message(NodeId(1), &mut counters, transit, &mut env.ctx())
                .unwrap();
            if let Action::Send { link, .. } = &actions[0] {
                seen.insert(*link);
            }
        }
        assert_eq!(seen, HashSet::from([LinkId(0), LinkId(1), LinkId(2)]));
    }

    #[test]
    fn test_arrival_with_no_other_node_fails_fast() {
        let mut env = Env::new(Topology::new(vec![vec![]]));
        let mut forwarder = HopForwarder::new();
        let mut counters = TrafficCounters::default();

        let arriving = Message::data(MessageId(1), NodeId(0), NodeId(0));
        let err = forwarder
            .on_message(NodeId(0), &mut counters, arriving, &mut env.ctx())
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Routing { node, .. } if node == NodeId(0)));
    }
}
