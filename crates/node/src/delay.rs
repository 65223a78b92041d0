//! Relay-with-delay: per-hop propagation latency via self-scheduling.

use crate::{Context, TrafficCounters};
use relaynet_core::{Action, ProtocolError};
use relaynet_types::{LinkId, Message, MessageKind, NodeId};
use std::time::Duration;
use tracing::{debug, info};

/// Single-direction forwarder that models wire latency by holding each
/// message for a configured delay before it moves on.
///
/// Each physical hop is two-phase, tracked in the message's `kind`: a wire
/// arrival carries `Data` and is flipped to `Ack` while the node sits on it
/// (an explicit reschedule-to-self through the event queue); when the held
/// copy fires back it either terminates here or flips back to `Data` and
/// hops onward. Collapsing the two phases into one transition breaks the
/// delay semantics. Freshly originated messages leave immediately as
/// `Data` and pay the hold at their first receiving node; only the node at
/// vector index 0 seeds the initial message, at time 0.
#[derive(Debug)]
pub struct DelayForwarder {
    hold_delay: Duration,
}

impl DelayForwarder {
    /// Create a forwarder with the given per-hop hold delay.
    pub fn new(hold_delay: Duration) -> Self {
        Self { hold_delay }
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

        // The seed starts in the held-elapsed phase so it hops as soon as
        // it comes off the queue.
        let destination = ctx
            .topology
            .pick_uniform_destination(node, true, ctx.rng)
            .map_err(|e| ProtocolError::routing(node, e))?;
        let mut seed = Message::data(ctx.messages.next_id(), node, destination);
        seed.kind = MessageKind::Ack;
        counters.sent += 1;
        debug!(%node, message = %seed, "seeding initial message");

        Ok(vec![Action::ScheduleSelf {
            delay: Duration::ZERO,
            message: seed,
        }])
    }

    pub(crate) fn on_message(
        &mut self,
        node: NodeId,
        counters: &mut TrafficCounters,
        mut message: Message,
        ctx: &mut Context<'_>,
    ) -> Result<Vec<Action>, ProtocolError> {
        match message.kind {
            MessageKind::Data => {
                // Just off the wire: hold it for the propagation delay.
                debug!(%node, %message, delay_ms = self.hold_delay.as_millis() as u64, "queuing message");
                message.kind = MessageKind::Ack;
                Ok(vec![Action::ScheduleSelf {
                    delay: self.hold_delay,
                    message,
                }])
            }
            MessageKind::Ack if message.is_addressed_to(node) => {
                // Held copy came back and terminates here.
                info!(%node, %message, hops = message.hop_count, "message arrived");
                counters.received += 1;

                let destination = ctx
                    .topology
                    .pick_uniform_destination(node, true, ctx.rng)
                    .map_err(|e| ProtocolError::routing(node, e))?;
                let next = Message::data(ctx.messages.next_id(), node, destination);
                counters.sent += 1;
                debug!(%node, message = %next, "generating another message");

                Ok(vec![
                    Action::SetLabel {
                        label: format!("rcvd: {} sent: {}", counters.received, counters.sent),
                    },
                    self.forward(node, next),
                ])
            }
            MessageKind::Ack => {
                // Held copy, delay elapsed: hop onward.
                Ok(vec![self.forward(node, message)])
            }
        }
    }

    /// Put a message on the node's single outgoing link: restore the wire
    /// kind, record the hop, send.
    fn forward(&self, node: NodeId, mut message: Message) -> Action {
        message.kind = MessageKind::Data;
        message.record_hop();
        debug!(%node, %message, "forwarding message");
        Action::Send {
            link: LinkId::FIRST,
            message,
        }
    }
}
