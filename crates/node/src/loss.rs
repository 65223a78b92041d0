//! Relay-with-loss: the retry sender's lossy counterpart.

use crate::{Context, TrafficCounters};
use rand::Rng;
use relaynet_core::{Action, ProtocolError};
use relaynet_types::{LinkId, Message, NodeId};
use tracing::debug;

/// Lossy counterpart: drops each received message with probability
/// `p_loss`, otherwise answers with a freshly generated message toward a
/// uniformly random peer (self excluded), sent on the node's first link.
///
/// Stateless between messages: no retained buffer, no timer. Each arrival
/// independently produces one new message or none. A drop is terminal for
/// that message instance and intentional, not an error.
#[derive(Debug)]
pub struct LossRelay {
    p_loss: f64,
}

impl LossRelay {
    /// Default drop probability.
    pub const DEFAULT_P_LOSS: f64 = 0.1;

    /// Create a relay with the given drop probability, clamped to [0, 1].
    pub fn new(p_loss: f64) -> Self {
        Self {
            p_loss: p_loss.clamp(0.0, 1.0),
        }
    }

    pub(crate) fn on_message(
        &mut self,
        node: NodeId,
        counters: &mut TrafficCounters,
        message: Message,
        ctx: &mut Context<'_>,
    ) -> Result<Vec<Action>, ProtocolError> {
        counters.received += 1;

        if self.p_loss > 0.0 && ctx.rng.gen::<f64>() < self.p_loss {
            debug!(%node, %message, "losing message");
            return Ok(Vec::new());
        }

        let destination = ctx
            .topology
            .pick_uniform_destination(node, true, ctx.rng)
            .map_err(|e| ProtocolError::routing(node, e))?;
        let reply = Message::data(ctx.messages.next_id(), node, destination);
        counters.sent += 1;
        debug!(%node, message = %reply, "sending back acknowledgment");

        Ok(vec![Action::Send {
            link: LinkId::FIRST,
            message: reply,
        }])
    }
}
