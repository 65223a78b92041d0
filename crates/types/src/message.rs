//! The message entity relayed between nodes.

use crate::{MessageId, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol role of a message.
///
/// `Data` is a payload on the wire. `Ack` doubles as the held marker while
/// a delay forwarder sits on a message between hops; the forwarder flips it
/// back to `Data` when the message moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    Data,
    Ack,
}

/// A relayed message.
///
/// Exactly one component owns a message at any instant: the event queue
/// while it is in flight, or a node's retransmission buffer while it is
/// retained. Sends are copy-on-send ([`Message::duplicate`]) so a retained
/// original stays valid across retransmissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub source: NodeId,
    pub destination: NodeId,
    pub kind: MessageKind,
    /// Forwarding transitions since origination. Observational only.
    pub hop_count: u32,
    /// Application payload byte. Zero means the field was never populated
    /// and the message is malformed.
    pub content: u8,
}

impl Message {
    /// Content byte carried by protocol data.
    pub const CONTENT_DATA: u8 = b'M';

    /// Create a fresh data message with zero hops.
    pub fn data(id: MessageId, source: NodeId, destination: NodeId) -> Self {
        Self {
            id,
            source,
            destination,
            kind: MessageKind::Data,
            hop_count: 0,
            content: Self::CONTENT_DATA,
        }
    }

    /// Copy-on-send: a new physical instance with its own id and the same
    /// routing and protocol fields.
    pub fn duplicate(&self, id: MessageId) -> Self {
        Self { id, ..self.clone() }
    }

    /// Record one forwarding hop.
    pub fn record_hop(&mut self) {
        self.hop_count += 1;
    }

    /// Whether this message terminates at the given node.
    pub fn is_addressed_to(&self, node: NodeId) -> bool {
        self.destination == node
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tic-{}-to-{}", self.source.0, self.destination.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_message_starts_with_zero_hops() {
        let msg = Message::data(MessageId(0), NodeId(1), NodeId(2));
        assert_eq!(msg.kind, MessageKind::Data);
        assert_eq!(msg.hop_count, 0);
        assert_eq!(msg.content, Message::CONTENT_DATA);
        assert!(msg.is_addressed_to(NodeId(2)));
        assert!(!msg.is_addressed_to(NodeId(1)));
    }

    #[test]
    fn test_record_hop_increments_by_one() {
        let mut msg = Message::data(MessageId(0), NodeId(0), NodeId(3));
        let before = msg.hop_count;
        msg.record_hop();
        assert_eq!(msg.hop_count, before + 1);
        msg.record_hop();
        assert_eq!(msg.hop_count, before + 2);
    }

    #[test]
    fn test_duplicate_keeps_fields_but_not_id() {
        let mut original = Message::data(MessageId(10), NodeId(0), NodeId(1));
        original.record_hop();

        let copy = original.duplicate(MessageId(11));
        assert_eq!(copy.id, MessageId(11));
        assert_eq!(copy.source, original.source);
        assert_eq!(copy.destination, original.destination);
        assert_eq!(copy.kind, original.kind);
        assert_eq!(copy.hop_count, original.hop_count);
        assert_eq!(copy.content, original.content);

        // The retained original is untouched.
        assert_eq!(original.id, MessageId(10));
    }

    #[test]
    fn test_display_uses_source_and_destination() {
        let msg = Message::data(MessageId(0), NodeId(0), NodeId(3));
        assert_eq!(msg.to_string(), "tic-0-to-3");
    }
}
