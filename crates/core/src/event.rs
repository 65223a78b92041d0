//! Events delivered to node handlers.

use crate::TimerId;
use relaynet_types::Message;

/// What the event queue delivers to a node.
///
/// A node cannot tell a wire arrival from a self-scheduled one; in the
/// delay network the message's own `kind` field carries that phase.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    /// A message arriving at the node.
    Message(Message),
    /// An armed timer reaching its deadline.
    Timer(TimerId),
}

impl EventPayload {
    /// Short name for logging and diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            EventPayload::Message(_) => "Message",
            EventPayload::Timer(_) => "Timer",
        }
    }
}
