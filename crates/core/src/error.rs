//! Fatal protocol invariant violations.

use relaynet_types::{NodeId, TopologyError};

/// Invariant violations that abort the run.
///
/// All variants are fatal: the driver stops and reports the offending
/// event. Modeled packet loss is not represented here; a drop is an
/// intentional outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// A delivered message failed validation; routing state is
    /// uninterpretable past this point.
    #[error("malformed message: {detail}")]
    MalformedMessage { detail: String },

    /// Destination index outside the node-count range. Detected where the
    /// message is generated or sent, never silently clamped.
    #[error("invalid destination {destination}: network has {nodes} nodes")]
    InvalidDestination { destination: NodeId, nodes: u32 },

    /// A timer expiry reached a node whose timer is idle, or the timer
    /// wiring lost track of a live deadline. Always a scheduler or
    /// node-logic bug.
    #[error("timer misuse at {node}: {detail}")]
    TimerMisuse { node: NodeId, detail: String },

    /// A routing pick failed against the configured topology.
    #[error("routing failed at {node}: {source}")]
    Routing {
        node: NodeId,
        #[source]
        source: TopologyError,
    },
}

impl ProtocolError {
    /// Malformed-message violation with a human-readable detail.
    pub fn malformed(detail: impl Into<String>) -> Self {
        ProtocolError::MalformedMessage {
            detail: detail.into(),
        }
    }

    /// Timer-misuse violation at the given node.
    pub fn timer_misuse(node: NodeId, detail: impl Into<String>) -> Self {
        ProtocolError::TimerMisuse {
            node,
            detail: detail.into(),
        }
    }

    /// Escalate a failed routing pick at the given node.
    pub fn routing(node: NodeId, source: TopologyError) -> Self {
        ProtocolError::Routing { node, source }
    }
}
