//! Core types shared across the Relaynet workspace.
//!
//! Identifiers, the message entity relayed between nodes, and the static
//! topology with its routing picks. Everything here is plain data: no I/O,
//! no global state, and all randomness flows in through a caller-supplied
//! RNG so runs replay exactly from a seed.

mod identifiers;
mod message;
mod topology;

pub use identifiers::{LinkId, MessageId, MessageIdGen, NodeId};
pub use message::{Message, MessageKind};
pub use topology::{Link, Topology, TopologyError};
