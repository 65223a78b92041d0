//! Relay node state machines.
//!
//! A node is invoked once per delivered event and runs to completion,
//! returning the actions the driver should perform. The four relay
//! policies form a closed enum dispatched by `match`:
//!
//! - [`RetrySender`]: retains its message and retransmits on timeout
//!   until an acknowledgment supersedes it;
//! - [`LossRelay`]: drops with probability `p_loss`, otherwise answers
//!   with a fresh message toward a random peer;
//! - [`DelayForwarder`]: holds each message for a propagation delay
//!   before hopping it toward its destination;
//! - [`HopForwarder`]: random-walk forwarding with hop counting and
//!   arrival statistics.
//!
//! All randomness reaches a handler through [`Context`], which threads the
//! driver's seeded stream, so runs replay exactly from a seed.

mod context;
mod delay;
mod loss;
mod node;
mod random_hop;
mod retry;

pub use context::Context;
pub use delay::DelayForwarder;
pub use loss::LossRelay;
pub use node::{Behavior, RelayNode, TrafficCounters};
pub use random_hop::HopForwarder;
pub use retry::RetrySender;
