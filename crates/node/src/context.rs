//! Per-dispatch environment handed to behavior handlers.

use rand_chacha::ChaCha8Rng;
use relaynet_types::{MessageIdGen, Topology};
use std::time::Duration;

/// Driver-owned state threaded into every handler invocation.
///
/// Handlers draw randomness only from `rng` and allocate message ids only
/// from `messages`; both live in the driver, so node state stays free of
/// global or ambient sources.
pub struct Context<'a> {
    /// Current simulated time.
    pub now: Duration,
    /// Immutable network shape.
    pub topology: &'a Topology,
    /// The run's seeded random stream.
    pub rng: &'a mut ChaCha8Rng,
    /// Monotonic message id source.
    pub messages: &'a mut MessageIdGen,
}
