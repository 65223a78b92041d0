//! Actions returned by node handlers.

use crate::TimerId;
use relaynet_types::{LinkId, Message};
use std::time::Duration;

/// Side effects a handler asks the driver to perform.
///
/// Handlers never touch the event queue or other nodes directly; every
/// externally visible effect flows through one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Transmit a message on one of the node's outgoing links. The driver
    /// applies the link's delay (and transit loss, if configured) and
    /// schedules delivery at the peer.
    Send { link: LinkId, message: Message },

    /// Reschedule a message back to this node after a delay. Models wire
    /// latency as an explicit self-loop through the event queue.
    ScheduleSelf { delay: Duration, message: Message },

    /// Arm a timer `timeout` from now. Re-arming an armed timer replaces
    /// the prior deadline; the driver cancels the superseded queue entry.
    SetTimer { id: TimerId, timeout: Duration },

    /// Disarm a timer. No-op if the timer is idle.
    CancelTimer { id: TimerId },

    /// Fire-and-forget statistic emission; must not block the driver.
    Emit { metric: &'static str, value: u64 },

    /// Update the node's display label. Cosmetic, never read back.
    SetLabel { label: String },
}

impl Action {
    /// Short name for logging and diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::Send { .. } => "Send",
            Action::ScheduleSelf { .. } => "ScheduleSelf",
            Action::SetTimer { .. } => "SetTimer",
            Action::CancelTimer { .. } => "CancelTimer",
            Action::Emit { .. } => "Emit",
            Action::SetLabel { .. } => "SetLabel",
        }
    }
}
