//! Retransmission timer state machine.

use crate::ProtocolError;
use relaynet_types::NodeId;
use std::fmt;
use std::time::Duration;

/// Identifies a timer within its owning node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// The retry sender's retransmission timeout.
    Retransmit,
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerId::Retransmit => write!(f, "Retransmit"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerState {
    Idle,
    Armed { deadline: Duration },
}

/// Per-node retransmission timer: at most one deadline outstanding.
///
/// Two states, Idle and Armed. `arm` while Armed replaces the deadline
/// (the driver cancels the superseded queue entry); `cancel` while Idle is
/// a no-op; expiry delivered while Idle is a protocol violation. The timer
/// persists across the run and is re-armed after every firing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryTimer {
    owner: NodeId,
    state: TimerState,
}

impl RetryTimer {
    /// Create an idle timer owned by the given node.
    pub fn new(owner: NodeId) -> Self {
        Self {
            owner,
            state: TimerState::Idle,
        }
    }

    /// Whether a deadline is outstanding.
    pub fn is_armed(&self) -> bool {
        matches!(self.state, TimerState::Armed { .. })
    }

    /// The outstanding deadline, if armed.
    pub fn deadline(&self) -> Option<Duration> {
        match self.state {
            TimerState::Armed { deadline } => Some(deadline),
            TimerState::Idle => None,
        }
    }

    /// Arm or re-arm the timer. Returns the deadline that was replaced,
    /// if one was outstanding.
    pub fn arm(&mut self, deadline: Duration) -> Option<Duration> {
        let replaced = self.deadline();
        self.state = TimerState::Armed { deadline };
        replaced
    }

    /// Disarm the timer. Returns the cancelled deadline; `None` when the
    /// timer was already idle.
    pub fn cancel(&mut self) -> Option<Duration> {
        let cancelled = self.deadline();
        self.state = TimerState::Idle;
        cancelled
    }

    /// Note delivery of the expiry event. The timer must be armed; an
    /// expiry while idle means the scheduler delivered a stale event.
    pub fn on_expire(&mut self) -> Result<Duration, ProtocolError> {
        match self.state {
            TimerState::Armed { deadline } => {
                self.state = TimerState::Idle;
                Ok(deadline)
            }
            TimerState::Idle => Err(ProtocolError::timer_misuse(
                self.owner,
                "expiry delivered while idle",
            )),
        }
    }
}
