//! Relay-with-retry: timeout-driven retransmission over a lossy channel.

use crate::{Context, TrafficCounters};
use relaynet_core::{Action, ProtocolError, RetryTimer, TimerId};
use relaynet_types::{LinkId, Message, NodeId};
use std::time::Duration;
use tracing::debug;

/// Point-to-point sender that retains its current message and retransmits
/// it on every timeout until an acknowledgment supersedes it.
///
/// The outgoing link is fixed at initialization (picked uniformly over the
/// node's link set, self-loops not excluded). Every send duplicates the
/// retained message so the original stays valid for the next
/// retransmission. There is no success terminal state: each received
/// message replaces the retained one, goes out as a copy, and re-arms the
/// timer, so the node transmits for the whole run.
#[derive(Debug)]
pub struct RetrySender {
    timeout: Duration,
    timer: RetryTimer,
    link: Option<LinkId>,
    retained: Option<Message>,
}

impl RetrySender {
    /// Create a sender with the given retransmission timeout.
    pub fn new(owner: NodeId, timeout: Duration) -> Self {
        Self {
            timeout,
            timer: RetryTimer::new(owner),
            link: None,
            retained: None,
        }
    }

    /// Whether the retransmission timer is armed. At most one deadline is
    /// outstanding at any instant.
    pub fn timer_armed(&self) -> bool {
        self.timer.is_armed()
    }

    /// The message currently retained for retransmission.
    pub fn retained(&self) -> Option<&Message> {
        self.retained.as_ref()
    }

    pub(crate) fn on_init(
        &mut self,
        node: NodeId,
        counters: &mut TrafficCounters,
        ctx: &mut Context<'_>,
    ) -> Result<Vec<Action>, ProtocolError> {
        let link = ctx
            .topology
            .pick_uniform_link(node, ctx.rng)
            .map_err(|e| ProtocolError::routing(node, e))?;
        let peer = ctx
            .topology
            .link(node, link)
            .map_err(|e| ProtocolError::routing(node, e))?
            .to;

        let message = Message::data(ctx.messages.next_id(), node, peer);
        debug!(%node, %message, %link, "sending initial message");
        counters.sent += 1;

        self.link = Some(link);
        let copy = message.duplicate(ctx.messages.next_id());
        self.retained = Some(message);
        self.timer.arm(ctx.now + self.timeout);

        Ok(vec![
            Action::Send {
                link,
                message: copy,
            },
            Action::SetTimer {
                id: TimerId::Retransmit,
                timeout: self.timeout,
            },
        ])
    }

    pub(crate) fn on_message(
        &mut self,
        node: NodeId,
        counters: &mut TrafficCounters,
        message: Message,
        ctx: &mut Context<'_>,
    ) -> Result<Vec<Action>, ProtocolError> {
        // Any arrival is the acknowledgment channel: the outstanding copy
        // got through, so the received message supersedes it.
        debug!(%node, %message, "acknowledgment received, timer cancelled");
        self.timer.cancel();
        counters.received += 1;

        let link = self.outgoing_link(node)?;
        let copy = message.duplicate(ctx.messages.next_id());
        self.retained = Some(message);
        self.timer.arm(ctx.now + self.timeout);

        Ok(vec![
            Action::CancelTimer {
                id: TimerId::Retransmit,
            },
            Action::Send {
                link,
                message: copy,
            },
            Action::SetTimer {
                id: TimerId::Retransmit,
                timeout: self.timeout,
            },
        ])
    }

    pub(crate) fn on_timer(
        &mut self,
        node: NodeId,
        _id: TimerId,
        ctx: &mut Context<'_>,
    ) -> Result<Vec<Action>, ProtocolError> {
        self.timer.on_expire()?;
        let retained = self.retained.as_ref().ok_or_else(|| {
            ProtocolError::timer_misuse(node, "timeout expired with no retained message")
        })?;

        // Previous copy presumed lost; send another and restart the timer.
        debug!(%node, message = %retained, "timeout expired, resending message");
        let link = self.outgoing_link(node)?;
        let copy = retained.duplicate(ctx.messages.next_id());
        self.timer.arm(ctx.now + self.timeout);

        Ok(vec![
            Action::Send {
                link,
                message: copy,
            },
            Action::SetTimer {
                id: TimerId::Retransmit,
                timeout: self.timeout,
            },
        ])
    }

    fn outgoing_link(&self, node: NodeId) -> Result<LinkId, ProtocolError> {
        self.link
            .ok_or_else(|| ProtocolError::timer_misuse(node, "sender was never initialized"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use relaynet_types::{MessageId, MessageIdGen, MessageKind, Topology};

    struct Env {
        topology: Topology,
        rng: ChaCha8Rng,
        messages: MessageIdGen,
        now: Duration,
    }

    impl Env {
        fn new() -> Self {
            Self {
                topology: Topology::pair(Duration::from_millis(100)),
                rng: ChaCha8Rng::seed_from_u64(42),
                messages: MessageIdGen::new(),
                now: Duration::ZERO,
            }
        }

        fn ctx(&mut self) -> Context<'_> {
            Context {
                now: self.now,
                topology: &self.topology,
                rng: &mut self.rng,
                messages: &mut self.messages,
            }
        }
    }

    fn timeout() -> Duration {
        Duration::from_secs(1)
    }

    #[test]
    fn test_init_sends_copy_and_arms_timer() {
        let mut env = Env::new();
        let mut sender = RetrySender::new(NodeId(0), timeout());
        let mut counters = TrafficCounters::default();

        let actions = sender
            .on_init(NodeId(0), &mut counters, &mut env.ctx())
            .unwrap();

        assert_eq!(actions.len(), 2);
        let (link, sent) = match &actions[0] {
            Action::Send { link, message } => (*link, message.clone()),
            other => panic!("expected Send, got {}", other.type_name()),
        };
        assert_eq!(link, LinkId::FIRST);
        assert_eq!(sent.source, NodeId(0));
        assert_eq!(sent.destination, NodeId(1));
        assert_eq!(sent.kind, MessageKind::Data);
        assert!(matches!(
            actions[1],
            Action::SetTimer {
                id: TimerId::Retransmit,
                timeout: t
            } if t == timeout()
        ));

        // Copy-on-send: the retained original is a different instance.
        let retained = sender.retained().unwrap();
        assert_ne!(retained.id, sent.id);
        assert_eq!(retained.destination, sent.destination);
        assert!(sender.timer_armed());
        assert_eq!(counters.sent, 1);
    }

    #[test]
    fn test_timeout_resends_retained_message() {
        let mut env = Env::new();
        let mut sender = RetrySender::new(NodeId(0), timeout());
        let mut counters = TrafficCounters::default();
        sender
            .on_init(NodeId(0), &mut counters, &mut env.ctx())
            .unwrap();
        let retained_id = sender.retained().unwrap().id;

        env.now = Duration::from_secs(1);
        let actions = sender
            .on_timer(NodeId(0), TimerId::Retransmit, &mut env.ctx())
            .unwrap();

        let resent = match &actions[0] {
            Action::Send { message, .. } => message.clone(),
            other => panic!("expected Send, got {}", other.type_name()),
        };
        // Same logical message, new physical instance.
        assert_ne!(resent.id, retained_id);
        assert_eq!(resent.destination, sender.retained().unwrap().destination);
        assert!(matches!(actions[1], Action::SetTimer { .. }));
        assert!(sender.timer_armed());
        // Retransmissions are not originations.
        assert_eq!(counters.sent, 1);
    }

    #[test]
    fn test_ack_cancels_timer_and_supersedes_retained() {
        let mut env = Env::new();
        let mut sender = RetrySender::new(NodeId(0), timeout());
        let mut counters = TrafficCounters::default();
        sender
            .on_init(NodeId(0), &mut counters, &mut env.ctx())
            .unwrap();

        env.now = Duration::from_millis(200);
        let ack = Message::data(MessageId(100), NodeId(1), NodeId(0));
        let actions = sender
            .on_message(NodeId(0), &mut counters, ack.clone(), &mut env.ctx())
            .unwrap();

        assert!(matches!(actions[0], Action::CancelTimer { .. }));
        let forwarded = match &actions[1] {
            Action::Send { message, .. } => message.clone(),
            other => panic!("expected Send, got {}", other.type_name()),
        };
        assert!(matches!(actions[2], Action::SetTimer { .. }));

        // The received message is retained; the copy went out.
        assert_eq!(sender.retained().unwrap().id, ack.id);
        assert_ne!(forwarded.id, ack.id);
        assert_eq!(forwarded.source, ack.source);
        assert!(sender.timer_armed());
        assert_eq!(counters.received, 1);
    }

    #[test]
    fn test_expiry_before_init_is_misuse() {
        let mut env = Env::new();
        let mut sender = RetrySender::new(NodeId(0), timeout());

        let err = sender
            .on_timer(NodeId(0), TimerId::Retransmit, &mut env.ctx())
            .unwrap_err();
        assert!(matches!(err, ProtocolError::TimerMisuse { .. }));
    }

    #[test]
    fn test_at_most_one_outstanding_deadline() {
        let mut env = Env::new();
        let mut sender = RetrySender::new(NodeId(0), timeout());
        let mut counters = TrafficCounters::default();
        sender
            .on_init(NodeId(0), &mut counters, &mut env.ctx())
            .unwrap();

        // Expire, re-arm, ack, re-arm: always exactly one deadline.
        for round in 1..=3u64 {
            env.now = Duration::from_secs(round);
            sender
                .on_timer(NodeId(0), TimerId::Retransmit, &mut env.ctx())
                .unwrap();
            assert!(sender.timer_armed());
        }
        let ack = Message::data(MessageId(50), NodeId(1), NodeId(0));
        sender
            .on_message(NodeId(0), &mut counters, ack, &mut env.ctx())
            .unwrap();
        assert!(sender.timer_armed());
    }

    #[test]
    fn test_missing_link_list_fails_at_init() {
        let mut env = Env::new();
        env.topology = Topology::new(vec![vec![]]);
        let mut sender = RetrySender::new(NodeId(0), timeout());
        let mut counters = TrafficCounters::default();

        let err = sender
            .on_init(NodeId(0), &mut counters, &mut env.ctx())
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Routing { .. }));
    }
}
