//! Event queue with deterministic ordering.

use relaynet_core::EventPayload;
use relaynet_types::NodeId;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

/// Stable handle to a scheduled event.
///
/// Holders keep the handle, not the entry itself, so cancellation can never
/// dangle: cancelling an event that already fired is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandle(u64);

/// Key for ordering events in the queue.
///
/// Events are ordered by:
/// 1. Time (earlier first)
/// 2. Sequence number (FIFO for same time: first scheduled fires first)
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct EventKey {
    /// When this event should be processed.
    pub time: Duration,
    /// Tie-break sequence for deterministic FIFO ordering.
    pub sequence: u64,
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Order by time first
        match self.time.cmp(&other.time) {
            Ordering::Equal => {}
            ord => return ord,
        }

        // Then by sequence (FIFO at equal timestamps)
        self.sequence.cmp(&other.sequence)
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A scheduled event, as handed back by [`EventQueue::pop_next`].
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Simulated time the event fires.
    pub time: Duration,
    /// Scheduling sequence number, unique per queue.
    pub sequence: u64,
    /// Node the payload is delivered to.
    pub target: NodeId,
    /// What is delivered.
    pub payload: EventPayload,
}

/// Time-ordered queue of pending events.
///
/// Cancellation is lazy: a cancelled entry stays in the structure marked
/// inert and is skipped (and reclaimed) on pop, keeping every issued
/// [`EventHandle`] stable for the queue's lifetime. Pops are strictly
/// non-decreasing in time.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: BTreeMap<EventKey, (NodeId, EventPayload)>,
    cancelled: HashSet<u64>,
    sequence: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a payload for delivery to `target` at `time`.
    pub fn schedule(
        &mut self,
        time: Duration,
        target: NodeId,
        payload: EventPayload,
    ) -> EventHandle {
        self.sequence += 1;
        let key = EventKey {
            time,
            sequence: self.sequence,
        };
        self.events.insert(key, (target, payload));
        EventHandle(self.sequence)
    }

    /// Mark a scheduled event inert. No-op if it already fired.
    pub fn cancel(&mut self, handle: EventHandle) {
        self.cancelled.insert(handle.0);
    }

    /// Pop the earliest live event, skipping inert entries.
    pub fn pop_next(&mut self) -> Option<Event> {
        while let Some((key, (target, payload))) = self.events.pop_first() {
            if self.cancelled.remove(&key.sequence) {
                continue;
            }
            return Some(Event {
                time: key.time,
                sequence: key.sequence,
                target,
                payload,
            });
        }
        None
    }

    /// Fire time of the next live event, draining leading inert entries.
    pub fn next_time(&mut self) -> Option<Duration> {
        loop {
            let (&key, _) = self.events.first_key_value()?;
            if self.cancelled.remove(&key.sequence) {
                self.events.remove(&key);
                continue;
            }
            return Some(key.time);
        }
    }

    /// Queued entries, inert ones included.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
