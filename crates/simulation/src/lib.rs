//! Deterministic relay-network simulation driver.
//!
//! This crate provides a fully deterministic discrete-event environment
//! for the relay behaviors. Given the same topology, behaviors, and seed,
//! it produces identical results every run.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  SimulationRunner                       │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     EventQueue (BTreeMap<EventKey, payload>)       │ │
//! │  │     Ordered by: time, sequence (FIFO tie-break)    │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     nodes: Vec<RelayNode>                          │ │
//! │  │     Each processes one event at a time             │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Actions → sends, self-schedules, timers,       │ │
//! │  │     metric emissions → new queue entries           │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod event_queue;
mod metrics;
mod runner;

pub use event_queue::{Event, EventHandle, EventKey, EventQueue};
pub use metrics::{MemorySink, MetricSink, NullSink};
pub use runner::{RunLimits, SimulationError, SimulationRunner, SimulationStats};
