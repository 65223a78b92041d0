//! Core protocol machinery: events in, actions out.
//!
//! # Architecture
//!
//! ```text
//! EventPayload ──▶ node handler ──▶ Vec<Action> ──▶ driver
//!   (Message,         (pure,          (Send, SetTimer,
//!    Timer)          run-to-           ScheduleSelf, ...)
//!                    completion)
//! ```
//!
//! Handlers are synchronous and deterministic: they run to completion
//! without blocking, perform no I/O, and request every side effect through
//! an [`Action`] that the simulation driver executes. Randomness reaches a
//! handler only through the driver's seeded stream, so a fixed seed replays
//! a run exactly.

mod action;
mod error;
mod event;
mod timer;

pub use action::Action;
pub use error::ProtocolError;
pub use event::EventPayload;
pub use timer::{RetryTimer, TimerId};
