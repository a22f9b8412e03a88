//! Core types for the block simulator.
//!
//! This crate provides the vocabulary shared by the network layer and the
//! scheduler:
//!
//! - [`EventKind`] / [`Event`]: timestamped units of simulated work
//! - [`EventScheduler`]: how consume behavior schedules follow-up events
//! - [`BlockInput`]: what a block's behavioral code is told
//! - [`BlockAction`]: what a block's behavioral code asks for
//! - [`BlockCode`]: the trait every behavioral code implements
//!
//! # Architecture
//!
//! ```text
//! Scheduler pops Event → World::consume(kind) → interfaces / BlockCode::handle()
//!                                   ↑                          │
//!                                   └──── EventScheduler ◄─────┘ BlockActions
//! ```
//!
//! Block code is synchronous and performs no I/O: it mutates itself and
//! returns actions, which the world turns into messages and events.

mod action;
mod event;
mod input;
mod traits;

pub use action::BlockAction;
pub use event::{Event, EventKind};
pub use input::BlockInput;
pub use traits::{BlockCode, EventScheduler};
