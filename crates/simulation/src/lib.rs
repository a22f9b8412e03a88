//! Discrete-event simulation of modular robot blocks.
//!
//! A [`World`] holds the blocks and their network interfaces. A
//! [`Scheduler`] takes ownership of the world, runs it on a dedicated
//! thread in virtual time, and hands it back when the run ends.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                       Scheduler                         │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Event Queue (BTreeMap<EventKey, EventKind>)    │ │
//! │  │     Ordered by: time, sequence                     │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     World::consume(kind, ctx)                      │ │
//! │  │     interfaces, radio fan-out, BlockCode::handle   │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     SimContext::schedule → new events              │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Given the same world, seed and injections, a run in fast mode is
//! reproducible event for event.

mod block;
mod context;
mod error;
mod event_queue;
mod scheduler;
mod world;

pub use block::BuildingBlock;
pub use context::SimContext;
pub use error::{SchedulerError, WorldError};
pub use event_queue::{EventKey, EventQueue};
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerMode, SchedulerState, SchedulerStats};
pub use world::World;
