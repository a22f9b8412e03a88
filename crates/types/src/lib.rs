//! Core types shared by every blocksim crate.
//!
//! Nothing in here knows about events or interfaces; these are the plain
//! value types the rest of the workspace is built from:
//!
//! - [`VirtualTime`]: the simulation clock, in virtual microseconds
//! - [`BlockId`], [`InterfaceId`], [`MessageId`]: identity handles
//! - [`Position`]: a block's location, used by the radio model

mod identifiers;
mod position;
mod time;

pub use identifiers::{BlockId, InterfaceId, MessageId};
pub use position::Position;
pub use time::{VirtualTime, MICROS_PER_SEC};
