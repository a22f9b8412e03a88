//! Messages exchanged between simulated blocks.
//!
//! Nothing here touches a real wire: a message is a payload plus a virtual
//! size, and the network layer turns the size into a transmission delay.
//!
//! Ownership is explicit. A message lives in exactly one queue slot or
//! event at a time; when one logical message must go to several places
//! (wireless fan-out) it is duplicated with [`Clone`], which mints a new
//! id. Every live instance is counted so leaks show up in diagnostics.

mod counter;
mod message;
mod payload;
mod wireless;

pub use message::Message;
pub use payload::Payload;
pub use wireless::WirelessMessage;

/// Size, in virtual bytes, of a message that does not override it.
pub const DEFAULT_MESSAGE_SIZE: u32 = 4;
