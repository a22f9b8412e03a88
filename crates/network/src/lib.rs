//! Simulated network interfaces.
//!
//! Two endpoint kinds share a common core ([`InterfaceCore`]): a data-rate
//! model and an availability clock.
//!
//! - [`P2PNetworkInterface`]: a symmetric link to exactly one peer, with a
//!   FIFO outgoing queue and one message in flight at a time.
//! - [`WirelessNetworkInterface`]: a half-duplex radio on a shared medium,
//!   with received-power thresholds and collision detection.
//!
//! Interfaces never own the scheduler. Every pipeline step takes an
//! [`EventScheduler`](blocksim_core::EventScheduler) and the statistics it
//! updates as parameters, so the world can hand out disjoint borrows.

mod config;
mod error;
mod interface;
mod p2p;
pub mod radio;
mod rate;
mod stats;
mod wireless;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{NetworkConfig, PropagationModel, WirelessConfig};
pub use error::RateError;
pub use interface::InterfaceCore;
pub use p2p::P2PNetworkInterface;
pub use rate::{Rate, DEFAULT_DATA_RATE};
pub use stats::{BlockStats, NetworkStats};
pub use wireless::{Reception, ReceptionOutcome, WirelessNetworkInterface};
