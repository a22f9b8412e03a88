//! Error types for the world and the scheduler.

use blocksim_network::RateError;
use blocksim_types::{BlockId, InterfaceId};
use thiserror::Error;

/// Errors building or querying the world.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("Block {0} not found")]
    BlockNotFound(BlockId),

    #[error("Block {0} already exists")]
    DuplicateBlock(BlockId),

    #[error("Interface {0} not found")]
    InterfaceNotFound(InterfaceId),

    /// The block has fewer P2P interfaces than `port + 1`.
    #[error("Block {block} has no port {port}")]
    NoSuchPort { block: BlockId, port: usize },

    #[error("Block {0} has no wireless interface")]
    NoWirelessInterface(BlockId),

    #[error("Interface {0} cannot be connected to itself")]
    SelfConnection(InterfaceId),

    /// Downcast of the block's code to the requested type failed.
    #[error("Block {0} runs a different code type")]
    BlockCodeMismatch(BlockId),

    #[error("Invalid data rate: {0}")]
    InvalidRate(#[from] RateError),
}

/// Errors driving the scheduler from outside its thread.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Scheduler already started")]
    AlreadyStarted,

    #[error("Scheduler not started")]
    NotStarted,

    #[error("Scheduler stopped")]
    Stopped,

    /// The scheduler thread panicked on an invariant violation.
    #[error("Scheduler thread aborted")]
    Aborted,

    #[error("Failed to spawn scheduler thread: {0}")]
    Spawn(#[from] std::io::Error),
}
