//! Core traits.

use crate::{BlockAction, BlockInput, EventKind};
use blocksim_types::VirtualTime;
use std::any::Any;

/// Behavioral code running on one block.
///
/// Code is a state machine:
///
/// - **Synchronous**: never blocks, never sleeps
/// - **Deterministic**: same state + input = same actions
/// - **No I/O**: all sends and timers go through the returned actions
///
/// # Example
///
/// ```ignore
/// impl BlockCode for Counter {
///     fn handle(&mut self, _now: VirtualTime, input: BlockInput) -> Vec<BlockAction> {
///         match input {
///             BlockInput::Tap { .. } => {
///                 self.taps += 1;
///                 vec![]
///             }
///             _ => vec![],
///         }
///     }
///
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
/// }
/// ```
pub trait BlockCode: Send + 'static {
    /// Process an input, returning actions to perform.
    fn handle(&mut self, now: VirtualTime, input: BlockInput) -> Vec<BlockAction>;

    /// Access to the concrete type, for inspection after a run.
    fn as_any(&self) -> &dyn Any;
}

/// Scheduling seen from inside the scheduler thread.
///
/// Implemented by the simulation's event context. Network interfaces take
/// it as a parameter so they never hold a reference to the scheduler.
pub trait EventScheduler {
    /// Current virtual time.
    fn now(&self) -> VirtualTime;

    /// Schedule `kind` at `at`.
    ///
    /// # Panics
    ///
    /// Implementations panic if `at` is earlier than [`now`](Self::now).
    fn schedule(&mut self, at: VirtualTime, kind: EventKind);
}
