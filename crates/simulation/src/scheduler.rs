//! The scheduler thread.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────── control / application threads ──────────────┐
//! │  schedule_lock() ──► inbox (Mutex<Vec<Event>>) ──┐          │
//! │  pause() / stop()  (are events too)              │ notify   │
//! │  unpause() ──► state = Running ──────────────────┤          │
//! └──────────────────────────────────────────────────┼──────────┘
//!                                                    ▼
//! ┌──────────────────── scheduler thread ──────────────────────┐
//! │  drain inbox ─► EventQueue (BTreeMap<EventKey, EventKind>)  │
//! │  pop earliest ─► advance clock ─► World::consume(ctx)       │
//! │  ctx.schedule() ─► EventQueue (no lock)                     │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! The thread owns the world and the queue. Other threads see only the
//! inbox and a handful of atomics.

use crate::context::SimContext;
use crate::error::SchedulerError;
use crate::event_queue::EventQueue;
use crate::world::World;
use blocksim_core::{Event, EventKind};
use blocksim_types::{BlockId, VirtualTime};
use parking_lot::{Condvar, Mutex};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace};

/// How the scheduler paces itself.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SchedulerMode {
    /// Process events as fast as possible.
    #[default]
    Fast,
    /// Follow the wall clock: one virtual second takes `1 / speed` real
    /// seconds.
    RealTime { speed: f64 },
}

/// Lifecycle of a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SchedulerState {
    /// Built, thread not spawned.
    Created = 0,
    /// Thread running but holding still.
    Paused = 1,
    /// Processing events.
    Running = 2,
    /// Thread finished (or aborted).
    Stopped = 3,
}

impl SchedulerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SchedulerState::Created,
            1 => SchedulerState::Paused,
            2 => SchedulerState::Running,
            _ => SchedulerState::Stopped,
        }
    }
}

/// Scheduler options.
#[derive(Debug, Clone, Default)]
pub struct SchedulerConfig {
    /// Stop automatically before processing any event later than this.
    pub max_date: Option<VirtualTime>,
    /// Stop when the queue runs dry instead of waiting for injections.
    pub terminate_when_idle: bool,
    /// Keep `(time, kind)` of every processed event in the stats.
    pub record_trace: bool,
}

impl SchedulerConfig {
    pub fn with_max_date(mut self, date: VirtualTime) -> Self {
        self.max_date = Some(date);
        self
    }

    pub fn with_terminate_when_idle(mut self, enabled: bool) -> Self {
        self.terminate_when_idle = enabled;
        self
    }

    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.record_trace = enabled;
        self
    }
}

/// Statistics collected by the scheduler thread.
#[derive(Debug, Default, Clone)]
pub struct SchedulerStats {
    /// Total events processed, control events included.
    pub events_processed: u64,
    /// Events processed by kind name.
    pub events_by_kind: BTreeMap<&'static str, u64>,
    /// Clock value when the thread exited.
    pub final_time: VirtualTime,
    /// Every processed event, when tracing was enabled.
    pub trace: Vec<(VirtualTime, &'static str)>,
}

#[derive(Default)]
struct Inbox {
    events: Vec<Event>,
    shutdown: bool,
}

/// State shared between the scheduler thread and its handles.
struct Shared {
    inbox: Mutex<Inbox>,
    wake: Condvar,
    state: AtomicU8,
    now: AtomicU64,
    sequence: AtomicU64,
    events_processed: AtomicU64,
}

impl Shared {
    fn state(&self) -> SchedulerState {
        SchedulerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: SchedulerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn now(&self) -> VirtualTime {
        VirtualTime::from_micros(self.now.load(Ordering::Acquire))
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }
}

/// Marks the scheduler stopped when the thread exits, panics included.
struct StopOnExit<'a>(&'a Shared);

impl Drop for StopOnExit<'_> {
    fn drop(&mut self) {
        self.0.set_state(SchedulerState::Stopped);
        self.0.wake.notify_all();
    }
}

/// Discrete-event scheduler.
///
/// Lifecycle: `Created → Paused → Running ⇄ Paused → Stopped`.
///
/// [`start`](Scheduler::start) spawns the thread, which holds still until
/// [`unpause`](Scheduler::unpause). Events at equal times run in creation
/// order. [`pause`](Scheduler::pause) and [`stop`](Scheduler::stop) are
/// events themselves, so they take effect at a precise virtual date.
pub struct Scheduler {
    shared: Arc<Shared>,
    config: SchedulerConfig,
    pending: Option<(World, EventQueue)>,
    handle: Option<JoinHandle<(World, SchedulerStats)>>,
}

impl Scheduler {
    /// Take ownership of `world`. Every block's code is scheduled to start
    /// at time zero, in ascending block-id order.
    pub fn new(world: World, config: SchedulerConfig) -> Self {
        let shared = Arc::new(Shared {
            inbox: Mutex::new(Inbox::default()),
            wake: Condvar::new(),
            state: AtomicU8::new(SchedulerState::Created as u8),
            now: AtomicU64::new(0),
            sequence: AtomicU64::new(0),
            events_processed: AtomicU64::new(0),
        });

        let mut queue = EventQueue::new();
        let blocks: Vec<BlockId> = world.blocks().map(|b| b.id()).collect();
        for block in blocks {
            queue.push(Event::new(
                VirtualTime::ZERO,
                shared.next_sequence(),
                EventKind::CodeStart { block },
            ));
        }

        Self {
            shared,
            config,
            pending: Some((world, queue)),
            handle: None,
        }
    }

    /// Spawn the scheduler thread, initially paused.
    pub fn start(&mut self, mode: SchedulerMode) -> Result<(), SchedulerError> {
        let (world, queue) = self.pending.take().ok_or(SchedulerError::AlreadyStarted)?;
        self.shared.set_state(SchedulerState::Paused);

        let shared = Arc::clone(&self.shared);
        let config = self.config.clone();
        let spawned = std::thread::Builder::new()
            .name("blocksim-scheduler".into())
            .spawn(move || run(&shared, world, queue, &config, mode));

        match spawned {
            Ok(handle) => {
                info!(?mode, "scheduler started");
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.shared.set_state(SchedulerState::Stopped);
                Err(SchedulerError::Spawn(e))
            }
        }
    }

    /// Let the thread run.
    pub fn unpause(&self) -> Result<(), SchedulerError> {
        let _inbox = self.shared.inbox.lock();
        match self.shared.state() {
            SchedulerState::Created => Err(SchedulerError::NotStarted),
            SchedulerState::Stopped => Err(SchedulerError::Stopped),
            SchedulerState::Paused | SchedulerState::Running => {
                self.shared.set_state(SchedulerState::Running);
                self.shared.wake.notify_all();
                Ok(())
            }
        }
    }

    /// Pause at virtual `date`. A date already past pauses as soon as
    /// possible.
    pub fn pause(&self, date: VirtualTime) -> Result<(), SchedulerError> {
        self.schedule_lock(date, EventKind::Pause)
    }

    /// Stop for good at virtual `date`. A date already past stops as soon
    /// as possible.
    pub fn stop(&self, date: VirtualTime) -> Result<(), SchedulerError> {
        self.schedule_lock(date, EventKind::Stop)
    }

    /// Schedule a tap on `block` at `date`.
    pub fn tap_block(
        &self,
        date: VirtualTime,
        block: BlockId,
        face: Option<u8>,
    ) -> Result<(), SchedulerError> {
        self.schedule_lock(date, EventKind::Tap { block, face })
    }

    /// Inject an event from any thread.
    ///
    /// Injecting a non-control event dated before the clock is an invariant
    /// violation: the scheduler thread aborts when it drains it.
    pub fn schedule_lock(&self, at: VirtualTime, kind: EventKind) -> Result<(), SchedulerError> {
        let mut inbox = self.shared.inbox.lock();
        if self.shared.state() == SchedulerState::Stopped {
            return Err(SchedulerError::Stopped);
        }
        trace!(kind = kind.name(), at = %at, "inject");
        let sequence = self.shared.next_sequence();
        inbox.events.push(Event::new(at, sequence, kind));
        self.shared.wake.notify_all();
        Ok(())
    }

    pub fn state(&self) -> SchedulerState {
        self.shared.state()
    }

    pub fn is_paused(&self) -> bool {
        self.shared.state() == SchedulerState::Paused
    }

    /// Current virtual time.
    pub fn now(&self) -> VirtualTime {
        self.shared.now()
    }

    pub fn events_processed(&self) -> u64 {
        self.shared.events_processed.load(Ordering::Relaxed)
    }

    /// Wait for the thread to stop and take back the world.
    pub fn wait_for_end(mut self) -> Result<(World, SchedulerStats), SchedulerError> {
        let handle = self.handle.take().ok_or(SchedulerError::NotStarted)?;
        match handle.join() {
            Ok(result) => Ok(result),
            Err(_) => {
                error!("scheduler thread aborted");
                Err(SchedulerError::Aborted)
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            {
                let mut inbox = self.shared.inbox.lock();
                inbox.shutdown = true;
                self.shared.wake.notify_all();
            }
            let _ = handle.join();
        }
    }
}

/// Wall-clock pacing for real-time mode.
struct Pacer {
    speed: Option<f64>,
    epoch: (Instant, VirtualTime),
}

impl Pacer {
    fn new(mode: SchedulerMode) -> Self {
        let speed = match mode {
            SchedulerMode::Fast => None,
            SchedulerMode::RealTime { speed } if speed > 0.0 => Some(speed),
            SchedulerMode::RealTime { .. } => None,
        };
        Self {
            speed,
            epoch: (Instant::now(), VirtualTime::ZERO),
        }
    }

    /// Re-anchor after a wait so that paused time is not made up for.
    fn reset(&mut self, now: VirtualTime) {
        self.epoch = (Instant::now(), now);
    }

    /// Wall-clock instant at which `at` is due, or `None` in fast mode.
    fn deadline(&self, at: VirtualTime) -> Option<Instant> {
        let speed = self.speed?;
        let (wall, virt) = self.epoch;
        let micros = at.since(virt).unwrap_or(0);
        Some(wall + Duration::from_secs_f64(micros as f64 / 1_000_000.0 / speed))
    }
}

enum Next {
    Event(Event),
    Exit,
}

/// Wait until there is something to do, draining injections into `queue`.
fn next_event(
    shared: &Shared,
    queue: &mut EventQueue,
    config: &SchedulerConfig,
    pacer: &mut Pacer,
    now: VirtualTime,
) -> Next {
    let mut inbox = shared.inbox.lock();
    loop {
        if inbox.shutdown {
            return Next::Exit;
        }
        for mut event in inbox.events.drain(..) {
            if event.time < now {
                if event.kind.is_control() {
                    event.time = now;
                } else {
                    error!(
                        kind = event.kind.name(),
                        at = %event.time,
                        now = %now,
                        "event injected in the past"
                    );
                    panic!(
                        "{} injected at {} before now ({})",
                        event.kind.name(),
                        event.time,
                        now
                    );
                }
            }
            queue.push(event);
        }

        if shared.state() == SchedulerState::Running {
            match queue.pop() {
                Some(event) => match pacer.deadline(event.time) {
                    Some(deadline) if Instant::now() < deadline => {
                        // Not due yet: sleep, but wake on injection or pause.
                        queue.requeue(event);
                        shared.wake.wait_until(&mut inbox, deadline);
                        continue;
                    }
                    _ => return Next::Event(event),
                },
                None if config.terminate_when_idle => {
                    debug!(now = %now, "queue empty, terminating");
                    return Next::Exit;
                }
                None => {}
            }
        }

        shared.wake.wait(&mut inbox);
        pacer.reset(now);
    }
}

fn run(
    shared: &Shared,
    mut world: World,
    mut queue: EventQueue,
    config: &SchedulerConfig,
    mode: SchedulerMode,
) -> (World, SchedulerStats) {
    let _guard = StopOnExit(shared);
    let mut stats = SchedulerStats::default();
    let mut pacer = Pacer::new(mode);
    let mut now = VirtualTime::ZERO;

    loop {
        let event = match next_event(shared, &mut queue, config, &mut pacer, now) {
            Next::Event(event) => event,
            Next::Exit => break,
        };

        if let Some(max_date) = config.max_date {
            if event.time > max_date {
                info!(max_date = %max_date, "max date reached");
                now = max_date.max(now);
                shared.now.store(now.as_micros(), Ordering::Release);
                break;
            }
        }

        now = event.time;
        shared.now.store(now.as_micros(), Ordering::Release);

        let name = event.kind.name();
        stats.events_processed += 1;
        *stats.events_by_kind.entry(name).or_insert(0) += 1;
        if config.record_trace {
            stats.trace.push((now, name));
        }
        shared.events_processed.fetch_add(1, Ordering::Relaxed);

        match event.kind {
            EventKind::Pause => {
                // State changes happen under the inbox lock.
                let _inbox = shared.inbox.lock();
                if shared.state() == SchedulerState::Running {
                    shared.set_state(SchedulerState::Paused);
                }
                info!(now = %now, "scheduler paused");
            }
            EventKind::Stop => {
                info!(now = %now, "scheduler stopped");
                break;
            }
            kind => {
                let mut ctx = SimContext::new(now, &mut queue, &shared.sequence);
                world.consume(kind, &mut ctx);
            }
        }
    }

    stats.final_time = now;
    info!(
        events = stats.events_processed,
        final_time = %now,
        "scheduler thread exiting"
    );
    (world, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocksim_network::NetworkConfig;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use tracing_test::traced_test;

    fn running_at(now: VirtualTime, injected: Vec<Event>) -> Shared {
        Shared {
            inbox: Mutex::new(Inbox {
                events: injected,
                shutdown: false,
            }),
            wake: Condvar::new(),
            state: AtomicU8::new(SchedulerState::Running as u8),
            now: AtomicU64::new(now.as_micros()),
            sequence: AtomicU64::new(0),
            events_processed: AtomicU64::new(0),
        }
    }

    #[test]
    fn test_state_roundtrip() {
        for state in [
            SchedulerState::Created,
            SchedulerState::Paused,
            SchedulerState::Running,
            SchedulerState::Stopped,
        ] {
            assert_eq!(SchedulerState::from_u8(state as u8), state);
        }
    }

    #[test]
    fn test_lifecycle_errors() {
        let mut scheduler = Scheduler::new(
            World::new(NetworkConfig::default()),
            SchedulerConfig::default(),
        );
        assert_eq!(scheduler.state(), SchedulerState::Created);
        assert!(matches!(scheduler.unpause(), Err(SchedulerError::NotStarted)));

        scheduler.start(SchedulerMode::Fast).unwrap();
        assert!(scheduler.is_paused());
        assert!(matches!(
            scheduler.start(SchedulerMode::Fast),
            Err(SchedulerError::AlreadyStarted)
        ));

        scheduler.stop(VirtualTime::ZERO).unwrap();
        scheduler.unpause().unwrap();
        let (_, stats) = scheduler.wait_for_end().unwrap();
        assert_eq!(stats.events_processed, 1);
    }

    #[test]
    fn test_terminate_when_idle() {
        let config = SchedulerConfig::default().with_terminate_when_idle(true);
        let mut scheduler = Scheduler::new(World::new(NetworkConfig::default()), config);
        scheduler.start(SchedulerMode::Fast).unwrap();
        scheduler.unpause().unwrap();
        let (_, stats) = scheduler.wait_for_end().unwrap();
        assert_eq!(stats.events_processed, 0);
        assert_eq!(stats.final_time, VirtualTime::ZERO);
    }

    #[test]
    fn test_pacer_deadlines() {
        let fast = Pacer::new(SchedulerMode::Fast);
        assert!(fast.deadline(VirtualTime::from_secs(1)).is_none());

        let mut paced = Pacer::new(SchedulerMode::RealTime { speed: 2.0 });
        paced.reset(VirtualTime::ZERO);
        let (wall, _) = paced.epoch;
        let deadline = paced.deadline(VirtualTime::from_secs(1)).unwrap();
        assert_eq!(deadline - wall, Duration::from_millis(500));
    }

    #[traced_test]
    #[test]
    fn test_past_injection_is_logged_then_aborts() {
        let now = VirtualTime::from_micros(20);
        let tap = EventKind::Tap {
            block: BlockId(0),
            face: None,
        };
        let shared = running_at(now, vec![Event::new(VirtualTime::from_micros(5), 0, tap)]);
        let mut queue = EventQueue::new();
        let mut pacer = Pacer::new(SchedulerMode::Fast);
        let config = SchedulerConfig::default();

        let result = catch_unwind(AssertUnwindSafe(|| {
            next_event(&shared, &mut queue, &config, &mut pacer, now);
        }));
        assert!(result.is_err());
        assert!(logs_contain("event injected in the past"));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_past_control_event_runs_now() {
        let now = VirtualTime::from_micros(20);
        let pause = Event::new(VirtualTime::from_micros(5), 0, EventKind::Pause);
        let shared = running_at(now, vec![pause]);
        let mut queue = EventQueue::new();
        let mut pacer = Pacer::new(SchedulerMode::Fast);
        let config = SchedulerConfig::default();

        match next_event(&shared, &mut queue, &config, &mut pacer, now) {
            Next::Event(event) => {
                assert_eq!(event.time, now);
                assert!(matches!(event.kind, EventKind::Pause));
            }
            Next::Exit => panic!("expected the pause event"),
        }
    }
}
