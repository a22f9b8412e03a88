//! Shared helpers for integration tests.

#![allow(dead_code)]

use blocksim_core::{BlockAction, BlockCode, BlockInput};
use blocksim_messages::{Message, Payload, WirelessMessage};
use blocksim_simulation::{Scheduler, SchedulerConfig, SchedulerMode, SchedulerStats, World};
use blocksim_types::VirtualTime;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Something a scripted block does.
#[derive(Debug, Clone)]
pub enum Step {
    Send { port: usize, tag: u32, size: u32 },
    Broadcast { tag: u32, size: u32 },
    Timer { delay: u64, id: u64 },
}

impl Step {
    fn into_action(self) -> BlockAction {
        match self {
            Step::Send { port, tag, size } => BlockAction::Send {
                interface: port,
                message: Message::new(tag, Payload::Int(tag as i64)).with_size(size),
            },
            Step::Broadcast { tag, size } => BlockAction::Broadcast {
                message: WirelessMessage::broadcast(tag, Payload::Empty).with_size(size),
            },
            Step::Timer { delay, id } => BlockAction::SetTimer { delay, id },
        }
    }
}

/// What a scripted block observed.
#[derive(Debug, Clone, PartialEq)]
pub enum Seen {
    Started,
    Message { port: usize, tag: u32 },
    Wireless { tag: u32 },
    Tap { face: Option<u8> },
    Timer { id: u64 },
}

/// Block code that follows a fixed script and records everything it sees.
///
/// The log is shared so tests can watch it while the scheduler runs.
pub struct Scripted {
    on_start: Vec<Step>,
    on_timer: BTreeMap<u64, Vec<Step>>,
    log: Arc<Mutex<Vec<(u64, Seen)>>>,
}

impl Scripted {
    pub fn new() -> Self {
        Self {
            on_start: Vec::new(),
            on_timer: BTreeMap::new(),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn on_start(mut self, step: Step) -> Self {
        self.on_start.push(step);
        self
    }

    pub fn on_timer(mut self, id: u64, step: Step) -> Self {
        self.on_timer.entry(id).or_default().push(step);
        self
    }

    pub fn log(&self) -> Arc<Mutex<Vec<(u64, Seen)>>> {
        Arc::clone(&self.log)
    }

    pub fn seen(&self) -> Vec<(u64, Seen)> {
        self.log.lock().clone()
    }
}

impl BlockCode for Scripted {
    fn handle(&mut self, now: VirtualTime, input: BlockInput) -> Vec<BlockAction> {
        let (seen, steps) = match input {
            BlockInput::Start => (Seen::Started, self.on_start.clone()),
            BlockInput::MessageReceived { interface, message } => (
                Seen::Message {
                    port: interface,
                    tag: message.type_tag(),
                },
                vec![],
            ),
            BlockInput::WirelessMessageReceived { message, .. } => (
                Seen::Wireless {
                    tag: message.type_tag(),
                },
                vec![],
            ),
            BlockInput::Tap { face } => (Seen::Tap { face }, vec![]),
            BlockInput::TimerFired { id } => (
                Seen::Timer { id },
                self.on_timer.get(&id).cloned().unwrap_or_default(),
            ),
        };
        self.log.lock().push((now.as_micros(), seen));
        steps.into_iter().map(Step::into_action).collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Run `world` in fast mode until the queue is empty.
pub fn run_to_idle(world: World, config: SchedulerConfig) -> (World, SchedulerStats) {
    let mut scheduler = Scheduler::new(world, config.with_terminate_when_idle(true));
    scheduler.start(SchedulerMode::Fast).unwrap();
    scheduler.unpause().unwrap();
    scheduler.wait_for_end().unwrap()
}
