//! Point-to-point interfaces.

use crate::interface::InterfaceCore;
use crate::rate::Rate;
use crate::stats::{BlockStats, NetworkStats};
use blocksim_core::{EventKind, EventScheduler};
use blocksim_messages::Message;
use blocksim_types::{BlockId, InterfaceId, VirtualTime};
use std::collections::VecDeque;
use tracing::{debug, error, trace, warn};

/// One end of a point-to-point link.
///
/// Messages leave in the order they were enqueued, one at a time. Each
/// transmission occupies the interface for
/// `size * 8 * 1_000_000 / rate` virtual microseconds, after which the
/// message is handed to the connected peer.
///
/// Connection state is managed by the world, which keeps both ends of a
/// link pointing at each other.
#[derive(Debug)]
pub struct P2PNetworkInterface {
    core: InterfaceCore,
    connected: Option<InterfaceId>,
    outgoing_queue: VecDeque<Message>,
    message_being_transmitted: Option<Message>,
    /// A `StartTransmitting` event is queued and has not fired yet.
    start_pending: bool,
}

impl P2PNetworkInterface {
    pub fn new(id: InterfaceId, local_id: usize, host: BlockId, rate: Rate) -> Self {
        Self {
            core: InterfaceCore::new(id, local_id, host, rate),
            connected: None,
            outgoing_queue: VecDeque::new(),
            message_being_transmitted: None,
            start_pending: false,
        }
    }

    pub fn id(&self) -> InterfaceId {
        self.core.id()
    }

    pub fn local_id(&self) -> usize {
        self.core.local_id()
    }

    pub fn host(&self) -> BlockId {
        self.core.host()
    }

    pub fn availability_date(&self) -> VirtualTime {
        self.core.availability_date()
    }

    pub fn set_data_rate(&mut self, rate: Rate) {
        self.core.set_data_rate(rate);
    }

    /// The peer interface, if any.
    pub fn connected(&self) -> Option<InterfaceId> {
        self.connected
    }

    pub fn is_connected(&self) -> bool {
        self.connected.is_some()
    }

    /// Record the peer. Only this end is updated; the world updates the other.
    pub fn set_connected(&mut self, peer: Option<InterfaceId>) {
        self.connected = peer;
    }

    /// Messages waiting behind the one in flight.
    pub fn outgoing_len(&self) -> usize {
        self.outgoing_queue.len()
    }

    pub fn is_transmitting(&self) -> bool {
        self.message_being_transmitted.is_some()
    }

    pub fn message_being_transmitted(&self) -> Option<&Message> {
        self.message_being_transmitted.as_ref()
    }

    /// Virtual microseconds needed to transmit `message` at the current rate.
    pub fn transmission_duration(&mut self, message: &Message) -> u64 {
        self.core.transmission_duration(message.size())
    }

    /// Queue `message` for sending, as of now.
    ///
    /// Schedules the enqueue as an event so that processing order is the
    /// scheduler's. Returns `false`, and drops the message, when the
    /// interface is not connected.
    pub fn send(&self, message: Message, sched: &mut dyn EventScheduler) -> bool {
        if !self.is_connected() {
            warn!(
                block = %self.host(),
                interface = %self.id(),
                message = %message.id(),
                "send on an unconnected interface"
            );
            return false;
        }
        let now = sched.now();
        sched.schedule(
            now,
            EventKind::EnqueueOutgoing {
                interface: self.id(),
                message,
            },
        );
        true
    }

    /// Append `message` to the outgoing queue.
    ///
    /// Starts the transmission pipeline if the interface was idle. Returns
    /// `false`, and drops the message, when the interface is not connected.
    pub fn add_to_outgoing_buffer(
        &mut self,
        message: Message,
        stats: &mut BlockStats,
        sched: &mut dyn EventScheduler,
    ) -> bool {
        if !self.is_connected() {
            warn!(
                block = %self.host(),
                interface = %self.id(),
                message = %message.id(),
                "enqueue on an unconnected interface"
            );
            return false;
        }

        trace!(interface = %self.id(), message = %message.id(), "enqueue outgoing");
        self.outgoing_queue.push_back(message);
        stats.inc_outgoing_message_queue_size();

        let now = sched.now();
        self.core.advance_availability(now);
        if self.outgoing_queue.len() == 1 && self.message_being_transmitted.is_none() {
            self.schedule_start(sched);
        }
        true
    }

    /// Restart an idle pipeline that still has queued messages.
    ///
    /// Needed after a (re)connection: messages left behind while the link
    /// was down would otherwise wait forever.
    pub fn resume(&mut self, sched: &mut dyn EventScheduler) {
        if self.is_connected()
            && !self.outgoing_queue.is_empty()
            && self.message_being_transmitted.is_none()
            && !self.start_pending
        {
            self.core.advance_availability(sched.now());
            self.schedule_start(sched);
        }
    }

    fn schedule_start(&mut self, sched: &mut dyn EventScheduler) {
        let at = self.core.availability_date().max(sched.now());
        self.start_pending = true;
        sched.schedule(at, EventKind::StartTransmitting { interface: self.id() });
    }

    /// Put the head of the outgoing queue on the wire.
    ///
    /// # Panics
    ///
    /// Panics if the outgoing queue is empty: a start was scheduled with
    /// nothing to send.
    pub fn start_transmitting(
        &mut self,
        stats: &mut BlockStats,
        net: &mut NetworkStats,
        sched: &mut dyn EventScheduler,
    ) {
        self.start_pending = false;

        let Some(peer) = self.connected else {
            warn!(
                block = %self.host(),
                interface = %self.id(),
                queued = self.outgoing_queue.len(),
                "start transmitting on an unconnected interface"
            );
            return;
        };

        let Some(mut message) = self.outgoing_queue.pop_front() else {
            error!(
                block = %self.host(),
                interface = %self.id(),
                "start transmitting with an empty outgoing queue"
            );
            panic!("interface {} started transmitting with an empty queue", self.id());
        };
        stats.dec_outgoing_message_queue_size();

        message.source = Some(self.id());
        message.destination = Some(peer);

        let now = sched.now();
        let duration = self.transmission_duration(&message);
        let end = now.plus(duration);
        self.core.advance_availability(end);

        debug!(
            interface = %self.id(),
            peer = %peer,
            message = %message.id(),
            size = message.size(),
            duration,
            "start transmitting"
        );

        self.message_being_transmitted = Some(message);
        sched.schedule(end, EventKind::StopTransmitting { interface: self.id() });

        net.messages_sent += 1;
        stats.inc_sent_message_count();
    }

    /// The in-flight message has fully left the interface.
    ///
    /// Hands it to its destination and starts the next transmission, if any.
    pub fn stop_transmitting(
        &mut self,
        stats: &mut BlockStats,
        net: &mut NetworkStats,
        sched: &mut dyn EventScheduler,
    ) {
        let Some(message) = self.message_being_transmitted.take() else {
            error!(interface = %self.id(), "stop transmitting with nothing in flight");
            panic!("interface {} stopped transmitting with nothing in flight", self.id());
        };

        let now = sched.now();
        let destination = message.destination;
        match destination {
            Some(destination) => {
                trace!(
                    interface = %self.id(),
                    destination = %destination,
                    message = %message.id(),
                    "stop transmitting"
                );
                sched.schedule(
                    now,
                    EventKind::ReceiveMessage {
                        interface: destination,
                        message,
                    },
                );
            }
            None => {
                error!(
                    interface = %self.id(),
                    message = %message.id(),
                    "in-flight message has no destination"
                );
                panic!("message {} was transmitted without a destination", message.id());
            }
        }

        if !self.outgoing_queue.is_empty() {
            self.start_transmitting(stats, net, sched);
        }
    }
}
