//! Wireless interfaces.

use crate::config::WirelessConfig;
use crate::interface::InterfaceCore;
use crate::rate::Rate;
use crate::stats::{BlockStats, NetworkStats};
use blocksim_core::{EventKind, EventScheduler};
use blocksim_messages::WirelessMessage;
use blocksim_types::{BlockId, InterfaceId, MessageId, VirtualTime};
use std::collections::VecDeque;
use tracing::{debug, error, trace};

/// A signal currently arriving at an interface.
#[derive(Debug)]
pub struct Reception {
    pub message: WirelessMessage,
    pub power_dbm: f64,
    /// When the last bit arrives.
    pub end: VirtualTime,
    /// An overlapping signal (or our own transmission) destroyed it.
    pub corrupted: bool,
}

/// How a reception ended.
#[derive(Debug)]
pub enum ReceptionOutcome {
    /// Decoded and addressed to this block.
    Delivered {
        message: WirelessMessage,
        power_dbm: f64,
    },
    /// Lost to a collision.
    Collided,
    /// Sensed but too weak to decode.
    BelowThreshold,
    /// Decoded, but addressed to another block.
    NotAddressed,
    /// No reception with that id was in progress.
    Unknown,
}

impl ReceptionOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, ReceptionOutcome::Delivered { .. })
    }
}

/// A half-duplex radio on the shared medium.
///
/// Transmission mirrors the point-to-point pipeline without a peer: the
/// world fans each transmitted message out to every other radio.
///
/// Reception follows a pairwise capture rule. While signals overlap, each
/// one survives only if it is at least `capture_threshold_db` stronger
/// than every other signal it overlaps. Starting a transmission destroys
/// every reception in progress, and nothing is received while
/// transmitting.
///
/// `collision_occuring` is up exactly while signals are arriving and none
/// of them can still be decoded. No signal arriving in that state is
/// decoded either, until the medium goes quiet.
#[derive(Debug)]
pub struct WirelessNetworkInterface {
    core: InterfaceCore,
    config: WirelessConfig,
    outgoing_queue: VecDeque<WirelessMessage>,
    transmitting: Option<MessageId>,
    start_pending: bool,
    receptions: Vec<Reception>,
    collision_occuring: bool,
    channel_available: bool,
}

impl WirelessNetworkInterface {
    pub fn new(id: InterfaceId, host: BlockId, rate: Rate, config: WirelessConfig) -> Self {
        Self {
            core: InterfaceCore::new(id, 0, host, rate),
            config,
            outgoing_queue: VecDeque::new(),
            transmitting: None,
            start_pending: false,
            receptions: Vec::new(),
            collision_occuring: false,
            channel_available: true,
        }
    }

    pub fn id(&self) -> InterfaceId {
        self.core.id()
    }

    pub fn host(&self) -> BlockId {
        self.core.host()
    }

    pub fn config(&self) -> &WirelessConfig {
        &self.config
    }

    pub fn availability_date(&self) -> VirtualTime {
        self.core.availability_date()
    }

    pub fn set_data_rate(&mut self, rate: Rate) {
        self.core.set_data_rate(rate);
    }

    pub fn set_power(&mut self, dbm: f64) {
        self.config.transmit_power_dbm = dbm;
    }

    pub fn is_transmitting(&self) -> bool {
        self.transmitting.is_some()
    }

    pub fn is_receiving(&self) -> bool {
        !self.receptions.is_empty()
    }

    pub fn collision_occuring(&self) -> bool {
        self.collision_occuring
    }

    /// Whether the channel is free of incoming signals.
    pub fn get_availability(&self) -> bool {
        self.channel_available
    }

    pub fn set_availability(&mut self, available: bool) {
        self.channel_available = available;
    }

    /// Id of the earliest signal still arriving.
    pub fn message_being_received(&self) -> Option<MessageId> {
        self.receptions.first().map(|r| r.message.id())
    }

    pub fn receptions(&self) -> &[Reception] {
        &self.receptions
    }

    pub fn outgoing_len(&self) -> usize {
        self.outgoing_queue.len()
    }

    pub fn transmission_duration(&mut self, message: &WirelessMessage) -> u64 {
        self.core.transmission_duration(message.size())
    }

    /// Queue `message` for broadcast, as of now.
    pub fn send(&self, message: WirelessMessage, sched: &mut dyn EventScheduler) -> bool {
        let now = sched.now();
        sched.schedule(
            now,
            EventKind::WirelessEnqueueOutgoing {
                interface: self.id(),
                message,
            },
        );
        true
    }

    /// Append `message` to the outgoing queue. The buffer is unbounded, so
    /// this always succeeds.
    pub fn add_to_outgoing_buffer(
        &mut self,
        message: WirelessMessage,
        sched: &mut dyn EventScheduler,
    ) -> bool {
        trace!(interface = %self.id(), message = %message.id(), "wireless enqueue");
        self.outgoing_queue.push_back(message);

        let now = sched.now();
        self.core.advance_availability(now);
        if self.outgoing_queue.len() == 1 && self.transmitting.is_none() && !self.start_pending {
            self.start_pending = true;
            let at = self.core.availability_date();
            sched.schedule(
                at,
                EventKind::WirelessStartTransmitting {
                    interface: self.id(),
                },
            );
        }
        true
    }

    /// Put the head of the queue on the air.
    ///
    /// Returns the message and its airtime; the caller fans it out to the
    /// other radios.
    ///
    /// # Panics
    ///
    /// Panics if the outgoing queue is empty.
    pub fn start_transmitting(
        &mut self,
        stats: &mut BlockStats,
        net: &mut NetworkStats,
        sched: &mut dyn EventScheduler,
    ) -> (WirelessMessage, u64) {
        self.start_pending = false;

        let Some(mut message) = self.outgoing_queue.pop_front() else {
            error!(
                block = %self.host(),
                interface = %self.id(),
                "wireless start transmitting with an empty outgoing queue"
            );
            panic!("wireless interface {} started transmitting with an empty queue", self.id());
        };
        message.source = Some(self.id());

        let now = sched.now();
        let airtime = self.transmission_duration(&message);
        let end = now.plus(airtime);
        self.core.advance_availability(end);
        self.transmitting = Some(message.id());

        // Half-duplex: our own signal drowns everything we were hearing.
        let mut destroyed = 0;
        for reception in self.receptions.iter_mut().filter(|r| !r.corrupted) {
            reception.corrupted = true;
            destroyed += 1;
        }
        self.refresh_collision_flag();

        debug!(
            interface = %self.id(),
            message = %message.id(),
            airtime,
            destroyed,
            "wireless start transmitting"
        );

        sched.schedule(
            end,
            EventKind::WirelessStopTransmitting {
                interface: self.id(),
            },
        );
        stats.inc_wireless_sent_count();
        net.wireless_sent += 1;

        (message, airtime)
    }

    /// The broadcast has ended. Starts the next one if the queue is not
    /// empty, returning it for fan-out.
    pub fn stop_transmitting(
        &mut self,
        stats: &mut BlockStats,
        net: &mut NetworkStats,
        sched: &mut dyn EventScheduler,
    ) -> Option<(WirelessMessage, u64)> {
        if self.transmitting.take().is_none() {
            error!(interface = %self.id(), "wireless stop transmitting with nothing on the air");
            panic!("wireless interface {} stopped transmitting with nothing on the air", self.id());
        }
        trace!(interface = %self.id(), "wireless stop transmitting");

        if self.outgoing_queue.is_empty() {
            None
        } else {
            Some(self.start_transmitting(stats, net, sched))
        }
    }

    /// A signal starts arriving.
    ///
    /// Signals below the reception sensitivity are not sensed at all and
    /// are dropped here. Returns whether the signal was sensed.
    pub fn start_receive(
        &mut self,
        message: WirelessMessage,
        power_dbm: f64,
        airtime: u64,
        net: &mut NetworkStats,
        sched: &mut dyn EventScheduler,
    ) -> bool {
        if power_dbm < self.config.reception_sensitivity_dbm {
            trace!(
                interface = %self.id(),
                message = %message.id(),
                power_dbm,
                "signal below sensitivity"
            );
            net.wireless_below_sensitivity += 1;
            return false;
        }
        net.wireless_receptions += 1;

        let capture = self.config.capture_threshold_db;
        let mut corrupted = self.is_transmitting() || self.collision_occuring;
        for other in &mut self.receptions {
            if power_dbm < other.power_dbm + capture {
                corrupted = true;
            }
            if other.power_dbm < power_dbm + capture {
                other.corrupted = true;
            }
        }

        let now = sched.now();
        let end = now.plus(airtime);
        let id = message.id();
        debug!(
            interface = %self.id(),
            message = %id,
            power_dbm,
            corrupted,
            overlapping = self.receptions.len(),
            "start receive"
        );

        self.receptions.push(Reception {
            message,
            power_dbm,
            end,
            corrupted,
        });
        self.channel_available = false;
        self.refresh_collision_flag();

        sched.schedule(
            end,
            EventKind::WirelessStopReceive {
                interface: self.id(),
                message: id,
            },
        );
        true
    }

    /// The signal carrying `message` has fully arrived.
    pub fn stop_receive(
        &mut self,
        message: MessageId,
        stats: &mut BlockStats,
        net: &mut NetworkStats,
    ) -> ReceptionOutcome {
        let Some(index) = self.receptions.iter().position(|r| r.message.id() == message) else {
            return ReceptionOutcome::Unknown;
        };
        let reception = self.receptions.remove(index);

        if self.receptions.is_empty() {
            self.channel_available = true;
        }
        self.refresh_collision_flag();

        let outcome = if reception.corrupted {
            net.wireless_collisions += 1;
            ReceptionOutcome::Collided
        } else if reception.power_dbm < self.config.reception_threshold_dbm {
            net.wireless_below_threshold += 1;
            ReceptionOutcome::BelowThreshold
        } else if !reception.message.is_addressed_to(self.host()) {
            net.wireless_not_addressed += 1;
            ReceptionOutcome::NotAddressed
        } else {
            net.wireless_delivered += 1;
            stats.inc_wireless_received_count();
            ReceptionOutcome::Delivered {
                message: reception.message,
                power_dbm: reception.power_dbm,
            }
        };

        if !outcome.is_delivered() {
            debug!(
                interface = %self.id(),
                message = %message,
                power_dbm = reception.power_dbm,
                ?outcome,
                "wireless message dropped"
            );
        }
        outcome
    }

    /// The medium is garbled when every signal still arriving is lost.
    fn refresh_collision_flag(&mut self) {
        self.collision_occuring =
            !self.receptions.is_empty() && self.receptions.iter().all(|r| r.corrupted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingScheduler;
    use blocksim_messages::Payload;

    fn radio(host: u32) -> WirelessNetworkInterface {
        WirelessNetworkInterface::new(
            InterfaceId(host),
            BlockId(host),
            Rate::default(),
            WirelessConfig::default(),
        )
    }

    fn beacon() -> WirelessMessage {
        WirelessMessage::broadcast(1, Payload::Empty)
    }

    struct Sinks {
        stats: BlockStats,
        net: NetworkStats,
    }

    fn sinks() -> Sinks {
        Sinks {
            stats: BlockStats::default(),
            net: NetworkStats::default(),
        }
    }

    #[test]
    fn test_enqueue_schedules_single_start() {
        let mut iface = radio(0);
        let mut sched = RecordingScheduler::at(3);
        iface.add_to_outgoing_buffer(beacon(), &mut sched);
        iface.add_to_outgoing_buffer(beacon(), &mut sched);
        assert_eq!(sched.names(), vec![(3, "WirelessStartTransmitting")]);
    }

    #[test]
    fn test_transmit_pipeline() {
        let mut iface = radio(0);
        let mut s = sinks();
        let mut sched = RecordingScheduler::at(0);
        iface.add_to_outgoing_buffer(beacon(), &mut sched);
        iface.add_to_outgoing_buffer(beacon().with_size(8), &mut sched);
        sched.take();

        let (message, airtime) = iface.start_transmitting(&mut s.stats, &mut s.net, &mut sched);
        assert_eq!(airtime, 32);
        assert_eq!(message.source, Some(iface.id()));
        assert!(iface.is_transmitting());
        assert_eq!(sched.names(), vec![(32, "WirelessStopTransmitting")]);
        sched.take();

        sched.now = VirtualTime::from_micros(32);
        let next = iface.stop_transmitting(&mut s.stats, &mut s.net, &mut sched);
        assert_eq!(next.map(|(_, airtime)| airtime), Some(64));
        assert_eq!(s.net.wireless_sent, 2);

        sched.now = VirtualTime::from_micros(96);
        assert!(iface.stop_transmitting(&mut s.stats, &mut s.net, &mut sched).is_none());
        assert!(!iface.is_transmitting());
    }

    #[test]
    fn test_below_sensitivity_is_ignored() {
        let mut iface = radio(1);
        let mut s = sinks();
        let mut sched = RecordingScheduler::at(0);
        assert!(!iface.start_receive(beacon(), -60.0, 32, &mut s.net, &mut sched));
        assert!(sched.events.is_empty());
        assert!(iface.get_availability());
        assert_eq!(s.net.wireless_below_sensitivity, 1);
    }

    #[test]
    fn test_clean_reception_is_delivered() {
        let mut iface = radio(1);
        let mut s = sinks();
        let mut sched = RecordingScheduler::at(0);
        let msg = beacon();
        let id = msg.id();

        assert!(iface.start_receive(msg, -40.0, 32, &mut s.net, &mut sched));
        assert!(iface.is_receiving());
        assert!(!iface.get_availability());
        assert_eq!(iface.message_being_received(), Some(id));
        assert_eq!(sched.names(), vec![(32, "WirelessStopReceive")]);

        let outcome = iface.stop_receive(id, &mut s.stats, &mut s.net);
        assert!(outcome.is_delivered());
        assert!(iface.get_availability());
        assert_eq!(s.stats.wireless_received, 1);
    }

    #[test]
    fn test_weak_signal_is_sensed_but_not_decoded() {
        let mut iface = radio(1);
        let mut s = sinks();
        let mut sched = RecordingScheduler::at(0);
        let msg = beacon();
        let id = msg.id();
        iface.start_receive(msg, -48.0, 32, &mut s.net, &mut sched);
        assert!(matches!(
            iface.stop_receive(id, &mut s.stats, &mut s.net),
            ReceptionOutcome::BelowThreshold
        ));
    }

    #[test]
    fn test_equal_overlapping_signals_both_collide() {
        let mut iface = radio(1);
        let mut s = sinks();
        let mut sched = RecordingScheduler::at(0);
        let (a, b) = (beacon(), beacon());
        let (ida, idb) = (a.id(), b.id());

        iface.start_receive(a, -40.0, 100, &mut s.net, &mut sched);
        sched.now = VirtualTime::from_micros(5);
        iface.start_receive(b, -40.0, 32, &mut s.net, &mut sched);
        assert!(iface.collision_occuring());

        assert!(matches!(
            iface.stop_receive(idb, &mut s.stats, &mut s.net),
            ReceptionOutcome::Collided
        ));
        assert!(iface.collision_occuring());
        assert!(matches!(
            iface.stop_receive(ida, &mut s.stats, &mut s.net),
            ReceptionOutcome::Collided
        ));
        assert!(!iface.collision_occuring());
        assert_eq!(s.net.wireless_collisions, 2);
    }

    #[test]
    fn test_capture_keeps_flag_down_while_decoding() {
        let mut iface = radio(1);
        let mut s = sinks();
        let mut sched = RecordingScheduler::at(0);
        let (weak, strong) = (beacon(), beacon());
        let (idw, ids) = (weak.id(), strong.id());

        iface.start_receive(weak, -49.0, 100, &mut s.net, &mut sched);
        assert!(!iface.collision_occuring());

        // 19 dB stronger: captures the channel, the weak signal is lost.
        sched.now = VirtualTime::from_micros(10);
        iface.start_receive(strong, -30.0, 32, &mut s.net, &mut sched);
        assert!(!iface.collision_occuring());

        sched.now = VirtualTime::from_micros(42);
        assert!(iface.stop_receive(ids, &mut s.stats, &mut s.net).is_delivered());

        // Only the garbled weak signal is left: nothing decodes until quiet.
        assert!(iface.collision_occuring());
        let late = beacon();
        let late_id = late.id();
        iface.start_receive(late, -20.0, 8, &mut s.net, &mut sched);
        assert!(iface.collision_occuring());
        sched.now = VirtualTime::from_micros(50);
        assert!(matches!(
            iface.stop_receive(late_id, &mut s.stats, &mut s.net),
            ReceptionOutcome::Collided
        ));

        sched.now = VirtualTime::from_micros(100);
        assert!(matches!(
            iface.stop_receive(idw, &mut s.stats, &mut s.net),
            ReceptionOutcome::Collided
        ));
        assert!(!iface.collision_occuring());
        assert_eq!(s.net.wireless_delivered, 1);
        assert_eq!(s.net.wireless_collisions, 2);
    }

    #[test]
    fn test_no_decode_while_flag_is_up() {
        let mut iface = radio(1);
        let mut s = sinks();
        let mut sched = RecordingScheduler::at(0);
        let powers = [-49.0, -30.0, -41.0, -12.0, -45.0, -35.0];
        let mut flagged = Vec::new();
        let mut ids = Vec::new();

        for (i, power) in powers.into_iter().enumerate() {
            sched.now = VirtualTime::from_micros(i as u64 * 5);
            let msg = beacon();
            ids.push(msg.id());
            iface.start_receive(msg, power, 40, &mut s.net, &mut sched);
            flagged.push(iface.collision_occuring());
        }

        // A reception whose arrival found or left the medium garbled is never
        // decoded.
        for (id, was_flagged) in ids.into_iter().zip(flagged) {
            let outcome = iface.stop_receive(id, &mut s.stats, &mut s.net);
            if was_flagged {
                assert!(!outcome.is_delivered());
            }
        }
        assert!(!iface.collision_occuring());
    }

    #[test]
    fn test_no_decode_after_collision_until_quiet() {
        let mut iface = radio(1);
        let mut s = sinks();
        let mut sched = RecordingScheduler::at(0);
        let (a, b, late) = (beacon(), beacon(), beacon());
        let late_id = late.id();

        iface.start_receive(a, -40.0, 100, &mut s.net, &mut sched);
        iface.start_receive(b, -40.0, 100, &mut s.net, &mut sched);
        // Far stronger, but the medium is already garbled.
        iface.start_receive(late, -10.0, 10, &mut s.net, &mut sched);
        assert!(matches!(
            iface.stop_receive(late_id, &mut s.stats, &mut s.net),
            ReceptionOutcome::Collided
        ));
    }

    #[test]
    fn test_transmitting_destroys_receptions() {
        let mut iface = radio(1);
        let mut s = sinks();
        let mut sched = RecordingScheduler::at(0);
        let incoming = beacon();
        let id = incoming.id();

        iface.start_receive(incoming, -40.0, 100, &mut s.net, &mut sched);
        iface.add_to_outgoing_buffer(beacon(), &mut sched);
        iface.start_transmitting(&mut s.stats, &mut s.net, &mut sched);

        assert!(matches!(
            iface.stop_receive(id, &mut s.stats, &mut s.net),
            ReceptionOutcome::Collided
        ));

        // Nothing is decoded while on the air either.
        let during = beacon();
        let during_id = during.id();
        iface.start_receive(during, -20.0, 5, &mut s.net, &mut sched);
        assert!(matches!(
            iface.stop_receive(during_id, &mut s.stats, &mut s.net),
            ReceptionOutcome::Collided
        ));
    }

    #[test]
    fn test_addressed_elsewhere() {
        let mut iface = radio(1);
        let mut s = sinks();
        let mut sched = RecordingScheduler::at(0);
        let msg = WirelessMessage::to_block(1, Payload::Empty, BlockId(7));
        let id = msg.id();
        iface.start_receive(msg, -40.0, 32, &mut s.net, &mut sched);
        assert!(matches!(
            iface.stop_receive(id, &mut s.stats, &mut s.net),
            ReceptionOutcome::NotAddressed
        ));
        assert!(matches!(
            iface.stop_receive(id, &mut s.stats, &mut s.net),
            ReceptionOutcome::Unknown
        ));
    }
}
