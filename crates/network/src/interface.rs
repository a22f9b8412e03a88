//! State shared by every interface kind.

use crate::rate::Rate;
use blocksim_types::{BlockId, InterfaceId, VirtualTime};

/// Identity, data rate and availability clock of an interface.
#[derive(Debug, Clone)]
pub struct InterfaceCore {
    id: InterfaceId,
    local_id: usize,
    host: BlockId,
    rate: Rate,
    availability_date: VirtualTime,
}

impl InterfaceCore {
    pub fn new(id: InterfaceId, local_id: usize, host: BlockId, rate: Rate) -> Self {
        Self {
            id,
            local_id,
            host,
            rate,
            availability_date: VirtualTime::ZERO,
        }
    }

    /// Global id, unique among interfaces of the same kind.
    pub fn id(&self) -> InterfaceId {
        self.id
    }

    /// Index of this interface within its host block.
    pub fn local_id(&self) -> usize {
        self.local_id
    }

    pub fn host(&self) -> BlockId {
        self.host
    }

    /// Earliest date at which the interface can start a new transmission.
    pub fn availability_date(&self) -> VirtualTime {
        self.availability_date
    }

    /// Move the availability date forward to `date`. Never moves it back.
    pub fn advance_availability(&mut self, date: VirtualTime) {
        if date > self.availability_date {
            self.availability_date = date;
        }
    }

    pub fn set_data_rate(&mut self, rate: Rate) {
        self.rate = rate;
    }

    /// Virtual microseconds needed to push `size` bytes at the current rate.
    pub fn transmission_duration(&mut self, size: u32) -> u64 {
        self.rate.transmission_duration(size)
    }
}
