//! Virtual time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Number of virtual time units per second.
pub const MICROS_PER_SEC: u64 = 1_000_000;

/// A point on the simulation clock, in virtual microseconds.
///
/// Only the scheduler thread advances the clock; everything else reads it.
/// Time is unrelated to wall-clock time except in real-time mode, where the
/// scheduler paces itself against [`VirtualTime::as_duration`].
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct VirtualTime(u64);

impl VirtualTime {
    /// The start of every simulation.
    pub const ZERO: VirtualTime = VirtualTime(0);

    /// The end of time. Used as an "unbounded" date.
    pub const MAX: VirtualTime = VirtualTime(u64::MAX);

    /// Create a time from a raw microsecond count.
    #[inline]
    pub const fn from_micros(micros: u64) -> Self {
        VirtualTime(micros)
    }

    /// Create a time from whole seconds.
    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        VirtualTime(secs.saturating_mul(MICROS_PER_SEC))
    }

    /// Raw microsecond count.
    #[inline]
    pub const fn as_micros(self) -> u64 {
        self.0
    }

    /// The time `micros` after `self`. Saturates at [`VirtualTime::MAX`].
    #[inline]
    pub const fn plus(self, micros: u64) -> Self {
        VirtualTime(self.0.saturating_add(micros))
    }

    /// Microseconds elapsed since `earlier`, or `None` if `earlier` is later.
    #[inline]
    pub fn since(self, earlier: VirtualTime) -> Option<u64> {
        self.0.checked_sub(earlier.0)
    }

    /// Convert to a wall-clock duration (1 virtual µs = 1 µs).
    #[inline]
    pub fn as_duration(self) -> Duration {
        Duration::from_micros(self.0)
    }
}

impl fmt::Display for VirtualTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T={}us", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        let t1 = VirtualTime::from_micros(10);
        let t2 = VirtualTime::from_micros(20);
        assert!(t1 < t2);
        assert_eq!(t1.max(t2), t2);
    }

    #[test]
    fn test_plus_saturates() {
        assert_eq!(VirtualTime::from_micros(5).plus(7).as_micros(), 12);
        assert_eq!(VirtualTime::MAX.plus(1), VirtualTime::MAX);
    }

    #[test]
    fn test_since() {
        let a = VirtualTime::from_micros(10);
        let b = VirtualTime::from_micros(32);
        assert_eq!(b.since(a), Some(22));
        assert_eq!(a.since(b), None);
    }

    #[test]
    fn test_from_secs() {
        assert_eq!(VirtualTime::from_secs(2).as_micros(), 2_000_000);
        assert_eq!(
            VirtualTime::from_secs(1).as_duration(),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(VirtualTime::from_micros(42).to_string(), "T=42us");
    }
}
