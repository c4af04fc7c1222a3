//! Conversions between OpenPGP's wire timestamps and `SystemTime`.

use std::time::SystemTime;

use crate::types::Timestamp;

/// Converts a time value to its OpenPGP wire representation.
pub(crate) trait Time {
    /// Returns the number of seconds since the Unix epoch, or `None`
    /// if the value predates the epoch or overflows a 32-bit count.
    fn to_pgp(&self) -> Option<u32>;
}

impl Time for SystemTime {
    fn to_pgp(&self) -> Option<u32> {
        Timestamp::try_from(*self).ok().map(u32::from)
    }
}

impl Time for Option<SystemTime> {
    fn to_pgp(&self) -> Option<u32> {
        self.as_ref().and_then(Time::to_pgp)
    }
}

impl Time for Timestamp {
    fn to_pgp(&self) -> Option<u32> {
        Some(u32::from(*self))
    }
}
