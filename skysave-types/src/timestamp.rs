//! Tick-based timestamps compatible with the stored wire format.
//!
//! Stored data encodes instants the way .NET's `DateTime.ToBinary` does:
//! 62 bits of ticks (100-nanosecond intervals since 0001-01-01T00:00:00)
//! with the kind packed into the top two bits. Existing snapshots contain
//! both Unspecified instants (the fixed creation sentinel) and Utc instants
//! (every real write), so both the packing and the kind-insensitive
//! ordering must be preserved exactly.

use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Ticks between 0001-01-01T00:00:00 and the Unix epoch.
const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// Ticks per second (1 tick = 100 ns).
const TICKS_PER_SECOND: i64 = 10_000_000;

const TICKS_MASK: u64 = 0x3FFF_FFFF_FFFF_FFFF;
const KIND_SHIFT: u32 = 62;

/// The kind flags carried in the top two bits of the binary encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeKind {
    Unspecified,
    Utc,
    Local,
}

impl TimeKind {
    const fn to_bits(self) -> u64 {
        match self {
            TimeKind::Unspecified => 0,
            TimeKind::Utc => 1,
            TimeKind::Local => 2,
        }
    }

    const fn from_bits(bits: u64) -> Self {
        match bits {
            0 => TimeKind::Unspecified,
            1 => TimeKind::Utc,
            // 0b11 is the ambiguous-DST variant of Local
            _ => TimeKind::Local,
        }
    }
}

/// An instant in tick resolution.
///
/// Ordering and equality compare ticks only; the kind participates in the
/// binary encoding but never in comparisons, matching how the stored data's
/// writers compared instants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Timestamp {
    ticks: i64,
    kind: TimeKind,
}

impl Timestamp {
    /// Creates a timestamp from raw ticks and a kind.
    #[must_use]
    pub const fn from_ticks(ticks: i64, kind: TimeKind) -> Self {
        Self { ticks, kind }
    }

    /// The current UTC instant.
    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Converts a UTC wall-clock instant.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        let secs = dt.timestamp();
        let sub_ticks = i64::from(dt.timestamp_subsec_nanos()) / 100;
        Self {
            ticks: UNIX_EPOCH_TICKS + secs * TICKS_PER_SECOND + sub_ticks,
            kind: TimeKind::Utc,
        }
    }

    /// Converts back to a UTC wall-clock instant.
    ///
    /// Fails for instants outside the representable chrono range.
    pub fn to_datetime(self) -> Result<DateTime<Utc>, Error> {
        let unix_ticks = self.ticks - UNIX_EPOCH_TICKS;
        let secs = unix_ticks.div_euclid(TICKS_PER_SECOND);
        let nanos = (unix_ticks.rem_euclid(TICKS_PER_SECOND) * 100) as u32;
        DateTime::from_timestamp(secs, nanos).ok_or(Error::TimestampRange(self.ticks))
    }

    /// Returns the tick count.
    #[must_use]
    pub const fn ticks(&self) -> i64 {
        self.ticks
    }

    /// Returns the kind flags.
    #[must_use]
    pub const fn kind(&self) -> TimeKind {
        self.kind
    }

    /// Packs ticks and kind into the binary wire form.
    #[must_use]
    pub const fn to_binary(self) -> i64 {
        ((self.ticks as u64 & TICKS_MASK) | (self.kind.to_bits() << KIND_SHIFT)) as i64
    }

    /// Unpacks the binary wire form.
    #[must_use]
    pub const fn from_binary(binary: i64) -> Self {
        let raw = binary as u64;
        Self {
            ticks: (raw & TICKS_MASK) as i64,
            kind: TimeKind::from_bits(raw >> KIND_SHIFT),
        }
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.ticks == other.ticks
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ticks.cmp(&other.ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utc_binary_sets_kind_bit() {
        let ts = Timestamp::from_ticks(635_396_832_000_000_000, TimeKind::Utc);
        assert_eq!(ts.to_binary(), 635_396_832_000_000_000 | (1 << 62));
    }

    #[test]
    fn unspecified_binary_is_plain_ticks() {
        let ts = Timestamp::from_ticks(635_396_832_000_000_000, TimeKind::Unspecified);
        assert_eq!(ts.to_binary(), 635_396_832_000_000_000);
    }

    #[test]
    fn binary_round_trip() {
        for kind in [TimeKind::Unspecified, TimeKind::Utc, TimeKind::Local] {
            let ts = Timestamp::from_ticks(636_000_000_123_456_789, kind);
            let back = Timestamp::from_binary(ts.to_binary());
            assert_eq!(back.ticks(), ts.ticks());
            assert_eq!(back.kind(), kind);
        }
    }

    #[test]
    fn ordering_ignores_kind() {
        let a = Timestamp::from_ticks(100, TimeKind::Unspecified);
        let b = Timestamp::from_ticks(100, TimeKind::Utc);
        let c = Timestamp::from_ticks(101, TimeKind::Unspecified);
        assert_eq!(a, b);
        assert!(c > b);
    }

    #[test]
    fn utc_binaries_order_chronologically() {
        // Numeric i64 comparison of two Utc binaries must equal tick order.
        let early = Timestamp::from_ticks(635_000_000_000_000_000, TimeKind::Utc);
        let late = Timestamp::from_ticks(636_000_000_000_000_000, TimeKind::Utc);
        assert!(late.to_binary() > early.to_binary());
    }

    #[test]
    fn datetime_round_trip() {
        let now = Utc::now();
        let ts = Timestamp::from_datetime(now);
        let back = ts.to_datetime().unwrap();
        // Tick resolution is 100 ns, so sub-tick precision is dropped.
        assert_eq!(back.timestamp(), now.timestamp());
        assert_eq!(
            back.timestamp_subsec_nanos() / 100,
            now.timestamp_subsec_nanos() / 100
        );
    }

    #[test]
    fn known_instant_ticks() {
        // 2014-06-30T00:00:00Z
        let dt = DateTime::from_timestamp(1_404_086_400, 0).unwrap();
        assert_eq!(Timestamp::from_datetime(dt).ticks(), 635_396_832_000_000_000);
    }
}
