//! NTP timestamp representation and conversions.
//!
//! NTP timestamps are 64-bit fixed point: upper 32 bits are seconds since
//! the wire epoch (1900-01-01), lower 32 bits are the fractional second in
//! 1/2^32 units (~233 ps per LSB). Internally the crate works in signed
//! nanoseconds since the Unix epoch (1970-01-01); this module converts
//! between the two, rounding to nearest in both directions so that a
//! round trip through the wire format is exact at nanosecond resolution.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Seconds between the wire epoch (1900-01-01) and the Unix epoch
/// (1970-01-01).
pub const NTP_UNIX_OFFSET_SECS: i64 = 2_208_988_800;

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// NTP 64-bit fixed-point timestamp: 32-bit seconds + 32-bit fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NtpTimestamp {
    /// Seconds since the wire epoch (1900-01-01), modulo 2^32.
    pub seconds: u32,
    /// Fractional second in 1/2^32 units.
    pub fraction: u32,
}

impl NtpTimestamp {
    /// Encoded size in bytes.
    pub const SIZE: usize = 8;

    /// Zero timestamp ("unknown" on the wire).
    pub const ZERO: Self = Self {
        seconds: 0,
        fraction: 0,
    };

    /// Create a new timestamp from raw wire fields.
    #[must_use]
    pub fn new(seconds: u32, fraction: u32) -> Self {
        Self { seconds, fraction }
    }

    /// Create a timestamp from the current system time.
    #[must_use]
    pub fn now() -> Self {
        Self::from_unix_nanos(unix_now_nanos())
    }

    /// Convert to signed nanoseconds since the Unix epoch.
    ///
    /// The 32-bit seconds field wraps in 2036 (end of NTP era 0). Wire
    /// values below the 1900→1970 offset are interpreted as era 1, so
    /// conversion is unambiguous for dates between 1970 and 2106.
    /// The fraction is rounded to the nearest nanosecond.
    #[must_use]
    pub fn to_unix_nanos(self) -> i64 {
        let unix_secs = if i64::from(self.seconds) >= NTP_UNIX_OFFSET_SECS {
            i64::from(self.seconds) - NTP_UNIX_OFFSET_SECS
        } else {
            // Era 1: seconds wrapped past 2^32 (dates after Feb 2036).
            i64::from(self.seconds) + (1i64 << 32) - NTP_UNIX_OFFSET_SECS
        };
        // round(fraction * 1e9 / 2^32); fits in u64.
        let frac_nanos = (u64::from(self.fraction) * 1_000_000_000 + (1 << 31)) >> 32;
        unix_secs * NANOS_PER_SEC + i64::try_from(frac_nanos).unwrap_or(NANOS_PER_SEC - 1)
    }

    /// Create from signed nanoseconds since the Unix epoch.
    ///
    /// The sub-second part is rounded to the nearest 1/2^32 fraction.
    /// Seconds are encoded modulo 2^32, matching the era folding in
    /// [`Self::to_unix_nanos`].
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "Seconds are reduced modulo 2^32 by construction and the \
                  fraction fits in 32 bits by the fixed-point format"
    )]
    pub fn from_unix_nanos(nanos: i64) -> Self {
        let secs = nanos.div_euclid(NANOS_PER_SEC);
        let rem = nanos.rem_euclid(NANOS_PER_SEC) as u64;
        let seconds = (secs + NTP_UNIX_OFFSET_SECS).rem_euclid(1i64 << 32) as u32;
        // round(rem * 2^32 / 1e9); numerator peaks below 2^63.
        let fraction = ((rem << 32) + 500_000_000) / 1_000_000_000;
        Self {
            seconds,
            fraction: fraction as u32,
        }
    }

    /// Encode as 8 bytes: 4-byte seconds (BE) + 4-byte fraction (BE).
    #[must_use]
    pub fn encode(self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&self.seconds.to_be_bytes());
        buf[4..8].copy_from_slice(&self.fraction.to_be_bytes());
        buf
    }

    /// Decode from 8 bytes.
    ///
    /// Returns `None` if the slice is too short.
    #[must_use]
    pub fn decode(data: &[u8]) -> Option<Self> {
        if data.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            seconds: u32::from_be_bytes([data[0], data[1], data[2], data[3]]),
            fraction: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
        })
    }
}

impl std::fmt::Display for NtpTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:010}", self.seconds, self.fraction)
    }
}

/// Current system time as signed nanoseconds since the Unix epoch.
#[must_use]
pub fn unix_now_nanos() -> i64 {
    let dur = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO);
    i64::try_from(dur.as_nanos()).unwrap_or(i64::MAX)
}
