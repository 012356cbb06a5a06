//! Offset and delay estimation from one request/response exchange.

/// The four timestamps of one completed exchange plus the derived
/// offset and round-trip delay. Immutable once computed.
///
/// All values are signed nanoseconds since the Unix epoch (timestamps)
/// or signed nanosecond durations (derived values). Offsets are signed
/// throughout and never clamped: a negative offset means the local clock
/// is ahead of the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeSample {
    /// T1: local clock when the request was sent.
    pub local_send_ns: i64,
    /// T2: remote clock when the request arrived.
    pub remote_recv_ns: i64,
    /// T3: remote clock when the response left.
    pub remote_send_ns: i64,
    /// T4: local clock when the response was read.
    pub local_recv_ns: i64,
    /// Estimated clock offset: positive means the reference clock is
    /// ahead of the local clock.
    pub offset_ns: i64,
    /// Round-trip network delay, excluding server processing time.
    pub delay_ns: i64,
}

impl ExchangeSample {
    /// Derive offset and delay from the four raw timestamps.
    ///
    /// offset = ((T2 - T1) + (T3 - T4)) / 2
    /// delay  = (T4 - T1) - (T3 - T2)
    ///
    /// Differences are computed in 128-bit arithmetic so pathological
    /// clock disagreements cannot overflow; the halved offset truncates
    /// toward zero.
    #[must_use]
    pub fn calculate(t1: i64, t2: i64, t3: i64, t4: i64) -> Self {
        let offset = (i128::from(t2) - i128::from(t1) + (i128::from(t3) - i128::from(t4))) / 2;
        let delay = (i128::from(t4) - i128::from(t1)) - (i128::from(t3) - i128::from(t2));
        Self {
            local_send_ns: t1,
            remote_recv_ns: t2,
            remote_send_ns: t3,
            local_recv_ns: t4,
            offset_ns: i64::try_from(offset).unwrap_or(if offset < 0 { i64::MIN } else { i64::MAX }),
            delay_ns: i64::try_from(delay).unwrap_or(if delay < 0 { i64::MIN } else { i64::MAX }),
        }
    }

    /// The offset error bound implied by this sample's delay.
    ///
    /// For a symmetric path the true offset lies within ± delay/2 of the
    /// estimate, so delay is an inverse proxy for trustworthiness.
    #[must_use]
    pub fn error_bound_ns(&self) -> i64 {
        self.delay_ns.abs() / 2
    }
}
