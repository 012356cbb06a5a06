//! Deterministic in-memory transport for testing.
//!
//! [`MockTransport`] stands in for the UDP transport so the sampler and
//! engine can be exercised without a network: each call pops a scripted
//! outcome and, for successes, fabricates a symmetric exchange around
//! the real local clock with the requested offset and round-trip delay.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{NetClockError, Result};
use crate::sntp::exchange::ExchangeSample;
use crate::sntp::timestamp::unix_now_nanos;
use crate::transport::TimeExchange;

/// Scripted result of one mock exchange.
#[derive(Debug, Clone, Copy)]
pub enum MockOutcome {
    /// The exchange succeeds with this true offset and round-trip delay.
    Success {
        /// Reference-minus-local clock offset in nanoseconds.
        offset_ns: i64,
        /// Round-trip delay in nanoseconds (use even values for exact
        /// offset recovery; an odd delay truncates half a nanosecond).
        delay_ns: i64,
    },
    /// The exchange fails with a transient timeout.
    Failure,
}

/// In-memory [`TimeExchange`] with scripted outcomes and a call counter.
#[derive(Debug)]
pub struct MockTransport {
    /// Remaining scripted outcomes, consumed front to back.
    script: Mutex<VecDeque<MockOutcome>>,
    /// Outcome used once the script is exhausted.
    fallback: MockOutcome,
    /// Tokio-clock latency each exchange takes before resolving.
    latency: Duration,
    /// Total number of `exchange` calls, including failures.
    calls: AtomicUsize,
}

impl MockTransport {
    /// A transport where every exchange succeeds with the same offset
    /// and delay.
    #[must_use]
    pub fn with_fixed(offset_ns: i64, delay_ns: i64) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: MockOutcome::Success {
                offset_ns,
                delay_ns,
            },
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// A transport that plays the given outcomes in order, then fails
    /// every further exchange.
    #[must_use]
    pub fn scripted(outcomes: Vec<MockOutcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into()),
            fallback: MockOutcome::Failure,
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Make every exchange take `latency` on the tokio clock before it
    /// resolves. Combined with a paused runtime this lets tests hold a
    /// sampling cycle in flight at a precise virtual instant.
    #[must_use]
    pub fn with_exchange_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of exchanges attempted so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_outcome(&self) -> MockOutcome {
        let mut script = match self.script.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        script.pop_front().unwrap_or(self.fallback)
    }
}

#[async_trait]
impl TimeExchange for MockTransport {
    async fn exchange(&self) -> Result<ExchangeSample> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match self.next_outcome() {
            MockOutcome::Success {
                offset_ns,
                delay_ns,
            } => {
                // Symmetric path, zero server processing time.
                let t1 = unix_now_nanos();
                let t2 = t1 + delay_ns / 2 + offset_ns;
                let t3 = t2;
                let t4 = t1 + delay_ns;
                Ok(ExchangeSample::calculate(t1, t2, t3, t4))
            }
            MockOutcome::Failure => Err(NetClockError::Timeout {
                timeout: Duration::ZERO,
            }),
        }
    }
}
