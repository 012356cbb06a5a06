//! Multi-exchange sampling with best-sample selection.
//!
//! One exchange is a noisy measurement: queueing on either path inflates
//! the apparent delay and skews the offset. Repeating the exchange a few
//! times with spacing between attempts and keeping the minimum-delay
//! sample gives the tightest offset bound the network will allow.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{NetClockError, Result};
use crate::sntp::exchange::ExchangeSample;
use crate::transport::TimeExchange;

/// Repeats timing exchanges and selects the most trustworthy sample.
#[derive(Clone)]
pub struct Sampler {
    /// The transport used for each exchange.
    transport: Arc<dyn TimeExchange>,
    /// Exchanges attempted per sampling cycle.
    attempts: u32,
    /// Pause between consecutive attempts, to avoid bursting the server
    /// and to decorrelate the samples.
    spacing: Duration,
}

impl Sampler {
    /// Create a sampler over the given transport.
    #[must_use]
    pub fn new(transport: Arc<dyn TimeExchange>, attempts: u32, spacing: Duration) -> Self {
        Self {
            transport,
            attempts: attempts.max(1),
            spacing,
        }
    }

    /// Run one sampling cycle and return the minimum-delay sample.
    ///
    /// Transient exchange failures are logged and skipped; they never
    /// propagate. Non-transient failures abort the cycle.
    ///
    /// # Errors
    /// Returns [`NetClockError::SamplesExhausted`] if every attempt
    /// failed. Callers treat this as "no update this cycle", not as a
    /// fatal engine error (except on the very first cycle).
    pub async fn best_sample(&self) -> Result<ExchangeSample> {
        let mut best: Option<ExchangeSample> = None;
        for attempt in 0..self.attempts {
            if attempt > 0 {
                tokio::time::sleep(self.spacing).await;
            }
            match self.transport.exchange().await {
                Ok(sample) => {
                    tracing::debug!(
                        attempt,
                        offset_ns = sample.offset_ns,
                        delay_ns = sample.delay_ns,
                        "exchange complete"
                    );
                    if best.is_none_or(|b| sample.delay_ns < b.delay_ns) {
                        best = Some(sample);
                    }
                }
                Err(e) if e.is_transient() => {
                    tracing::debug!(attempt, error = %e, "exchange attempt dropped");
                }
                Err(e) => return Err(e),
            }
        }
        best.ok_or(NetClockError::SamplesExhausted {
            attempts: self.attempts,
        })
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("attempts", &self.attempts)
            .field("spacing", &self.spacing)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockOutcome, MockTransport};

    const MS: i64 = 1_000_000;

    fn success(delay_ms: i64) -> MockOutcome {
        MockOutcome::Success {
            offset_ns: 0,
            delay_ns: delay_ms * MS,
        }
    }

    #[tokio::test]
    async fn test_selects_minimum_delay_sample() {
        let transport = Arc::new(MockTransport::scripted(vec![
            success(50),
            success(12),
            success(30),
            success(8),
            success(40),
        ]));
        let sampler = Sampler::new(transport.clone(), 5, Duration::ZERO);

        let best = sampler.best_sample().await.unwrap();
        assert_eq!(best.delay_ns, 8 * MS);
        assert_eq!(transport.call_count(), 5);
    }

    #[tokio::test]
    async fn test_skips_failed_attempts() {
        let transport = Arc::new(MockTransport::scripted(vec![
            MockOutcome::Failure,
            success(30),
            MockOutcome::Failure,
            success(10),
            MockOutcome::Failure,
        ]));
        let sampler = Sampler::new(transport, 5, Duration::ZERO);

        let best = sampler.best_sample().await.unwrap();
        assert_eq!(best.delay_ns, 10 * MS);
    }

    #[tokio::test]
    async fn test_all_attempts_failed_reports_exhaustion() {
        let transport = Arc::new(MockTransport::scripted(vec![MockOutcome::Failure; 5]));
        let sampler = Sampler::new(transport.clone(), 5, Duration::ZERO);

        let err = sampler.best_sample().await.unwrap_err();
        assert!(matches!(err, NetClockError::SamplesExhausted { attempts: 5 }));
        assert_eq!(transport.call_count(), 5);
    }

    #[tokio::test]
    async fn test_attempts_clamped_to_at_least_one() {
        let transport = Arc::new(MockTransport::with_fixed(0, 2 * MS));
        let sampler = Sampler::new(transport.clone(), 0, Duration::ZERO);

        sampler.best_sample().await.unwrap();
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spacing_between_attempts() {
        let transport = Arc::new(MockTransport::with_fixed(0, 2 * MS));
        let sampler = Sampler::new(transport, 3, Duration::from_millis(100));

        let started = tokio::time::Instant::now();
        sampler.best_sample().await.unwrap();
        // Two pauses between three attempts.
        assert!(started.elapsed() >= Duration::from_millis(200));
    }
}
