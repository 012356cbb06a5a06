//! Quality-gated clock anchor.
//!
//! The anchor is the single committed (local time, corrected time) pair
//! from which every query is derived by plain addition. Updates pass a
//! quality gate: a candidate sample is accepted only if its round-trip
//! delay (the offset error bound) beats the stored one, so the anchor's
//! quality is monotonically non-increasing and a late-arriving worse
//! sample can never overwrite a better one.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::sntp::exchange::ExchangeSample;

/// An immutable snapshot of the anchor's three fields.
///
/// Returned by value only; callers never hold a reference into the
/// anchor's locked state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorPoint {
    /// Local clock reading the anchor was taken at.
    pub local_ns: i64,
    /// Corrected (reference) time at that same instant.
    pub corrected_ns: i64,
    /// Round-trip delay of the sample that produced this anchor;
    /// lower is better.
    pub quality_ns: i64,
}

/// Shared clock anchor: `None` until the first successful sync.
///
/// Mutated only through [`ClockAnchor::commit`], which performs the
/// whole read-modify-write under the guarding lock. Reads snapshot the
/// fields under the same lock and compute outside it, so a query never
/// observes a torn anchor.
#[derive(Debug, Default)]
pub struct ClockAnchor {
    point: Mutex<Option<AnchorPoint>>,
}

/// Shared handle to a [`ClockAnchor`].
pub type SharedClockAnchor = Arc<ClockAnchor>;

impl ClockAnchor {
    /// Create an uninitialized anchor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<AnchorPoint>> {
        match self.point.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Offer a sample to the quality gate.
    ///
    /// The first sample is accepted unconditionally; afterwards a
    /// candidate is accepted only if its delay is strictly lower than
    /// the stored quality. Returns whether the anchor was updated.
    /// Rejection is the expected common case once synchronized, not an
    /// error.
    pub fn commit(&self, sample: &ExchangeSample) -> bool {
        let candidate = AnchorPoint {
            local_ns: sample.local_recv_ns,
            corrected_ns: sample.local_recv_ns.saturating_add(sample.offset_ns),
            quality_ns: sample.delay_ns,
        };
        let mut point = self.lock();
        match *point {
            Some(current) if candidate.quality_ns >= current.quality_ns => false,
            _ => {
                *point = Some(candidate);
                true
            }
        }
    }

    /// Corrected time at the given local instant.
    ///
    /// Returns `None` while uninitialized. A brief lock snapshots the
    /// anchor; the arithmetic happens outside it.
    #[must_use]
    pub fn corrected_time(&self, now_local_ns: i64) -> Option<i64> {
        let snapshot = *self.lock();
        snapshot.map(|p| p.corrected_ns + (now_local_ns - p.local_ns))
    }

    /// Snapshot the current anchor fields, if synchronized.
    #[must_use]
    pub fn snapshot(&self) -> Option<AnchorPoint> {
        *self.lock()
    }

    /// Whether the first successful sync has happened.
    #[must_use]
    pub fn is_synchronized(&self) -> bool {
        self.lock().is_some()
    }

    /// Quality (round-trip delay) of the stored anchor, if any.
    #[must_use]
    pub fn quality_ns(&self) -> Option<i64> {
        self.lock().map(|p| p.quality_ns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(local_recv_ns: i64, offset_ns: i64, delay_ns: i64) -> ExchangeSample {
        ExchangeSample {
            local_send_ns: local_recv_ns - delay_ns,
            remote_recv_ns: 0,
            remote_send_ns: 0,
            local_recv_ns,
            offset_ns,
            delay_ns,
        }
    }

    #[test]
    fn test_starts_uninitialized() {
        let anchor = ClockAnchor::new();
        assert!(!anchor.is_synchronized());
        assert!(anchor.snapshot().is_none());
        assert!(anchor.corrected_time(1_000).is_none());
        assert!(anchor.quality_ns().is_none());
    }

    #[test]
    fn test_first_commit_accepted_unconditionally() {
        let anchor = ClockAnchor::new();
        // Even a terrible first sample establishes the anchor.
        assert!(anchor.commit(&sample(1_000, 500, i64::MAX / 4)));
        assert!(anchor.is_synchronized());
        assert_eq!(anchor.quality_ns(), Some(i64::MAX / 4));
    }

    #[test]
    fn test_better_sample_replaces_anchor() {
        let anchor = ClockAnchor::new();
        anchor.commit(&sample(1_000, 500, 40_000));
        assert!(anchor.commit(&sample(2_000, 480, 10_000)));

        let point = anchor.snapshot().unwrap();
        assert_eq!(point.local_ns, 2_000);
        assert_eq!(point.corrected_ns, 2_480);
        assert_eq!(point.quality_ns, 10_000);
    }

    #[test]
    fn test_worse_sample_leaves_anchor_bit_identical() {
        let anchor = ClockAnchor::new();
        anchor.commit(&sample(1_000, 500, 10_000));
        let before = anchor.snapshot().unwrap();

        assert!(!anchor.commit(&sample(2_000, 9_999, 50_000)));
        assert_eq!(anchor.snapshot().unwrap(), before);
    }

    #[test]
    fn test_equal_quality_rejected() {
        // The gate is strict: equal quality does not churn the anchor.
        let anchor = ClockAnchor::new();
        anchor.commit(&sample(1_000, 500, 10_000));
        assert!(!anchor.commit(&sample(2_000, 600, 10_000)));
        assert_eq!(anchor.snapshot().unwrap().local_ns, 1_000);
    }

    #[test]
    fn test_quality_is_monotone_minimum() {
        let anchor = ClockAnchor::new();
        let qualities = [50_000, 12_000, 30_000, 8_000, 40_000];
        for (i, q) in qualities.iter().enumerate() {
            anchor.commit(&sample(i as i64 * 1_000, 0, *q));
        }
        assert_eq!(anchor.quality_ns(), Some(8_000));
    }

    #[test]
    fn test_corrected_time_extrapolates_from_anchor() {
        let anchor = ClockAnchor::new();
        anchor.commit(&sample(1_000_000, 250_000, 4_000));

        // 500 us after the anchor instant.
        assert_eq!(anchor.corrected_time(1_500_000), Some(1_750_000));
        // Queries before the anchor instant also extrapolate linearly.
        assert_eq!(anchor.corrected_time(900_000), Some(1_150_000));
    }

    #[test]
    fn test_negative_offset_anchor() {
        let anchor = ClockAnchor::new();
        anchor.commit(&sample(1_000_000, -250_000, 4_000));
        assert_eq!(anchor.corrected_time(1_000_000), Some(750_000));
    }

    #[test]
    fn test_never_regresses_to_uninitialized() {
        let anchor = ClockAnchor::new();
        anchor.commit(&sample(1_000, 0, 10_000));
        // Rejected commits keep the anchor synchronized.
        anchor.commit(&sample(2_000, 0, 99_000));
        assert!(anchor.is_synchronized());
    }

    #[test]
    fn test_shared_across_threads() {
        let anchor: SharedClockAnchor = Arc::new(ClockAnchor::new());
        let mut handles = Vec::new();
        for q in [50_000i64, 8_000, 30_000, 12_000] {
            let anchor = anchor.clone();
            handles.push(std::thread::spawn(move || {
                anchor.commit(&sample(q, 0, q));
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        // Regardless of interleaving, the minimum wins.
        assert_eq!(anchor.quality_ns(), Some(8_000));
    }
}
