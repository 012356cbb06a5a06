//! Engine lifecycle and query API.
//!
//! [`NetClock::start`] resolves the server, runs one full sampling cycle
//! to establish the anchor, and then spawns the background refresher.
//! The initial cycle always completes (or fails) before the refresher
//! loop begins, so startup never doubles traffic to the server. From
//! then on the refresher periodically offers new samples to the
//! anchor's quality gate until [`NetClock::shutdown`] joins it.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::anchor::{ClockAnchor, SharedClockAnchor};
use crate::error::{NetClockError, Result};
use crate::sampler::Sampler;
use crate::sntp::timestamp::unix_now_nanos;
use crate::transport::{DEFAULT_EXCHANGE_TIMEOUT, NTP_PORT, TimeExchange, UdpTransport};

/// Default public time authority.
pub const DEFAULT_SERVER: &str = "pool.ntp.org";

/// Configuration for a [`NetClock`].
///
/// All knobs are plain values; nothing is read from the environment.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Time server hostname.
    pub server: String,
    /// Time server UDP port.
    pub port: u16,
    /// Exchanges attempted per sampling cycle.
    pub samples_per_cycle: u32,
    /// Pause between exchanges within a cycle.
    pub sample_spacing: Duration,
    /// Interval between background refresh cycles. Conservative by
    /// default: a synchronized anchor only needs periodic correction of
    /// oscillator drift, and public pools discourage tight polling.
    pub refresh_interval: Duration,
    /// Bound on the wait for each response.
    pub exchange_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            port: NTP_PORT,
            samples_per_cycle: 5,
            sample_spacing: Duration::from_millis(100),
            refresh_interval: Duration::from_secs(15),
            exchange_timeout: DEFAULT_EXCHANGE_TIMEOUT,
        }
    }
}

/// A synchronized network clock.
///
/// Owns the transport, the shared anchor, and the background refresher.
/// Queries are cheap and never touch the network; the handle is `Send +
/// Sync` and can be shared freely behind an `Arc`.
pub struct NetClock {
    anchor: SharedClockAnchor,
    sampler: Sampler,
    config: SyncConfig,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    refresher: Mutex<Option<JoinHandle<()>>>,
}

impl NetClock {
    /// Start the engine against a UDP time server.
    ///
    /// Resolves and binds the transport, runs the initial sampling cycle
    /// to completion, commits the anchor, and starts the refresher.
    ///
    /// # Errors
    /// Setup failures ([`NetClockError::Resolve`], [`NetClockError::Bind`])
    /// and first-cycle exhaustion ([`NetClockError::SamplesExhausted`])
    /// surface here; the engine does not start in those cases.
    pub async fn start(config: SyncConfig) -> Result<Self> {
        let transport =
            UdpTransport::connect(&config.server, config.port, config.exchange_timeout).await?;
        Self::start_with_transport(Arc::new(transport), config).await
    }

    /// Start the engine over an injected transport.
    ///
    /// Same lifecycle as [`Self::start`]; useful with the in-memory
    /// transport from [`crate::testing`].
    ///
    /// # Errors
    /// First-cycle exhaustion surfaces as
    /// [`NetClockError::SamplesExhausted`].
    pub async fn start_with_transport(
        transport: Arc<dyn TimeExchange>,
        config: SyncConfig,
    ) -> Result<Self> {
        let sampler = Sampler::new(
            transport,
            config.samples_per_cycle,
            config.sample_spacing,
        );
        let anchor: SharedClockAnchor = Arc::new(ClockAnchor::new());

        // Initial sync, strictly before the refresher exists.
        let sample = sampler.best_sample().await?;
        anchor.commit(&sample);
        tracing::info!(
            offset_ns = sample.offset_ns,
            delay_ns = sample.delay_ns,
            "initial clock sync complete"
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let clock = Self {
            anchor,
            sampler,
            config,
            shutdown_tx,
            shutdown_rx,
            refresher: Mutex::new(None),
        };
        clock.start_refresher();
        Ok(clock)
    }

    /// Start the background refresher if it is not already running.
    ///
    /// Idempotent: returns `true` if a refresher was spawned, `false`
    /// if one was already running (nothing is spawned twice).
    pub fn start_refresher(&self) -> bool {
        let mut slot = lock(&self.refresher);
        if slot.is_some() {
            tracing::debug!("refresher already running");
            return false;
        }
        let handle = tokio::spawn(refresh_loop(
            self.sampler.clone(),
            self.anchor.clone(),
            self.config.refresh_interval,
            self.shutdown_rx.clone(),
        ));
        *slot = Some(handle);
        true
    }

    /// Corrected wall-clock time now, in nanoseconds since the Unix
    /// epoch. Never blocks and never touches the network.
    ///
    /// # Errors
    /// Returns [`NetClockError::NotSynchronized`] before the first
    /// successful sync.
    pub fn now_unix_nanos(&self) -> Result<i64> {
        self.anchor
            .corrected_time(unix_now_nanos())
            .ok_or(NetClockError::NotSynchronized)
    }

    /// Whether the first successful sync has happened.
    #[must_use]
    pub fn is_synchronized(&self) -> bool {
        self.anchor.is_synchronized()
    }

    /// Round-trip delay of the sample behind the current anchor.
    #[must_use]
    pub fn quality_ns(&self) -> Option<i64> {
        self.anchor.quality_ns()
    }

    /// Shared handle to the underlying anchor.
    #[must_use]
    pub fn anchor(&self) -> SharedClockAnchor {
        self.anchor.clone()
    }

    /// The configuration the engine was started with.
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Stop the refresher and wait for it to exit.
    ///
    /// The loop observes the signal promptly: an idle refresher exits on
    /// the next poll, and a sampling cycle in flight is dropped rather
    /// than run to completion. The transport is released once the task
    /// has been joined. Safe to call more than once.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let handle = lock(&self.refresher).take();
        if let Some(handle) = handle {
            if handle.await.is_err() {
                tracing::warn!("refresher task panicked during shutdown");
            }
            tracing::info!("clock engine stopped");
        }
    }
}

impl std::fmt::Debug for NetClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetClock")
            .field("server", &self.config.server)
            .field("synchronized", &self.is_synchronized())
            .field("quality_ns", &self.quality_ns())
            .finish_non_exhaustive()
    }
}

fn lock(slot: &Mutex<Option<JoinHandle<()>>>) -> MutexGuard<'_, Option<JoinHandle<()>>> {
    match slot.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Background refresh loop: one sampling cycle per interval, offered to
/// the anchor's quality gate. Runs until the shutdown signal; a failed
/// cycle just means no update until the next interval.
async fn refresh_loop(
    sampler: Sampler,
    anchor: SharedClockAnchor,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    // First tick one full interval out; the initial cycle already ran.
    let mut timer = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    loop {
        tokio::select! {
            _ = timer.tick() => {
                // Race the cycle against shutdown: a signal arriving
                // mid-cycle drops the in-flight sampling future instead
                // of waiting out the remaining attempts.
                let result = tokio::select! {
                    result = sampler.best_sample() => result,
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            tracing::info!("clock refresher shutting down");
                            break;
                        }
                        continue;
                    }
                };
                match result {
                    Ok(sample) => {
                        if anchor.commit(&sample) {
                            tracing::info!(
                                offset_ns = sample.offset_ns,
                                delay_ns = sample.delay_ns,
                                "clock anchor refined"
                            );
                        } else {
                            tracing::debug!(
                                delay_ns = sample.delay_ns,
                                "sample discarded, current anchor is better"
                            );
                        }
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "no clock update this cycle");
                    }
                }
            }

            // Shutdown. A closed channel means the engine was dropped
            // without an explicit shutdown; stop either way.
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    tracing::info!("clock refresher shutting down");
                    break;
                }
            }
        }
    }
}
