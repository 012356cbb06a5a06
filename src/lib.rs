//! # netclock
//!
//! A network time synchronization engine. Talks to a remote time authority
//! over UDP using the SNTP wire format, estimates the local clock's offset
//! and round-trip delay, and exposes a cheap, thread-safe query for
//! "corrected time now" that never touches the network.
//!
//! ## Example
//!
//! ```rust,no_run
//! use netclock::{NetClock, SyncConfig};
//!
//! # async fn example() -> Result<(), netclock::NetClockError> {
//! // Resolve the server, take an initial burst of samples, and start
//! // the background refresher.
//! let clock = NetClock::start(SyncConfig::default()).await?;
//!
//! // Corrected wall-clock time, nanoseconds since the Unix epoch.
//! let now_ns = clock.now_unix_nanos()?;
//! println!("corrected time: {now_ns} ns");
//!
//! clock.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! The engine is organized leaf-first:
//!
//! - [`sntp`] — wire timestamp codec, 48-byte packet, offset/delay math
//! - [`transport`] — one UDP request/response exchange with a bounded timeout
//! - [`sampler`] — repeats exchanges and keeps the minimum-delay sample
//! - [`anchor`] — the quality-gated shared clock anchor
//! - [`engine`] — lifecycle: initial sync, background refresher, query API

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Quality-gated clock anchor shared between the query path and the refresher
pub mod anchor;
/// Engine lifecycle and query API
pub mod engine;
/// Error types
pub mod error;
/// Multi-exchange sampling with best-sample selection
pub mod sampler;
/// SNTP wire format and offset estimation
pub mod sntp;
/// Testing utilities
pub mod testing;
/// UDP exchange transport
pub mod transport;

// Re-exports
pub use anchor::{AnchorPoint, ClockAnchor, SharedClockAnchor};
pub use engine::{NetClock, SyncConfig};
pub use error::{NetClockError, Result};
pub use sampler::Sampler;
pub use sntp::{ExchangeSample, NtpTimestamp, SntpPacket};
pub use transport::{NTP_PORT, TimeExchange, UdpTransport};
