//! SNTP wire format and offset estimation.
//!
//! Implements the client side of the classical four-timestamp clock
//! offset algorithm over the NTP wire format.
//!
//! ## Clock Synchronization Flow
//!
//! ```text
//! Client                          Server
//!   |--- request (T1 in transmit) -->|  (server records T2)
//!   |                                |
//!   |<-- response (T2, T3) --------- |  (client records T4)
//!   |                                |
//!   |  offset = ((T2-T1)+(T3-T4))/2  |
//!   |  delay  = (T4-T1) - (T3-T2)    |
//! ```
//!
//! A lower round-trip delay bounds the offset error more tightly
//! (± delay/2 for a symmetric path), so the minimum-delay sample of a
//! burst is the most trustworthy.

pub mod exchange;
pub mod packet;
pub mod timestamp;

#[cfg(test)]
mod tests;

// Re-exports for convenient access.
pub use exchange::ExchangeSample;
pub use packet::{PACKET_LEN, PacketError, SntpPacket};
pub use timestamp::{NTP_UNIX_OFFSET_SECS, NtpTimestamp, unix_now_nanos};
