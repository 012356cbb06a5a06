//! SNTP packet parsing and encoding.
//!
//! The request and response share one fixed 48-byte layout (RFC 4330):
//! a flags byte (leap indicator / version / mode), stratum, poll,
//! precision, root delay, root dispersion, reference id, and four 64-bit
//! timestamps (reference, origin, receive, transmit).

use thiserror::Error;

use super::timestamp::NtpTimestamp;

/// Fixed packet size in bytes (request and response are the same size).
pub const PACKET_LEN: usize = 48;

/// Errors from decoding an SNTP packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PacketError {
    /// The buffer is shorter than a full packet.
    #[error("packet too short: need {needed} bytes, have {have}")]
    TooShort {
        /// Bytes required.
        needed: usize,
        /// Bytes available.
        have: usize,
    },
}

/// A 48-byte SNTP message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SntpPacket {
    /// Leap indicator (2 bits), version (3 bits), mode (3 bits).
    pub li_vn_mode: u8,
    /// Stratum level of the server's clock.
    pub stratum: u8,
    /// Poll interval exponent.
    pub poll: u8,
    /// Clock precision exponent (signed).
    pub precision: i8,
    /// Round-trip delay to the reference source (16.16 fixed point).
    pub root_delay: u32,
    /// Dispersion relative to the reference source (16.16 fixed point).
    pub root_dispersion: u32,
    /// Reference clock identifier.
    pub reference_id: u32,
    /// Time the server's clock was last set.
    pub reference: NtpTimestamp,
    /// Client transmit time echoed back by the server (T1).
    pub origin: NtpTimestamp,
    /// Time the request arrived at the server (T2).
    pub receive: NtpTimestamp,
    /// Time the response left the server (T3).
    pub transmit: NtpTimestamp,
}

impl SntpPacket {
    /// Flags byte for a client request: LI=0, VN=3, Mode=3.
    pub const CLIENT_LI_VN_MODE: u8 = 0x1B;

    /// Build a client request carrying the local send time in the
    /// transmit field. All other fields are zero, as servers ignore them.
    #[must_use]
    pub fn client_request(transmit: NtpTimestamp) -> Self {
        Self {
            li_vn_mode: Self::CLIENT_LI_VN_MODE,
            stratum: 0,
            poll: 0,
            precision: 0,
            root_delay: 0,
            root_dispersion: 0,
            reference_id: 0,
            reference: NtpTimestamp::ZERO,
            origin: NtpTimestamp::ZERO,
            receive: NtpTimestamp::ZERO,
            transmit,
        }
    }

    /// Protocol mode from the lower 3 bits of the flags byte.
    #[must_use]
    pub fn mode(&self) -> u8 {
        self.li_vn_mode & 0x07
    }

    /// Protocol version from bits 3-5 of the flags byte.
    #[must_use]
    pub fn version(&self) -> u8 {
        (self.li_vn_mode >> 3) & 0x07
    }

    /// Leap indicator from the upper 2 bits of the flags byte.
    #[must_use]
    pub fn leap_indicator(&self) -> u8 {
        self.li_vn_mode >> 6
    }

    /// Encode to the 48-byte wire layout.
    #[must_use]
    #[allow(
        clippy::cast_sign_loss,
        reason = "Precision is an exponent byte reinterpreted on the wire"
    )]
    pub fn encode(&self) -> [u8; PACKET_LEN] {
        let mut buf = [0u8; PACKET_LEN];
        buf[0] = self.li_vn_mode;
        buf[1] = self.stratum;
        buf[2] = self.poll;
        buf[3] = self.precision as u8;
        buf[4..8].copy_from_slice(&self.root_delay.to_be_bytes());
        buf[8..12].copy_from_slice(&self.root_dispersion.to_be_bytes());
        buf[12..16].copy_from_slice(&self.reference_id.to_be_bytes());
        buf[16..24].copy_from_slice(&self.reference.encode());
        buf[24..32].copy_from_slice(&self.origin.encode());
        buf[32..40].copy_from_slice(&self.receive.encode());
        buf[40..48].copy_from_slice(&self.transmit.encode());
        buf
    }

    /// Decode from bytes.
    ///
    /// # Errors
    /// Returns [`PacketError::TooShort`] if fewer than 48 bytes are given.
    /// Field contents are not otherwise validated.
    #[allow(
        clippy::cast_possible_wrap,
        reason = "Precision is a signed exponent carried in one wire byte"
    )]
    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        if data.len() < PACKET_LEN {
            return Err(PacketError::TooShort {
                needed: PACKET_LEN,
                have: data.len(),
            });
        }
        // Slice bounds checked above; the timestamp decodes cannot fail.
        let ts = |range: std::ops::Range<usize>| {
            NtpTimestamp::decode(&data[range]).unwrap_or(NtpTimestamp::ZERO)
        };
        Ok(Self {
            li_vn_mode: data[0],
            stratum: data[1],
            poll: data[2],
            precision: data[3] as i8,
            root_delay: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
            root_dispersion: u32::from_be_bytes([data[8], data[9], data[10], data[11]]),
            reference_id: u32::from_be_bytes([data[12], data[13], data[14], data[15]]),
            reference: ts(16..24),
            origin: ts(24..32),
            receive: ts(32..40),
            transmit: ts(40..48),
        })
    }
}
