use crate::sntp::packet::{PACKET_LEN, PacketError, SntpPacket};
use crate::sntp::timestamp::NtpTimestamp;

// ===== Client request =====

#[test]
fn test_client_request_flags() {
    let req = SntpPacket::client_request(NtpTimestamp::ZERO);
    assert_eq!(req.li_vn_mode, 0x1B);
    assert_eq!(req.leap_indicator(), 0);
    assert_eq!(req.version(), 3);
    assert_eq!(req.mode(), 3); // client
}

#[test]
fn test_client_request_carries_transmit() {
    let transmit = NtpTimestamp::new(3_913_056_000, 0xDEAD_BEEF);
    let req = SntpPacket::client_request(transmit);
    assert_eq!(req.transmit, transmit);
    assert_eq!(req.origin, NtpTimestamp::ZERO);
    assert_eq!(req.receive, NtpTimestamp::ZERO);
    assert_eq!(req.stratum, 0);
}

// ===== Wire layout =====

#[test]
fn test_encode_is_48_bytes_with_flags_first() {
    let req = SntpPacket::client_request(NtpTimestamp::new(1, 2));
    let buf = req.encode();
    assert_eq!(buf.len(), PACKET_LEN);
    assert_eq!(buf[0], 0x1B);
    // Transmit timestamp occupies the final 8 bytes.
    assert_eq!(&buf[40..48], &NtpTimestamp::new(1, 2).encode());
}

#[test]
fn test_encode_decode_roundtrip() {
    let packet = SntpPacket {
        li_vn_mode: 0x24, // LI=0, VN=4, Mode=4 (server)
        stratum: 2,
        poll: 6,
        precision: -23,
        root_delay: 0x0000_0a1b,
        root_dispersion: 0x0000_0c2d,
        reference_id: u32::from_be_bytes(*b"GPS\0"),
        reference: NtpTimestamp::new(3_913_056_000, 0),
        origin: NtpTimestamp::new(3_913_056_001, 0x4000_0000),
        receive: NtpTimestamp::new(3_913_056_002, 0x8000_0000),
        transmit: NtpTimestamp::new(3_913_056_003, 0xC000_0000),
    };
    let decoded = SntpPacket::decode(&packet.encode()).unwrap();
    assert_eq!(decoded, packet);
    assert_eq!(decoded.mode(), 4);
    assert_eq!(decoded.version(), 4);
}

#[test]
fn test_decode_too_short() {
    let err = SntpPacket::decode(&[0u8; 20]).unwrap_err();
    assert_eq!(
        err,
        PacketError::TooShort {
            needed: PACKET_LEN,
            have: 20
        }
    );
    assert_eq!(err.to_string(), "packet too short: need 48 bytes, have 20");
}

#[test]
fn test_decode_accepts_oversized_datagram() {
    // Extra trailing bytes (e.g. authenticator fields) are ignored.
    let req = SntpPacket::client_request(NtpTimestamp::new(9, 9));
    let mut buf = [0u8; 68];
    buf[..PACKET_LEN].copy_from_slice(&req.encode());
    assert_eq!(SntpPacket::decode(&buf).unwrap(), req);
}

#[test]
fn test_negative_precision_roundtrip() {
    let mut packet = SntpPacket::client_request(NtpTimestamp::ZERO);
    packet.precision = -20;
    let decoded = SntpPacket::decode(&packet.encode()).unwrap();
    assert_eq!(decoded.precision, -20);
}
