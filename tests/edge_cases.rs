#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Edge-case tests for the packet codec and command registry
//! Tests boundary conditions and every decode failure path

use adb_wire::core::command::{command_name, Command, A_CNXN, A_OKAY, A_OPEN, A_WRTE};
use adb_wire::core::packet::{checksum, decode, encode, Header, HEADER_SIZE};
use adb_wire::error::ProtocolError;

// ============================================================================
// PACKET CODEC EDGE CASES
// ============================================================================

#[test]
fn test_packet_empty_payload() {
    let bytes = encode(A_OKAY, 3, 4, &[]).unwrap();
    assert_eq!(bytes.len(), HEADER_SIZE);
    let decoded = decode(&bytes).expect("Should decode empty payload");
    assert!(decoded.payload.is_empty());
    assert_eq!(decoded.length(), 0);
    assert_eq!(decoded.checksum(), 0);
    assert_eq!((decoded.arg0, decoded.arg1), (3, 4));
}

#[test]
fn test_packet_extreme_args() {
    let bytes = encode(A_WRTE, u32::MAX, 0, b"x").unwrap();
    let decoded = decode(&bytes).unwrap();
    assert_eq!(decoded.arg0, u32::MAX);
    assert_eq!(decoded.arg1, 0);
}

#[test]
fn test_packet_truncated_header() {
    for len in [0usize, 1, 5, 23] {
        let bytes = vec![0u8; len];
        match decode(&bytes) {
            Err(ProtocolError::HeaderTooShort { len: reported }) => assert_eq!(reported, len),
            other => panic!("Unexpected result for {len} bytes: {other:?}"),
        }
    }
}

#[test]
fn test_packet_declared_length_exceeds_buffer() {
    let mut bytes = encode(A_OPEN, 1, 0, b"shell:ls\0").unwrap();
    bytes.truncate(bytes.len() - 4);
    let err = decode(&bytes).unwrap_err();
    assert!(err.is_format_error());
    match err {
        ProtocolError::IncompletePayload {
            declared,
            available,
        } => {
            assert_eq!(declared, 9);
            assert_eq!(available, 5);
        }
        other => panic!("Unexpected: {other:?}"),
    }
}

#[test]
fn test_packet_header_only_with_nonzero_length() {
    let bytes = encode(A_WRTE, 0, 0, b"abc").unwrap();
    assert!(matches!(
        decode(&bytes[..HEADER_SIZE]),
        Err(ProtocolError::IncompletePayload {
            declared: 3,
            available: 0
        })
    ));
}

#[test]
fn test_packet_invalid_magic() {
    let mut bytes = encode(A_OPEN, 0, 0, b"").unwrap();
    bytes[20..24].copy_from_slice(&[0, 0, 0, 0]);
    let err = decode(&bytes).unwrap_err();
    assert!(err.is_integrity_error());
    assert!(matches!(
        err,
        ProtocolError::InvalidMagic {
            found: 0,
            ..
        }
    ));
}

#[test]
fn test_packet_invalid_checksum() {
    let mut bytes = encode(A_OPEN, 0, 0, b"data123").unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    let err = decode(&bytes).unwrap_err();
    assert!(err.is_integrity_error());
    assert!(matches!(err, ProtocolError::InvalidChecksum { .. }));
}

#[test]
fn test_checksum_collision_is_not_detected() {
    // Swapping two payload bytes keeps the byte sum; the checksum is not tamper-proof.
    let mut bytes = encode(A_WRTE, 0, 0, b"ab").unwrap();
    bytes.swap(HEADER_SIZE, HEADER_SIZE + 1);
    assert_eq!(decode(&bytes).unwrap().payload, b"ba");
}

#[test]
fn test_packet_trailing_bytes_not_consumed() {
    let mut bytes = encode(A_WRTE, 1, 2, b"first").unwrap();
    bytes.extend_from_slice(&encode(A_WRTE, 1, 2, b"second").unwrap());

    let first = decode(&bytes).unwrap();
    assert_eq!(first.payload, b"first");

    let second = decode(&bytes[first.wire_len()..]).unwrap();
    assert_eq!(second.payload, b"second");
}

#[test]
fn test_header_parse_skips_verification() {
    let mut bytes = encode(A_CNXN, 1, 2, b"host::").unwrap();
    bytes[16..24].fill(0xAA);
    let header = Header::parse(&bytes).unwrap();
    assert_eq!(header.command, A_CNXN);
    assert_eq!(header.length, 6);
    assert!(!header.has_valid_magic());
}

#[test]
fn test_checksum_matches_byte_sum() {
    let data: Vec<u8> = (0..=255u8).collect();
    assert_eq!(checksum(&data), (0..=255u32).sum::<u32>());
    assert_eq!(checksum(&[]), 0);
}

// ============================================================================
// COMMAND REGISTRY EDGE CASES
// ============================================================================

#[test]
fn test_command_name_round_trip() {
    for cmd in Command::ALL {
        assert_eq!(Command::from_name(cmd.name()).unwrap(), cmd);
        assert_eq!(command_name(cmd.code()), cmd.name());
    }
}

#[test]
fn test_command_name_of_unknown_code() {
    assert_eq!(command_name(0xdead_beef), "0xdeadbeef");
    // AUTH is deliberately outside the table.
    assert_eq!(command_name(0x4854_5541), "0x48545541");
}

#[test]
fn test_unknown_command_name_rejected() {
    for name in ["AUTH", "SYN", "SYNCX", "sync"] {
        assert!(matches!(
            Command::from_name(name),
            Err(ProtocolError::UnknownCommand(_))
        ));
    }
}

#[test]
fn test_decode_accepts_unknown_command_codes() {
    // The registry is for naming; decode only enforces magic and checksum.
    let bytes = encode(0x4854_5541, 1, 0, b"token").unwrap();
    let packet = decode(&bytes).unwrap();
    assert_eq!(packet.kind(), None);
    assert_eq!(command_name(packet.command), "0x48545541");
}
