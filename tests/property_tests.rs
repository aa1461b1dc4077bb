//! Property-based tests for frame construction and validation.

use std::convert::TryFrom;

use proptest::prelude::*;
use waveshare_fingerprint::{
    build_command, build_data_frame, checksum, parse_data_frame, parse_response, CommandCode,
    Error,
};

/// Strategy for every command code the sensor knows.
fn command_code() -> impl Strategy<Value = CommandCode> {
    any::<u8>().prop_filter_map("not a command code", |byte| CommandCode::try_from(byte).ok())
}

proptest! {
    /// Property: the checksum byte is the XOR of indices 1..=5 and both ends carry the separator.
    #[test]
    fn prop_command_frame_layout(code in command_code(), b0 in any::<u8>(), b1 in any::<u8>(), b2 in any::<u8>()) {
        let frame = build_command(code, b0, b1, b2);

        prop_assert_eq!(frame[0], 0xF5);
        prop_assert_eq!(frame[7], 0xF5);
        prop_assert_eq!(frame[6], checksum(&frame[1..6]));
        prop_assert_eq!(frame[6], code.as_byte() ^ b0 ^ b1 ^ b2);
    }

    /// Property: a built frame parses back to the same code and data bytes.
    #[test]
    fn prop_build_then_parse(code in command_code(), b0 in any::<u8>(), b1 in any::<u8>(), b2 in any::<u8>()) {
        let frame = build_command(code, b0, b1, b2);
        let parsed = parse_response(&frame, code).unwrap();

        prop_assert_eq!(parsed.command, code);
        prop_assert_eq!(parsed.data, [b0, b1, b2]);
    }

    /// Property: changing any single byte in indices 1..=6 is always caught.
    #[test]
    fn prop_single_byte_corruption_is_rejected(
        code in command_code(),
        data in any::<[u8; 3]>(),
        index in 1usize..=6,
        flip in 1u8..=255,
    ) {
        let mut frame = build_command(code, data[0], data[1], data[2]);
        frame[index] ^= flip;

        prop_assert!(parse_response(&frame, code).is_err());
    }

    /// Property: any separator other than 0xF5 is a framing error.
    #[test]
    fn prop_bad_separator_is_framing_error(
        code in command_code(),
        separator in any::<u8>().prop_filter("not the separator", |b| *b != 0xF5),
        leading in any::<bool>(),
    ) {
        let mut frame = build_command(code, 0, 0, 0);
        frame[if leading { 0 } else { 7 }] = separator;

        let is_framing = matches!(parse_response(&frame, code), Err(Error::Framing { .. }));
        prop_assert!(is_framing);
    }

    /// Property: a single corrupted payload byte fails verification unless the checksum is
    /// skipped.
    #[test]
    fn prop_data_frame_corruption(
        payload in prop::collection::vec(any::<u8>(), 1..300),
        seed in any::<usize>(),
        flip in 1u8..=255,
    ) {
        let mut frame = build_data_frame(&payload);
        let index = 1 + seed % payload.len();
        frame[index] ^= flip;

        let is_checksum = matches!(
            parse_data_frame(&frame, payload.len(), false),
            Err(Error::Checksum { .. })
        );
        prop_assert!(is_checksum);
        prop_assert!(parse_data_frame(&frame, payload.len(), true).is_ok());
    }
}
