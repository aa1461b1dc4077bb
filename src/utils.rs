use byteorder::{BigEndian, ByteOrder};

/// Marker byte at both ends of every frame.
pub const SEPARATOR: u8 = 0xF5;

/// Length of a command or response frame.
pub const FRAME_LEN: usize = 8;

/// Bytes wrapped around a data frame payload: leading separator, checksum, trailing separator.
pub const DATA_FRAME_OVERHEAD: usize = 3;

/// Per-call read limit used while pulling bulk data off the channel.
pub const MAX_CHUNK_LEN: usize = 128;

/// XOR-fold of `bytes`.
///
/// Command and response frames are checked over indices `1..=5`, data frames over their
/// whole payload.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, byte| acc ^ byte)
}

/// Joins a high and a low byte the way the sensor reports 16 bit values.
pub fn merge(high: u8, low: u8) -> u16 {
    BigEndian::read_u16(&[high, low])
}

/// Joins three bytes into a 24 bit value, most significant first.
pub fn merge3(first: u8, second: u8, third: u8) -> u32 {
    BigEndian::read_u24(&[first, second, third])
}

/// Splits a 16 bit value into `(high, low)`.
pub fn split(value: u16) -> (u8, u8) {
    let mut buf = [0u8; 2];
    BigEndian::write_u16(&mut buf, value);
    (buf[0], buf[1])
}

/// Splits the low 24 bits of `value` into three bytes, most significant first.
pub fn split3(value: u32) -> (u8, u8, u8) {
    let mut buf = [0u8; 3];
    BigEndian::write_u24(&mut buf, value & 0x00FF_FFFF);
    (buf[0], buf[1], buf[2])
}

pub trait FromPayload: Sized {
    fn from_payload(payload: &[u8]) -> Option<Self>;
}

pub trait ToPayload {
    /// The three parameter bytes carried by a command frame.
    fn to_payload(&self) -> [u8; 3];
}
