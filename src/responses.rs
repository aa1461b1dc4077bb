use std::convert::TryFrom;

use crate::commands::CommandCode;
use crate::error::{Error, Result};
use crate::utils::{checksum, merge, FromPayload, DATA_FRAME_OVERHEAD, FRAME_LEN, SEPARATOR};

/// Result byte of a response frame (byte 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResponseCode {
    Success = 0x00,
    Fail = 0x01,
    /// The sensor already holds the maximum number of users (0xFFF).
    Full = 0x04,
    NoUser = 0x05,
    UserOccupied = 0x06,
    FingerOccupied = 0x07,
    /// Reported by the sensor when no finger was placed in time, and used locally for any
    /// exchange that did not complete.
    Timeout = 0x08,
}

impl ResponseCode {
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl TryFrom<u8> for ResponseCode {
    type Error = u8;

    fn try_from(byte: u8) -> std::result::Result<Self, Self::Error> {
        let code = match byte {
            0x00 => Self::Success,
            0x01 => Self::Fail,
            0x04 => Self::Full,
            0x05 => Self::NoUser,
            0x06 => Self::UserOccupied,
            0x07 => Self::FingerOccupied,
            0x08 => Self::Timeout,
            other => return Err(other),
        };
        Ok(code)
    }
}

/// Permission level stored alongside each user. It has no meaning to the sensor itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum UserPermission {
    Level1 = 1,
    Level2 = 2,
    Level3 = 3,
}

impl UserPermission {
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for UserPermission {
    type Error = u8;

    fn try_from(byte: u8) -> std::result::Result<Self, Self::Error> {
        match byte {
            1 => Ok(Self::Level1),
            2 => Ok(Self::Level2),
            3 => Ok(Self::Level3),
            other => Err(other),
        }
    }
}

/// A validated response frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseFrame {
    pub command: CommandCode,
    /// Bytes 2, 3 and 4 of the frame. Their meaning depends on the command.
    pub data: [u8; 3],
}

impl ResponseFrame {
    /// Big-endian value of bytes 2 and 3: a count, a user ID or a payload length.
    pub fn value(&self) -> u16 {
        merge(self.data[0], self.data[1])
    }

    /// Raw byte 4, the status byte.
    pub fn status(&self) -> u8 {
        self.data[2]
    }

    /// Byte 4 read as a [`ResponseCode`]. Unknown values are reported as [`ResponseCode::Fail`].
    pub fn response_code(&self) -> ResponseCode {
        ResponseCode::try_from(self.status()).unwrap_or_else(|byte| {
            log::warn!(
                "{:?}: unknown response code {:#04x}",
                self.command,
                byte
            );
            ResponseCode::Fail
        })
    }

    /// Turns a non-success code into [`Error::Rejected`].
    pub fn into_success(self) -> Result<Self> {
        match self.response_code() {
            ResponseCode::Success => Ok(self),
            code => Err(Error::Rejected(code)),
        }
    }
}

/// Validates a raw response against the command that was sent.
///
/// A non-success [`ResponseCode`] is still a valid frame; only corruption and desync are
/// errors here.
pub fn parse_response(frame: &[u8; FRAME_LEN], expected: CommandCode) -> Result<ResponseFrame> {
    if frame[0] != SEPARATOR || frame[FRAME_LEN - 1] != SEPARATOR {
        return Err(Error::framing("missing frame separator"));
    }
    if frame[1] != expected.as_byte() {
        return Err(Error::framing("response echoes a different command"));
    }
    let expected_checksum = checksum(&frame[1..6]);
    if frame[6] != expected_checksum {
        return Err(Error::checksum(expected_checksum, frame[6]));
    }

    Ok(ResponseFrame {
        command: expected,
        data: [frame[2], frame[3], frame[4]],
    })
}

/// Validates a data frame carrying `length_hint` payload bytes and returns the payload.
///
/// Raw image transfers are sent without a meaningful checksum; pass `skip_checksum` for those.
pub fn parse_data_frame(bytes: &[u8], length_hint: usize, skip_checksum: bool) -> Result<Vec<u8>> {
    if bytes.len() != length_hint + DATA_FRAME_OVERHEAD {
        return Err(Error::framing("data frame has the wrong length"));
    }
    if bytes[0] != SEPARATOR || bytes[bytes.len() - 1] != SEPARATOR {
        return Err(Error::framing("missing data frame separator"));
    }

    let payload = &bytes[1..=length_hint];
    if !skip_checksum {
        let expected = checksum(payload);
        let actual = bytes[length_hint + 1];
        if expected != actual {
            return Err(Error::checksum(expected, actual));
        }
    }

    Ok(payload.to_vec())
}

/// Wraps `payload` into an outgoing data frame.
pub fn build_data_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + DATA_FRAME_OVERHEAD);
    frame.push(SEPARATOR);
    frame.extend_from_slice(payload);
    frame.push(checksum(payload));
    frame.push(SEPARATOR);
    frame
}

/// Outcome of a 1:N search.
///
/// On a match the sensor puts the user's permission where the response code normally goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    NoMatch { reason: ResponseCode },
    Match {
        user_id: u16,
        permission: UserPermission,
    },
}

impl Comparison {
    pub fn from_response(frame: &ResponseFrame) -> Self {
        match UserPermission::try_from(frame.status()) {
            Ok(permission) => Self::Match {
                user_id: frame.value(),
                permission,
            },
            Err(_) => Self::NoMatch {
                reason: frame.response_code(),
            },
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match { .. })
    }
}

/// A stored user as listed by the users-info query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserEntry {
    pub user_id: u16,
    pub permission: UserPermission,
}

impl FromPayload for UserEntry {
    fn from_payload(payload: &[u8]) -> Option<Self> {
        match payload {
            [high, low, permission] => Some(Self {
                user_id: merge(*high, *low),
                permission: UserPermission::try_from(*permission).ok()?,
            }),
            _ => None,
        }
    }
}

/// Decodes the users-info payload: a 2-byte count followed by 3 bytes per user.
pub fn parse_users(payload: &[u8]) -> Result<Vec<UserEntry>> {
    if payload.len() < 2 {
        return Err(Error::framing("users payload too short"));
    }
    let count = merge(payload[0], payload[1]) as usize;
    let entries = &payload[2..];
    if entries.len() < count * 3 {
        return Err(Error::framing("users payload shorter than its count"));
    }

    entries
        .chunks_exact(3)
        .take(count)
        .map(|chunk| {
            UserEntry::from_payload(chunk).ok_or_else(|| Error::framing("invalid user permission"))
        })
        .collect()
}
