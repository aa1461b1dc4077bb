use std::convert::TryFrom;

use crate::responses::UserPermission;
use crate::utils::{checksum, split, split3, ToPayload, FRAME_LEN, SEPARATOR};
//# Codes and packet layout follow the Waveshare UART Fingerprint Sensor (C) user manual.

/// Command codes recognized by the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandCode {
    AddFingerprint1 = 0x01,
    AddFingerprint2 = 0x02,
    AddFingerprint3 = 0x03,
    DeleteUser = 0x04,
    DeleteAllUsers = 0x05,
    AddAndAcquireFingerprint = 0x06,
    ModifySerialNumber = 0x08,
    QueryUserCount = 0x09,
    QueryPermission = 0x0A,
    Comparison11 = 0x0B,
    Comparison1N = 0x0C,
    AcquireEigenvalues = 0x23,
    AcquireImage = 0x24,
    ManageComparisonLevel = 0x28,
    QuerySerialNumber = 0x2A,
    QueryUsersInfo = 0x2B,
    SleepMode = 0x2C,
    ManageFingerprintAddingMode = 0x2D,
    ManageCaptureTimeout = 0x2E,
    AcquireEigenvaluesDsp = 0x31,
    CreateUserFromEigenvalues = 0x41,
    UploadEigenvaluesAndCompare11 = 0x42,
    UploadEigenvaluesAndCompare1N = 0x43,
    UploadEigenvaluesAndCompare = 0x44,
}

impl CommandCode {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Commands that wait for a finger on the sensor before answering.
    pub fn waits_for_finger(self) -> bool {
        matches!(
            self,
            Self::AddFingerprint1
                | Self::AddFingerprint2
                | Self::AddFingerprint3
                | Self::AddAndAcquireFingerprint
                | Self::Comparison11
                | Self::Comparison1N
                | Self::AcquireEigenvalues
                | Self::AcquireImage
                | Self::UploadEigenvaluesAndCompare
                | Self::UploadEigenvaluesAndCompare11
                | Self::UploadEigenvaluesAndCompare1N
        )
    }
}

impl TryFrom<u8> for CommandCode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        let code = match byte {
            0x01 => Self::AddFingerprint1,
            0x02 => Self::AddFingerprint2,
            0x03 => Self::AddFingerprint3,
            0x04 => Self::DeleteUser,
            0x05 => Self::DeleteAllUsers,
            0x06 => Self::AddAndAcquireFingerprint,
            0x08 => Self::ModifySerialNumber,
            0x09 => Self::QueryUserCount,
            0x0A => Self::QueryPermission,
            0x0B => Self::Comparison11,
            0x0C => Self::Comparison1N,
            0x23 => Self::AcquireEigenvalues,
            0x24 => Self::AcquireImage,
            0x28 => Self::ManageComparisonLevel,
            0x2A => Self::QuerySerialNumber,
            0x2B => Self::QueryUsersInfo,
            0x2C => Self::SleepMode,
            0x2D => Self::ManageFingerprintAddingMode,
            0x2E => Self::ManageCaptureTimeout,
            0x31 => Self::AcquireEigenvaluesDsp,
            0x41 => Self::CreateUserFromEigenvalues,
            0x42 => Self::UploadEigenvaluesAndCompare11,
            0x43 => Self::UploadEigenvaluesAndCompare1N,
            0x44 => Self::UploadEigenvaluesAndCompare,
            other => return Err(other),
        };
        Ok(code)
    }
}

/// Whether a "manage" command reads or writes the setting it addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Set,
    Query,
}

impl Access {
    fn selector(self) -> u8 {
        match self {
            Self::Set => 0,
            Self::Query => 1,
        }
    }
}

/// Whether the sensor accepts the same finger under two user IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddingMode {
    AllowRepeat = 0,
    ProhibitRepeat = 1,
}

/// Commands one can send to the sensor, with their parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// One of the three enrollment captures; `step` is 1, 2 or 3.
    ///
    /// **Note:** any step outside 1..=3 is sent as step 3.
    AddFingerprint {
        step: u8,
        user_id: u16,
        permission: UserPermission,
    },

    /// Final enrollment capture that also returns the computed feature vector.
    AddAndAcquireFingerprint {
        user_id: u16,
        permission: UserPermission,
    },

    DeleteUser { user_id: u16 },

    /// Deletes every user, or only the users holding `permission`.
    DeleteAllUsers { permission: Option<UserPermission> },

    QueryUserCount,

    QueryPermission { user_id: u16 },

    /// Checks the finger on the sensor against one stored user.
    CompareOneToOne { user_id: u16 },

    /// Searches all stored users for the finger on the sensor.
    CompareOneToMany,

    AcquireEigenvalues,

    AcquireImage,

    /// Matching strictness, 0 (loosest) to 9 (strictest).
    ComparisonLevel { access: Access, level: u8 },

    QuerySerialNumber,

    /// Only the low 24 bits are sent.
    ModifySerialNumber { serial: u32 },

    QueryUsersInfo,

    AddingMode { access: Access, mode: AddingMode },

    /// Finger capture timeout, in the sensor's own units.
    CaptureTimeout { access: Access, value: u8 },

    /// Announces an upload of `len` payload bytes. Upload commands carry the data frame
    /// length instead of parameters.
    Upload { code: CommandCode, len: u16 },
}

impl Command {
    pub fn code(&self) -> CommandCode {
        match self {
            Self::AddFingerprint { step: 1, .. } => CommandCode::AddFingerprint1,
            Self::AddFingerprint { step: 2, .. } => CommandCode::AddFingerprint2,
            Self::AddFingerprint { .. } => CommandCode::AddFingerprint3,
            Self::AddAndAcquireFingerprint { .. } => CommandCode::AddAndAcquireFingerprint,
            Self::DeleteUser { .. } => CommandCode::DeleteUser,
            Self::DeleteAllUsers { .. } => CommandCode::DeleteAllUsers,
            Self::QueryUserCount => CommandCode::QueryUserCount,
            Self::QueryPermission { .. } => CommandCode::QueryPermission,
            Self::CompareOneToOne { .. } => CommandCode::Comparison11,
            Self::CompareOneToMany => CommandCode::Comparison1N,
            Self::AcquireEigenvalues => CommandCode::AcquireEigenvalues,
            Self::AcquireImage => CommandCode::AcquireImage,
            Self::ComparisonLevel { .. } => CommandCode::ManageComparisonLevel,
            Self::QuerySerialNumber => CommandCode::QuerySerialNumber,
            Self::ModifySerialNumber { .. } => CommandCode::ModifySerialNumber,
            Self::QueryUsersInfo => CommandCode::QueryUsersInfo,
            Self::AddingMode { .. } => CommandCode::ManageFingerprintAddingMode,
            Self::CaptureTimeout { .. } => CommandCode::ManageCaptureTimeout,
            Self::Upload { code, .. } => *code,
        }
    }

    /// The complete 8-byte frame for this command.
    pub fn to_frame(&self) -> [u8; FRAME_LEN] {
        let [p1, p2, p3] = self.to_payload();
        build_command(self.code(), p1, p2, p3)
    }
}

impl ToPayload for Command {
    fn to_payload(&self) -> [u8; 3] {
        match self {
            // 0xF5 | 0x01..0x03 | id hi | id lo | permission | 0 | chk | 0xF5
            Self::AddFingerprint {
                user_id,
                permission,
                ..
            }
            | Self::AddAndAcquireFingerprint {
                user_id,
                permission,
            } => {
                let (high, low) = split(*user_id);
                [high, low, permission.as_byte()]
            }

            Self::DeleteUser { user_id }
            | Self::QueryPermission { user_id }
            | Self::CompareOneToOne { user_id } => {
                let (high, low) = split(*user_id);
                [high, low, 0]
            }

            // Third byte 0 clears everything, 1..=3 only that permission level.
            Self::DeleteAllUsers { permission } => {
                [0, 0, permission.map(UserPermission::as_byte).unwrap_or(0)]
            }

            // 0xF5 | 0x28 | 0 | level | 0 = set, 1 = query | 0 | chk | 0xF5
            Self::ComparisonLevel { access, level } => [0, *level, access.selector()],

            Self::AddingMode { access, mode } => [0, *mode as u8, access.selector()],

            Self::CaptureTimeout { access, value } => [0, *value, access.selector()],

            Self::ModifySerialNumber { serial } => {
                let (first, second, third) = split3(*serial);
                [first, second, third]
            }

            // 0xF5 | code | len hi | len lo | 0 | 0 | chk | 0xF5
            Self::Upload { len, .. } => {
                let (high, low) = split(*len);
                [high, low, 0]
            }

            Self::QueryUserCount
            | Self::CompareOneToMany
            | Self::AcquireEigenvalues
            | Self::AcquireImage
            | Self::QuerySerialNumber
            | Self::QueryUsersInfo => [0, 0, 0],
        }
    }
}

/// Builds a command frame: `[0xF5, code, b0, b1, b2, 0, checksum, 0xF5]`.
pub fn build_command(code: CommandCode, b0: u8, b1: u8, b2: u8) -> [u8; FRAME_LEN] {
    let mut frame = [SEPARATOR, code.as_byte(), b0, b1, b2, 0, 0, SEPARATOR];
    frame[6] = checksum(&frame[1..6]);
    frame
}
