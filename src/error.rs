//! Error types for talking to the sensor.
//!
//! Protocol failures (a frame that does not look like a reply to what was sent) are kept
//! apart from domain failures, where the sensor answered correctly but refused the request.

use std::io;
use std::time::Duration;

use crate::responses::ResponseCode;

/// Result type alias for sensor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving the sensor.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Wrong separator byte, or the reply echoes a different command code.
    #[error("Framing error: {reason}")]
    Framing { reason: &'static str },

    /// The checksum byte does not match the frame contents.
    #[error("Checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    Checksum { expected: u8, actual: u8 },

    /// The channel failed to open, read or write.
    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    /// Nothing, or only part of a frame, arrived before the deadline.
    #[error("No complete response after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// A command was attempted while the sensor is powered down.
    #[error("Sensor is sleeping, can't send commands")]
    SensorAsleep,

    /// The sensor replied with a well-formed frame carrying a non-success code.
    #[error("Sensor rejected the request: {0:?}")]
    Rejected(ResponseCode),

    /// An argument was rejected before anything was sent.
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The reset line could not be driven.
    #[error("Failed to drive the reset pin")]
    Pin,

    /// A thread panicked while holding the channel lock.
    #[error("Channel lock poisoned")]
    Poisoned,
}

impl Error {
    pub fn framing(reason: &'static str) -> Self {
        Self::Framing { reason }
    }

    pub fn checksum(expected: u8, actual: u8) -> Self {
        Self::Checksum { expected, actual }
    }

    /// Classifies the error the way callers of the "try" style operations see it.
    ///
    /// Only a rejection carries a sensor-reported code; every protocol or transport failure
    /// is reported as [`ResponseCode::Timeout`].
    pub fn response_code(&self) -> ResponseCode {
        match self {
            Self::Rejected(code) => *code,
            _ => ResponseCode::Timeout,
        }
    }

    /// True for corruption and desync, where the bytes arrived but make no sense.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Framing { .. } | Self::Checksum { .. })
    }
}
