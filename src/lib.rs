//! **waveshare-fingerprint** is a blocking driver for the Waveshare UART fingerprint sensor
//! module.
//!
//! The sensor speaks a small binary protocol: 8-byte command and response frames delimited by
//! `0xF5`, followed by variable length data frames for images and feature vectors. Power is
//! gated through a reset line, and the sensor raises a wake line when a finger touches it.
//!
//! A [`SensorSession`] owns the serial channel and the reset pin. Every exchange is serialized
//! behind one lock, so the session can be shared between a UI thread and a worker thread.
//!
//! ## Example
//!
//! ```
//! # use std::{convert::Infallible, io, io::Read, time::Duration};
//! # use embedded_hal::digital::v2::OutputPin;
//! use waveshare_fingerprint::{Channel, SensorSession, SessionConfig};
//! #
//! # struct TestChannel(io::Cursor<Vec<u8>>);
//! # impl io::Read for TestChannel {
//! #     fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> { self.0.read(buf) }
//! # }
//! # impl io::Write for TestChannel {
//! #     fn write(&mut self, buf: &[u8]) -> io::Result<usize> { Ok(buf.len()) }
//! #     fn flush(&mut self) -> io::Result<()> { Ok(()) }
//! # }
//! # impl Channel for TestChannel {
//! #     fn set_timeout(&mut self, _: Duration) -> io::Result<()> { Ok(()) }
//! #     fn clear_input(&mut self) -> io::Result<()> { Ok(()) }
//! # }
//! # struct ResetPin;
//! # impl OutputPin for ResetPin {
//! #     type Error = Infallible;
//! #     fn set_low(&mut self) -> Result<(), Infallible> { Ok(()) }
//! #     fn set_high(&mut self) -> Result<(), Infallible> { Ok(()) }
//! # }
//! # let channel = TestChannel(io::Cursor::new(vec![0xF5, 0x09, 0x00, 0x05, 0x00, 0x00, 0x0C, 0xF5]));
//! # let reset_pin = ResetPin;
//!
//! // Obtain a channel (e.g. `open_serial("/dev/ttyS0")`) and a reset pin from your platform
//! let sensor = SensorSession::new(channel, reset_pin, SessionConfig::default())?;
//! match sensor.query_user_count() {
//!     Ok(count) => println!("{} users enrolled", count),
//!     Err(error) => println!("Error: {}", error),
//! }
//! # Ok::<(), waveshare_fingerprint::Error>(())
//! ```
//!
//! For more examples, see the `demos` directory.
#![warn(missing_debug_implementations, rust_2018_idioms)]

mod commands;
mod config;
mod driver;
mod error;
mod responses;
mod transport;
mod utils;
mod wake;

pub use crate::commands::{build_command, Access, AddingMode, Command, CommandCode};
#[cfg(feature = "serial")]
pub use crate::config::open_serial;
pub use crate::config::{
    SessionConfig, BAUD_RATE, DEFAULT_RESET_PIN, DEFAULT_WAKE_PIN, ENROLL_STEP_DELAY,
    PRIMARY_SERIAL_PORT, SECONDARY_SERIAL_PORT,
};
pub use crate::driver::{SensorSession, FEATURE_HEADER_LEN, MAX_COMPARISON_LEVEL, MAX_USER_ID};
pub use crate::error::{Error, Result};
pub use crate::responses::{
    build_data_frame, parse_data_frame, parse_response, parse_users, Comparison, ResponseCode,
    ResponseFrame, UserEntry, UserPermission,
};
pub use crate::transport::{Channel, HalChannel, Link, TransportGate};
pub use crate::utils::{
    checksum, merge, split, FromPayload, ToPayload, DATA_FRAME_OVERHEAD, FRAME_LEN,
    MAX_CHUNK_LEN, SEPARATOR,
};
pub use crate::wake::{Edge, PowerState, WakeEvent, WakePoller, WakeSignal};
