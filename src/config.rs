use std::time::Duration;

use crate::utils::MAX_CHUNK_LEN;

/// UART on the Raspberry Pi GPIO header when Bluetooth is disabled.
pub const PRIMARY_SERIAL_PORT: &str = "/dev/ttyAMA0";

/// Mini UART on the Raspberry Pi GPIO header.
pub const SECONDARY_SERIAL_PORT: &str = "/dev/ttyS0";

/// The sensor ships configured for 19200 baud, 8N1.
pub const BAUD_RATE: u32 = 19_200;

/// Default wake input pin (BCM numbering).
pub const DEFAULT_WAKE_PIN: u8 = 23;

/// Default reset output pin (BCM numbering).
pub const DEFAULT_RESET_PIN: u8 = 24;

/// Settling time the sensor needs between two enrollment captures.
pub const ENROLL_STEP_DELAY: Duration = Duration::from_millis(50);

/// Settings for a [`SensorSession`](crate::SensorSession).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SessionConfig {
    /// Deadline for commands that answer straight away.
    pub default_timeout: Duration,
    /// Deadline for commands that wait for a finger to be placed.
    pub capture_timeout: Duration,
    /// Upper bound on the bytes requested by one underlying read.
    pub chunk_len: usize,
    /// Whether `wake()` sends a throwaway query after powering the sensor up.
    pub kick_on_wake: bool,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn capture_timeout(mut self, timeout: Duration) -> Self {
        self.capture_timeout = timeout;
        self
    }

    pub fn chunk_len(mut self, chunk_len: usize) -> Self {
        self.chunk_len = chunk_len;
        self
    }

    pub fn kick_on_wake(mut self, kick: bool) -> Self {
        self.kick_on_wake = kick;
        self
    }
}

impl Default for SessionConfig {
    /// One second for plain queries, ten seconds for finger captures, 128-byte reads and no
    /// kick on wake.
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(1),
            capture_timeout: Duration::from_secs(10),
            chunk_len: MAX_CHUNK_LEN,
            kick_on_wake: false,
        }
    }
}

/// Opens `port_name` with the sensor's line settings.
#[cfg(feature = "serial")]
pub fn open_serial(port_name: &str) -> crate::Result<Box<dyn serialport::SerialPort>> {
    use serialport::{DataBits, FlowControl, Parity, SerialPortSettings, StopBits};

    let settings = SerialPortSettings {
        baud_rate: BAUD_RATE,
        data_bits: DataBits::Eight,
        flow_control: FlowControl::None,
        parity: Parity::None,
        stop_bits: StopBits::One,
        timeout: SessionConfig::default().default_timeout,
    };
    log::info!("opening {} at {} baud", port_name, BAUD_RATE);
    serialport::open_with_settings(port_name, &settings)
        .map_err(|e| crate::Error::Transport(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = SessionConfig::new()
            .default_timeout(Duration::from_millis(200))
            .kick_on_wake(true);
        assert_eq!(config.default_timeout, Duration::from_millis(200));
        assert_eq!(config.capture_timeout, Duration::from_secs(10));
        assert!(config.kick_on_wake);
    }
}
