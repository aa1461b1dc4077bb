use std::convert::Infallible;

use embedded_hal::digital::v2::OutputPin;
use serialport::{available_ports, SerialPort};
use waveshare_fingerprint::{SensorSession, SessionConfig};

// We're cheating here and will use the host OS's serial port through a
// USB-UART adapter. There's no GPIO on a PC, so the reset line is a no-op
// and the sensor has to be powered by hand.

#[derive(Debug)]
pub struct NoResetPin;

impl OutputPin for NoResetPin {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        println!("(reset line would go low now)");
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub type PcSensor = SensorSession<Box<dyn SerialPort>, NoResetPin>;

pub fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
}

pub fn print_ports() {
    match available_ports() {
        Ok(ports) => {
            for port in ports {
                println!("Available port: {} ({:#?})", port.port_name, port.port_type);
            }
        }
        Err(e) => println!("Error: {}", e),
    }
}

pub fn open_sensor(port_name: &str, config: SessionConfig) -> PcSensor {
    println!("Using port {}", port_name);
    match SensorSession::open(port_name, NoResetPin, config) {
        Ok(sensor) => sensor,
        Err(e) => panic!("Error: {}", e),
    }
}

#[allow(dead_code)]
// This allows us to share code between different PC-based examples.
// There's probably a better way to do it!
fn main() {}
