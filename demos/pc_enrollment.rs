use std::env;

use waveshare_fingerprint::{Comparison, ResponseCode, SessionConfig, UserPermission};

mod pc_utils;
use pc_utils::{init_logging, open_sensor, print_ports};

fn main() {
    init_logging();
    let args: Vec<String> = env::args().collect();
    match args.len() {
        1 => print_ports(),
        2 => identify(args[1].as_str()),
        3 => match args[2].parse::<u16>() {
            Ok(user_id) => enroll_to_id(args[1].as_str(), user_id),
            Err(_) => panic!("Usage: pc_enrollment [port_name] [user_id]"),
        },
        _ => panic!("Usage: pc_enrollment [port_name] [user_id]"),
    };
}

fn enroll_to_id(port_name: &str, user_id: u16) {
    let sensor = open_sensor(port_name, SessionConfig::default());

    println!("Place the same finger on the sensor three times...");
    match sensor.enroll(user_id, UserPermission::Level1) {
        Ok(ResponseCode::Success) => println!("Enrolled user {}", user_id),
        Ok(ResponseCode::Full) => println!("Sensor is full, or the ID is above 4095"),
        Ok(ResponseCode::UserOccupied) => println!("User {} already exists", user_id),
        Ok(ResponseCode::FingerOccupied) => println!("This finger is already enrolled"),
        Ok(ResponseCode::Timeout) => println!("Timed out, try again"),
        Ok(code) => println!("Enrollment failed: {:?}", code),
        Err(e) => println!("Error: {}", e),
    };
}

fn identify(port_name: &str) {
    let sensor = open_sensor(port_name, SessionConfig::default());

    println!("Place a finger on the sensor...");
    match sensor.compare_one_to_many() {
        Ok(Comparison::Match {
            user_id,
            permission,
        }) => println!("Welcome user {} ({:?})", user_id, permission),
        Ok(Comparison::NoMatch { reason }) => println!("Not recognized ({:?})", reason),
        Err(e) => println!("Error: {}", e),
    };
}
