use std::env;

use waveshare_fingerprint::{SessionConfig, SECONDARY_SERIAL_PORT};

mod pc_utils;
use pc_utils::{init_logging, open_sensor, print_ports};

fn main() {
    init_logging();
    let args: Vec<String> = env::args().collect();
    match args.len() {
        1 => {
            print_ports();
            println!("Usage: pc_user_count [port_name] (e.g. {})", SECONDARY_SERIAL_PORT);
        }
        2 => print_status(args[1].as_str()),
        _ => panic!("Usage: pc_user_count [port_name]"),
    };
}

fn print_status(port_name: &str) {
    let sensor = open_sensor(port_name, SessionConfig::default());

    println!("1. Querying user count");
    match sensor.query_user_count() {
        Ok(count) => println!("Users: {}", count),
        Err(e) => println!("Error: {}", e),
    };

    println!("2. Querying comparison level");
    match sensor.comparison_threshold() {
        Ok(level) => println!("Comparison level: {}", level),
        Err(e) => println!("Error: {}", e),
    };

    println!("3. Listing users");
    match sensor.query_users() {
        Ok(users) => {
            for user in users {
                println!("  #{:<5} {:?}", user.user_id, user.permission);
            }
        }
        Err(e) => println!("Error: {}", e),
    };
}
