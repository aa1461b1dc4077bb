use std::env;
use std::io::{stdin, BufRead};
use std::thread;

use waveshare_fingerprint::{Comparison, Edge, SessionConfig};

mod pc_utils;
use pc_utils::{init_logging, open_sensor, print_ports};

// Without GPIO the wake line can't be read, so pressing Enter stands in
// for the rising edge the sensor would raise when touched.

fn main() {
    init_logging();
    let args: Vec<String> = env::args().collect();
    match args.len() {
        1 => print_ports(),
        2 => sleep_loop(args[1].as_str()),
        _ => panic!("Usage: pc_sleep_wake [port_name]"),
    };
}

fn sleep_loop(port_name: &str) {
    let sensor = open_sensor(port_name, SessionConfig::default().kick_on_wake(true));
    let events = sensor.subscribe();

    let signal = sensor.wake_signal();
    thread::spawn(move || {
        let stdin = stdin();
        for _ in stdin.lock().lines() {
            signal.notify(Edge::Rising);
        }
    });

    if let Err(e) = sensor.sleep() {
        panic!("Error: {}", e);
    }
    println!("Sleeping. Press Enter to simulate a finger touch, Ctrl-C to quit.");

    for event in events.iter().filter(|event| event.finger_present()) {
        println!("Wake signal received at {:?}", event.at);
        if let Err(e) = sensor.wake() {
            println!("Error: {}", e);
            continue;
        }

        match sensor.compare_one_to_many() {
            Ok(Comparison::Match { user_id, .. }) => println!("Hello, user {}", user_id),
            Ok(Comparison::NoMatch { reason }) => println!("Not recognized ({:?})", reason),
            Err(e) => println!("Error: {}", e),
        }

        if let Err(e) = sensor.sleep() {
            println!("Error: {}", e);
        }
    }
}
