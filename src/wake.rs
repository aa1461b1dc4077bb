//! Sleep/wake gating and wake-edge notifications.
//!
//! The sensor is powered down by pulling its reset line low. While it sleeps it still drives
//! its wake output when a finger touches it, so edge notifications keep flowing regardless of
//! the power state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use embedded_hal::digital::v2::InputPin;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Awake,
    Asleep,
}

/// Awake/asleep flag shared between the session and whoever reads it.
#[derive(Debug)]
pub(crate) struct PowerFlag(AtomicBool);

impl PowerFlag {
    pub(crate) fn new() -> Self {
        Self(AtomicBool::new(true))
    }

    pub(crate) fn set(&self, state: PowerState) {
        self.0.store(state == PowerState::Awake, Ordering::SeqCst);
    }

    pub(crate) fn get(&self) -> PowerState {
        if self.0.load(Ordering::SeqCst) {
            PowerState::Awake
        } else {
            PowerState::Asleep
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

/// One transition of the sensor's wake output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WakeEvent {
    pub edge: Edge,
    pub at: Instant,
}

impl WakeEvent {
    /// The wake output goes high while a finger rests on the sensor.
    pub fn finger_present(&self) -> bool {
        self.edge == Edge::Rising
    }
}

/// Fan-out point for wake edges.
///
/// Clones share one subscriber list, so the interrupt handler can own a clone while the
/// session hands out receivers. Subscribers that dropped their receiver are pruned on the
/// next notification.
#[derive(Debug, Clone, Default)]
pub struct WakeSignal {
    subscribers: Arc<Mutex<Vec<Sender<WakeEvent>>>>,
}

impl WakeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<WakeEvent> {
        let (tx, rx) = mpsc::channel();
        match self.subscribers.lock() {
            Ok(mut subscribers) => subscribers.push(tx),
            Err(poisoned) => poisoned.into_inner().push(tx),
        }
        rx
    }

    /// Publishes an edge to every live subscriber. Safe to call from any thread.
    pub fn notify(&self, edge: Edge) {
        let event = WakeEvent {
            edge,
            at: Instant::now(),
        };
        log::debug!("wake edge {:?}", edge);

        let mut subscribers = match self.subscribers.lock() {
            Ok(subscribers) => subscribers,
            Err(poisoned) => poisoned.into_inner(),
        };
        subscribers.retain(|tx| tx.send(event).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        match self.subscribers.lock() {
            Ok(subscribers) => subscribers.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

/// Samples a wake input pin on its own thread and publishes its edges.
///
/// For platforms without edge interrupts. The thread stops when the poller is dropped.
#[derive(Debug)]
pub struct WakePoller {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl WakePoller {
    pub fn spawn<P>(pin: P, signal: WakeSignal, interval: Duration) -> Self
    where
        P: InputPin + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        let handle = thread::spawn(move || {
            let mut last = pin.is_high().ok();
            while !thread_stop.load(Ordering::SeqCst) {
                thread::sleep(interval);
                let level = match pin.is_high() {
                    Ok(level) => level,
                    Err(_) => {
                        log::warn!("wake pin read failed");
                        continue;
                    }
                };
                match last {
                    Some(false) if level => signal.notify(Edge::Rising),
                    Some(true) if !level => signal.notify(Edge::Falling),
                    _ => {}
                }
                last = Some(level);
            }
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("wake poller thread panicked");
            }
        }
    }
}

impl Drop for WakePoller {
    fn drop(&mut self) {
        self.shutdown();
    }
}
