//! Test doubles for the serial channel and the reset pin.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::convert::Infallible;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use embedded_hal::digital::v2::OutputPin;
use waveshare_fingerprint::{
    build_command, build_data_frame, Channel, CommandCode, SensorSession, SessionConfig,
};

#[derive(Debug, Default)]
pub struct ChannelState {
    /// Bytes already on the line, readable and clearable.
    pub incoming: VecDeque<u8>,
    /// Replies still to be sent, one per request.
    pub replies: VecDeque<Vec<u8>>,
    /// Set by a write; the next read that finds the line empty delivers one reply.
    pub requested: bool,
    pub written: Vec<u8>,
    pub reads: usize,
    pub writes: usize,
    pub cleared: usize,
    pub max_read: usize,
}

/// In-memory channel that serves scripted replies, at most `max_read` bytes per read.
///
/// Each `push` queues one reply; it only reaches the line once the session has written a
/// request and starts reading, like a real sensor. `push_data` extends the last reply.
/// Clones share state, so a test can keep one while the session owns the other.
#[derive(Debug, Clone)]
pub struct ScriptedChannel(Arc<Mutex<ChannelState>>);

impl ScriptedChannel {
    pub fn new(max_read: usize) -> Self {
        Self(Arc::new(Mutex::new(ChannelState {
            max_read,
            ..ChannelState::default()
        })))
    }

    pub fn push(&self, bytes: &[u8]) {
        self.0.lock().unwrap().replies.push_back(bytes.to_vec());
    }

    pub fn push_reply(&self, code: CommandCode, b2: u8, b3: u8, b4: u8) {
        self.push(&build_command(code, b2, b3, b4));
    }

    /// Appends a data frame to the last queued reply.
    pub fn push_data(&self, payload: &[u8]) {
        let frame = build_data_frame(payload);
        let mut state = self.0.lock().unwrap();
        if state.replies.is_empty() {
            state.replies.push_back(Vec::new());
        }
        if let Some(reply) = state.replies.back_mut() {
            reply.extend_from_slice(&frame);
        }
    }

    /// Puts bytes on the line right away, as if they arrived unrequested.
    pub fn push_noise(&self, bytes: &[u8]) {
        self.0.lock().unwrap().incoming.extend(bytes.iter().copied());
    }

    pub fn cleared(&self) -> usize {
        self.0.lock().unwrap().cleared
    }

    pub fn written(&self) -> Vec<u8> {
        self.0.lock().unwrap().written.clone()
    }

    /// Written bytes split into 8-byte frames.
    pub fn written_frames(&self) -> Vec<Vec<u8>> {
        self.written().chunks(8).map(|c| c.to_vec()).collect()
    }

    pub fn touched(&self) -> bool {
        let state = self.0.lock().unwrap();
        state.reads > 0 || state.writes > 0
    }

    /// Unread bytes, delivered or still queued.
    pub fn pending(&self) -> usize {
        let state = self.0.lock().unwrap();
        state.incoming.len() + state.replies.iter().map(Vec::len).sum::<usize>()
    }
}

impl io::Read for ScriptedChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.0.lock().unwrap();
        state.reads += 1;
        if state.incoming.is_empty() && state.requested {
            state.requested = false;
            if let Some(reply) = state.replies.pop_front() {
                state.incoming.extend(reply);
            }
        }
        let n = buf.len().min(state.max_read).min(state.incoming.len());
        for slot in buf.iter_mut().take(n) {
            *slot = state.incoming.pop_front().unwrap();
        }
        Ok(n)
    }
}

impl io::Write for ScriptedChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.0.lock().unwrap();
        state.writes += 1;
        state.requested = true;
        state.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Channel for ScriptedChannel {
    fn set_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
        Ok(())
    }

    fn clear_input(&mut self) -> io::Result<()> {
        let mut state = self.0.lock().unwrap();
        state.cleared += state.incoming.len();
        state.incoming.clear();
        Ok(())
    }
}

/// Reset pin that records every level it is driven to.
#[derive(Debug, Clone, Default)]
pub struct RecordingPin(Arc<Mutex<Vec<bool>>>);

impl RecordingPin {
    pub fn levels(&self) -> Vec<bool> {
        self.0.lock().unwrap().clone()
    }
}

impl OutputPin for RecordingPin {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.lock().unwrap().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.lock().unwrap().push(true);
        Ok(())
    }
}

pub fn test_config() -> SessionConfig {
    SessionConfig::default()
        .default_timeout(Duration::from_millis(50))
        .capture_timeout(Duration::from_millis(50))
}

pub fn session() -> (
    SensorSession<ScriptedChannel, RecordingPin>,
    ScriptedChannel,
    RecordingPin,
) {
    session_with(test_config())
}

pub fn session_with(
    config: SessionConfig,
) -> (
    SensorSession<ScriptedChannel, RecordingPin>,
    ScriptedChannel,
    RecordingPin,
) {
    let channel = ScriptedChannel::new(3);
    let pin = RecordingPin::default();
    let sensor = SensorSession::new(channel.clone(), pin.clone(), config).unwrap();
    (sensor, channel, pin)
}
