//! Serialized access to the byte channel.
//!
//! Every exchange with the sensor goes through a [`TransportGate`]. The gate owns the channel
//! behind a mutex, so a command, its reply and any bulk data that follows are never interleaved
//! with another caller's traffic.

use std::io::{self, Read, Write};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use arrayvec::ArrayVec;
use embedded_hal::serial;

use crate::error::{Error, Result};
use crate::utils::{FRAME_LEN, MAX_CHUNK_LEN, SEPARATOR};

/// A blocking, half-duplex byte channel to the sensor.
///
/// `read` may return fewer bytes than asked for. Returning `Ok(0)` or an error of kind
/// `TimedOut`/`WouldBlock` means nothing arrived within the current timeout.
pub trait Channel: io::Read + io::Write {
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    /// Discards whatever has been received but not read yet.
    fn clear_input(&mut self) -> io::Result<()>;
}

#[cfg(feature = "serial")]
impl Channel for Box<dyn serialport::SerialPort> {
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        serialport::SerialPort::set_timeout(self.as_mut(), timeout).map_err(io::Error::from)
    }

    fn clear_input(&mut self) -> io::Result<()> {
        serialport::SerialPort::clear(self.as_ref(), serialport::ClearBuffer::Input)
            .map_err(io::Error::from)
    }
}

/// Owns the channel and hands out exclusive [`Link`]s to it.
#[derive(Debug)]
pub struct TransportGate<C> {
    channel: Mutex<C>,
    default_timeout: Duration,
    chunk_len: usize,
}

impl<C: Channel> TransportGate<C> {
    pub fn new(channel: C, default_timeout: Duration) -> Self {
        Self {
            channel: Mutex::new(channel),
            default_timeout,
            chunk_len: MAX_CHUNK_LEN,
        }
    }

    /// Caps how many bytes a single underlying read may ask for. Zero is treated as one.
    pub fn with_chunk_len(mut self, chunk_len: usize) -> Self {
        self.chunk_len = chunk_len.max(1);
        self
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Blocks until no other exchange is in flight.
    pub fn lock(&self) -> Result<Link<'_, C>> {
        let channel = self.channel.lock().map_err(|_| Error::Poisoned)?;
        Ok(Link {
            channel,
            chunk_len: self.chunk_len,
        })
    }

    /// Sends one command frame and returns the raw 8-byte reply.
    pub fn exchange(&self, frame: &[u8; FRAME_LEN], timeout: Option<Duration>) -> Result<[u8; FRAME_LEN]> {
        let timeout = timeout.unwrap_or(self.default_timeout);
        self.lock()?.exchange(frame, timeout)
    }

    /// Reads exactly `n` bytes with nothing sent beforehand.
    pub fn read_exactly(&self, n: usize, timeout: Option<Duration>) -> Result<Vec<u8>> {
        let timeout = timeout.unwrap_or(self.default_timeout);
        self.lock()?.read_exactly(n, timeout)
    }

    /// Gives the channel back, e.g. to close it.
    pub fn into_inner(self) -> Result<C> {
        self.channel.into_inner().map_err(|_| Error::Poisoned)
    }
}

/// Exclusive access to the channel for the lifetime of the guard.
#[derive(Debug)]
pub struct Link<'a, C> {
    channel: MutexGuard<'a, C>,
    chunk_len: usize,
}

impl<C: Channel> Link<'_, C> {
    /// Drops stale input, writes `frame` and accumulates the 8-byte reply.
    pub fn exchange(&mut self, frame: &[u8; FRAME_LEN], timeout: Duration) -> Result<[u8; FRAME_LEN]> {
        self.clear_input()?;
        self.write_all(frame, timeout)?;
        log::debug!("tx {:02X?}", frame);
        self.read_frame(timeout)
    }

    /// Discards pending input, e.g. a garbled reply left over from power-up.
    pub fn clear_input(&mut self) -> Result<()> {
        self.channel.clear_input().map_err(Error::Transport)
    }

    /// Accumulates one 8-byte frame.
    ///
    /// Bytes in front of the first separator are dropped.
    pub fn read_frame(&mut self, timeout: Duration) -> Result<[u8; FRAME_LEN]> {
        let deadline = Instant::now() + timeout;
        let mut received = ArrayVec::<[u8; FRAME_LEN]>::new();
        let mut buf = [0u8; FRAME_LEN];
        let mut skipped = 0;
        while !received.is_full() {
            let wanted = received.capacity() - received.len();
            let n = self.read_some(&mut buf[..wanted], deadline, timeout)?;
            for &byte in &buf[..n] {
                if received.is_empty() && byte != SEPARATOR {
                    skipped += 1;
                    continue;
                }
                received
                    .try_push(byte)
                    .map_err(|_| Error::framing("response longer than a frame"))?;
            }
        }
        if skipped > 0 {
            log::debug!("skipped {} bytes before the response separator", skipped);
        }

        let response = received
            .into_inner()
            .map_err(|_| Error::framing("incomplete response frame"))?;
        log::debug!("rx {:02X?}", response);
        Ok(response)
    }

    /// Writes raw bytes, e.g. an outgoing data frame.
    pub fn write_all(&mut self, bytes: &[u8], timeout: Duration) -> Result<()> {
        self.channel.set_timeout(timeout)?;
        match self.channel.write_all(bytes).and_then(|_| self.channel.flush()) {
            Ok(()) => Ok(()),
            Err(e) if is_timeout(&e) => Err(Error::Timeout(timeout)),
            Err(e) => Err(Error::Transport(e)),
        }
    }

    /// Accumulates exactly `n` bytes, asking the channel for at most one chunk per call.
    pub fn read_exactly(&mut self, n: usize, timeout: Duration) -> Result<Vec<u8>> {
        let deadline = Instant::now() + timeout;
        let mut received = Vec::with_capacity(n);
        let mut chunk = vec![0u8; self.chunk_len.min(n.max(1))];

        while received.len() < n {
            let wanted = chunk.len().min(n - received.len());
            let read = self.read_some(&mut chunk[..wanted], deadline, timeout)?;
            received.extend_from_slice(&chunk[..read]);
        }

        log::debug!("rx {} bulk bytes", received.len());
        Ok(received)
    }

    fn read_some(&mut self, buf: &mut [u8], deadline: Instant, timeout: Duration) -> Result<usize> {
        loop {
            let remaining = deadline
                .checked_duration_since(Instant::now())
                .filter(|left| !left.is_zero())
                .ok_or(Error::Timeout(timeout))?;
            self.channel.set_timeout(remaining)?;

            match self.channel.read(buf) {
                Ok(0) => return Err(Error::Timeout(timeout)),
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if is_timeout(&e) => return Err(Error::Timeout(timeout)),
                Err(e) => return Err(Error::Transport(e)),
            }
        }
    }
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

/// Adapts a pair of `embedded-hal` serial halves into a [`Channel`].
///
/// The halves are polled with `nb`; a read gives up with `TimedOut` once the configured
/// timeout has elapsed without a byte.
#[derive(Debug)]
pub struct HalChannel<TX, RX> {
    tx: TX,
    rx: RX,
    timeout: Duration,
}

impl<TX, RX> HalChannel<TX, RX>
where
    TX: serial::Write<u8>,
    RX: serial::Read<u8>,
{
    pub fn new(tx: TX, rx: RX) -> Self {
        Self {
            tx,
            rx,
            timeout: Duration::from_secs(1),
        }
    }

    pub fn release(self) -> (TX, RX) {
        (self.tx, self.rx)
    }
}

impl<TX, RX> io::Read for HalChannel<TX, RX>
where
    TX: serial::Write<u8>,
    RX: serial::Read<u8>,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let deadline = Instant::now() + self.timeout;
        let mut n = 0;
        while n < buf.len() {
            match self.rx.read() {
                Ok(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                Err(nb::Error::WouldBlock) => {
                    // Hand back what we have rather than waiting for a full buffer.
                    if n > 0 {
                        break;
                    }
                    if Instant::now() >= deadline {
                        return Err(io::ErrorKind::TimedOut.into());
                    }
                    std::thread::yield_now();
                }
                Err(nb::Error::Other(_)) => {
                    return Err(io::Error::new(io::ErrorKind::Other, "serial read failed"));
                }
            }
        }
        Ok(n)
    }
}

impl<TX, RX> io::Write for HalChannel<TX, RX>
where
    TX: serial::Write<u8>,
    RX: serial::Read<u8>,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for byte in buf {
            nb::block!(self.tx.write(*byte))
                .map_err(|_| io::Error::new(io::ErrorKind::Other, "serial write failed"))?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        nb::block!(self.tx.flush())
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "serial flush failed"))
    }
}

impl<TX, RX> Channel for HalChannel<TX, RX>
where
    TX: serial::Write<u8>,
    RX: serial::Read<u8>,
{
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.timeout = timeout;
        Ok(())
    }

    /// Reads without waiting until the receiver runs dry.
    fn clear_input(&mut self) -> io::Result<()> {
        let mut dropped = 0usize;
        loop {
            match self.rx.read() {
                Ok(_) => dropped += 1,
                Err(nb::Error::WouldBlock) => break,
                // Left for the next read to report.
                Err(nb::Error::Other(_)) => break,
            }
        }
        if dropped > 0 {
            log::debug!("dropped {} stale bytes", dropped);
        }
        Ok(())
    }
}
