use std::convert::TryFrom;
use std::sync::mpsc::Receiver;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use embedded_hal::digital::v2::OutputPin;
use log::{debug, info, warn};

use crate::commands::{Access, AddingMode, Command, CommandCode};
use crate::config::{SessionConfig, ENROLL_STEP_DELAY};
use crate::error::{Error, Result};
use crate::responses::{
    build_data_frame, parse_data_frame, parse_response, parse_users, Comparison, ResponseCode,
    ResponseFrame, UserEntry, UserPermission,
};
use crate::transport::{Channel, TransportGate};
use crate::utils::{merge3, split, DATA_FRAME_OVERHEAD};
use crate::wake::{PowerFlag, PowerState, WakeEvent, WakeSignal};

/// Highest user ID the sensor can store.
pub const MAX_USER_ID: u16 = 0x0FFF;

/// Highest comparison level accepted by the sensor.
pub const MAX_COMPARISON_LEVEL: u8 = 9;

/// Bytes in front of every feature vector on the wire.
pub const FEATURE_HEADER_LEN: usize = 3;

/// Represents a fingerprint sensor connected over a UART, with its reset line.
///
/// All operations take `&self`; exchanges are serialized internally, so the session can be
/// shared between threads behind an `Arc`.
#[derive(Debug)]
pub struct SensorSession<C, P> {
    gate: TransportGate<C>,
    reset: Mutex<P>,
    power: PowerFlag,
    wake_signal: WakeSignal,
    config: SessionConfig,
}

impl<C, P> SensorSession<C, P>
where
    C: Channel,
    P: OutputPin,
{
    /// Takes over an opened channel and a configured reset pin, and powers the sensor up.
    pub fn new(channel: C, mut reset: P, config: SessionConfig) -> Result<Self> {
        reset.set_high().map_err(|_| Error::Pin)?;
        let gate = TransportGate::new(channel, config.default_timeout).with_chunk_len(config.chunk_len);

        Ok(Self {
            gate,
            reset: Mutex::new(reset),
            power: PowerFlag::new(),
            wake_signal: WakeSignal::new(),
            config,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn power_state(&self) -> PowerState {
        self.power.get()
    }

    /// Handle for whatever delivers the wake pin's edges (an interrupt callback or a
    /// [`WakePoller`](crate::WakePoller)).
    pub fn wake_signal(&self) -> WakeSignal {
        self.wake_signal.clone()
    }

    /// Wake edges arrive here whether the sensor is awake or not.
    pub fn subscribe(&self) -> Receiver<WakeEvent> {
        let events = self.wake_signal.subscribe();
        debug!("{} wake subscribers", self.wake_signal.subscriber_count());
        events
    }

    /// Cuts power to the sensor. Nothing is sent over the channel.
    pub fn sleep(&self) -> Result<()> {
        self.power.set(PowerState::Asleep);
        self.drive_reset(false)?;
        info!("sensor put to sleep");
        Ok(())
    }

    /// Powers the sensor back up.
    ///
    /// The first command after power-up is often answered with garbage. With
    /// [`SessionConfig::kick_on_wake`] set this sends a throwaway query to absorb it.
    pub fn wake(&self) -> Result<()> {
        self.drive_reset(true)?;
        self.power.set(PowerState::Awake);
        info!("sensor woken up");

        if self.config.kick_on_wake {
            self.kick();
        }
        Ok(())
    }

    /// Powers the sensor up and always sends the throwaway query.
    pub fn wake_and_kick(&self) -> Result<()> {
        self.drive_reset(true)?;
        self.power.set(PowerState::Awake);
        info!("sensor woken up");
        self.kick();
        Ok(())
    }

    fn kick(&self) {
        match self.query_user_count() {
            Ok(count) => debug!("wake kick answered, {} users", count),
            Err(e) => debug!("wake kick failed as expected: {}", e),
        }
    }

    fn drive_reset(&self, high: bool) -> Result<()> {
        let mut reset = self.reset.lock().map_err(|_| Error::Poisoned)?;
        let driven = if high { reset.set_high() } else { reset.set_low() };
        driven.map_err(|_| Error::Pin)
    }

    fn ensure_awake(&self) -> Result<()> {
        match self.power.get() {
            PowerState::Awake => Ok(()),
            PowerState::Asleep => Err(Error::SensorAsleep),
        }
    }

    fn timeout_for(&self, code: CommandCode) -> Duration {
        if code.waits_for_finger() {
            self.config.capture_timeout
        } else {
            self.config.default_timeout
        }
    }

    /// Sends a command and validates the reply.
    ///
    /// The reply may still carry a non-success [`ResponseCode`].
    pub fn send(&self, cmd: &Command) -> Result<ResponseFrame> {
        self.ensure_awake()?;
        let code = cmd.code();
        let raw = self.gate.exchange(&cmd.to_frame(), Some(self.timeout_for(code)))?;
        parse_response(&raw, code)
    }

    /// Like [`send`](Self::send) but reports protocol and transport failures as
    /// [`ResponseCode::Timeout`].
    fn try_send(&self, cmd: &Command) -> Result<ResponseCode> {
        match self.send(cmd) {
            Ok(frame) => Ok(frame.response_code()),
            Err(e) => absorb(cmd.code(), e),
        }
    }

    /// Sends a command whose reply announces a data frame, and reads that frame under the
    /// same lock.
    fn request_data(&self, cmd: &Command, skip_checksum: bool) -> Result<Vec<u8>> {
        self.ensure_awake()?;
        let code = cmd.code();
        let timeout = self.timeout_for(code);

        let mut link = self.gate.lock()?;
        let raw = link.exchange(&cmd.to_frame(), timeout)?;
        let len = parse_response(&raw, code)?.into_success()?.value() as usize;
        let frame = link.read_exactly(len + DATA_FRAME_OVERHEAD, timeout)?;
        parse_data_frame(&frame, len, skip_checksum)
    }

    /// Sends an upload command followed by the `header` + `features` data frame.
    fn upload(&self, code: CommandCode, header: [u8; 3], features: &[u8]) -> Result<ResponseFrame> {
        self.ensure_awake()?;
        let mut payload = Vec::with_capacity(FEATURE_HEADER_LEN + features.len());
        payload.extend_from_slice(&header);
        payload.extend_from_slice(features);
        let len = u16::try_from(payload.len())
            .map_err(|_| Error::InvalidArgument("feature vector too long"))?;

        let timeout = self.timeout_for(code);
        let mut link = self.gate.lock()?;
        link.clear_input()?;
        link.write_all(&Command::Upload { code, len }.to_frame(), timeout)?;
        link.write_all(&build_data_frame(&payload), timeout)?;
        debug!("tx {} bulk bytes", payload.len());
        let raw = link.read_frame(timeout)?;
        parse_response(&raw, code)
    }

    pub fn query_user_count(&self) -> Result<u16> {
        let frame = self.send(&Command::QueryUserCount)?.into_success()?;
        Ok(frame.value())
    }

    /// Registers the finger on the sensor under `user_id` with three captures.
    ///
    /// Stops at the first capture that does not succeed and returns its code. Protocol and
    /// transport failures are reported as [`ResponseCode::Timeout`]. IDs above
    /// [`MAX_USER_ID`] are answered with [`ResponseCode::Full`] without contacting the sensor.
    pub fn enroll(&self, user_id: u16, permission: UserPermission) -> Result<ResponseCode> {
        if user_id > MAX_USER_ID {
            return Ok(ResponseCode::Full);
        }
        self.ensure_awake()?;

        for step in 1..=3 {
            if step > 1 {
                thread::sleep(ENROLL_STEP_DELAY);
            }
            let code = self.try_send(&Command::AddFingerprint {
                step,
                user_id,
                permission,
            })?;
            if !code.is_success() {
                debug!("enrollment of {} stopped at step {}: {:?}", user_id, step, code);
                return Ok(code);
            }
        }

        info!("enrolled user {} ({:?})", user_id, permission);
        Ok(ResponseCode::Success)
    }

    /// Runs the first two enrollment captures, then a capture that returns the finger's
    /// feature vector instead of storing a third sample.
    pub fn enroll_and_acquire_features(
        &self,
        user_id: u16,
        permission: UserPermission,
    ) -> Result<(ResponseCode, Option<Vec<u8>>)> {
        if user_id > MAX_USER_ID {
            return Ok((ResponseCode::Full, None));
        }
        self.ensure_awake()?;

        for step in 1..=2 {
            if step > 1 {
                thread::sleep(ENROLL_STEP_DELAY);
            }
            let code = self.try_send(&Command::AddFingerprint {
                step,
                user_id,
                permission,
            })?;
            if !code.is_success() {
                return Ok((code, None));
            }
        }
        thread::sleep(ENROLL_STEP_DELAY);

        let cmd = Command::AddAndAcquireFingerprint {
            user_id,
            permission,
        };
        match self.request_data(&cmd, false).and_then(strip_header) {
            Ok(features) => Ok((ResponseCode::Success, Some(features))),
            Err(e) => absorb(cmd.code(), e).map(|code| (code, None)),
        }
    }

    pub fn delete_user(&self, user_id: u16) -> Result<bool> {
        let code = self.try_send(&Command::DeleteUser { user_id })?;
        Ok(code.is_success())
    }

    pub fn delete_all_users(&self) -> Result<bool> {
        let code = self.try_send(&Command::DeleteAllUsers { permission: None })?;
        Ok(code.is_success())
    }

    pub fn delete_all_users_with_permission(&self, permission: UserPermission) -> Result<bool> {
        let code = self.try_send(&Command::DeleteAllUsers {
            permission: Some(permission),
        })?;
        Ok(code.is_success())
    }

    /// True if the finger on the sensor belongs to `user_id`.
    pub fn compare_one_to_one(&self, user_id: u16) -> Result<bool> {
        let code = self.try_send(&Command::CompareOneToOne { user_id })?;
        Ok(code.is_success())
    }

    /// Searches every stored user for the finger on the sensor.
    pub fn compare_one_to_many(&self) -> Result<Comparison> {
        match self.send(&Command::CompareOneToMany) {
            Ok(frame) => Ok(Comparison::from_response(&frame)),
            Err(e) => absorb(CommandCode::Comparison1N, e).map(|reason| Comparison::NoMatch { reason }),
        }
    }

    /// Captures a raw fingerprint image. The sensor does not checksum image data.
    pub fn acquire_image(&self) -> Result<Vec<u8>> {
        self.request_data(&Command::AcquireImage, true)
    }

    /// Captures a finger and returns its feature vector, without the transfer header.
    pub fn acquire_features(&self) -> Result<Vec<u8>> {
        self.request_data(&Command::AcquireEigenvalues, false)
            .and_then(strip_header)
    }

    pub fn comparison_threshold(&self) -> Result<u8> {
        let frame = self
            .send(&Command::ComparisonLevel {
                access: Access::Query,
                level: 0,
            })?
            .into_success()?;
        Ok(frame.data[1])
    }

    /// Sets the matching strictness. Levels above 9 are refused without contacting the sensor.
    pub fn set_comparison_threshold(&self, level: u8) -> Result<bool> {
        if level > MAX_COMPARISON_LEVEL {
            warn!("comparison level {} out of range", level);
            return Ok(false);
        }
        let code = self.try_send(&Command::ComparisonLevel {
            access: Access::Set,
            level,
        })?;
        Ok(code.is_success())
    }

    pub fn adding_mode(&self) -> Result<AddingMode> {
        let frame = self
            .send(&Command::AddingMode {
                access: Access::Query,
                mode: AddingMode::AllowRepeat,
            })?
            .into_success()?;
        match frame.data[1] {
            0 => Ok(AddingMode::AllowRepeat),
            1 => Ok(AddingMode::ProhibitRepeat),
            _ => Err(Error::framing("unknown fingerprint adding mode")),
        }
    }

    pub fn set_adding_mode(&self, mode: AddingMode) -> Result<bool> {
        let code = self.try_send(&Command::AddingMode {
            access: Access::Set,
            mode,
        })?;
        Ok(code.is_success())
    }

    /// The finger capture timeout, in the sensor's own units.
    pub fn capture_timeout(&self) -> Result<u8> {
        let frame = self
            .send(&Command::CaptureTimeout {
                access: Access::Query,
                value: 0,
            })?
            .into_success()?;
        Ok(frame.data[1])
    }

    pub fn set_capture_timeout(&self, value: u8) -> Result<bool> {
        let code = self.try_send(&Command::CaptureTimeout {
            access: Access::Set,
            value,
        })?;
        Ok(code.is_success())
    }

    /// The 24 bit serial number. The reply has no response code.
    pub fn serial_number(&self) -> Result<u32> {
        let frame = self.send(&Command::QuerySerialNumber)?;
        let [first, second, third] = frame.data;
        Ok(merge3(first, second, third))
    }

    /// Stores a new 24 bit serial number. Larger values are refused locally.
    pub fn set_serial_number(&self, serial: u32) -> Result<bool> {
        if serial > 0x00FF_FFFF {
            warn!("serial number {:#x} does not fit in 24 bits", serial);
            return Ok(false);
        }
        match self.send(&Command::ModifySerialNumber { serial }) {
            Ok(_) => Ok(true),
            Err(e) => absorb(CommandCode::ModifySerialNumber, e).map(|_| false),
        }
    }

    /// Permission stored for `user_id`, or `None` if there is no such user.
    pub fn user_permission(&self, user_id: u16) -> Result<Option<UserPermission>> {
        let frame = self.send(&Command::QueryPermission { user_id })?;
        if let Ok(permission) = UserPermission::try_from(frame.status()) {
            return Ok(Some(permission));
        }
        match frame.response_code() {
            ResponseCode::NoUser => Ok(None),
            code => Err(Error::Rejected(code)),
        }
    }

    /// Lists every stored user with its permission.
    pub fn query_users(&self) -> Result<Vec<UserEntry>> {
        let payload = self.request_data(&Command::QueryUsersInfo, false)?;
        parse_users(&payload)
    }

    /// Uploads a feature vector and compares it with the finger on the sensor.
    pub fn compare_features(&self, features: &[u8]) -> Result<bool> {
        let code = CommandCode::UploadEigenvaluesAndCompare;
        match self.upload(code, [0, 0, 0], features) {
            Ok(frame) => Ok(frame.response_code().is_success()),
            Err(e) => absorb(code, e).map(|_| false),
        }
    }

    /// Compares an uploaded feature vector with the stored user `user_id`.
    pub fn compare_features_one_to_one(&self, user_id: u16, features: &[u8]) -> Result<bool> {
        let code = CommandCode::UploadEigenvaluesAndCompare11;
        let (high, low) = split(user_id);
        match self.upload(code, [high, low, 0], features) {
            Ok(frame) => Ok(frame.response_code().is_success()),
            Err(e) => absorb(code, e).map(|_| false),
        }
    }

    /// Searches every stored user for an uploaded feature vector.
    pub fn compare_features_one_to_many(&self, features: &[u8]) -> Result<Comparison> {
        let code = CommandCode::UploadEigenvaluesAndCompare1N;
        match self.upload(code, [0, 0, 0], features) {
            Ok(frame) => Ok(Comparison::from_response(&frame)),
            Err(e) => absorb(code, e).map(|reason| Comparison::NoMatch { reason }),
        }
    }

    /// Stores an uploaded feature vector as a new user.
    pub fn create_user_from_features(
        &self,
        user_id: u16,
        permission: UserPermission,
        features: &[u8],
    ) -> Result<ResponseCode> {
        if user_id > MAX_USER_ID {
            return Ok(ResponseCode::Full);
        }
        let code = CommandCode::CreateUserFromEigenvalues;
        let (high, low) = split(user_id);
        match self.upload(code, [high, low, permission.as_byte()], features) {
            Ok(frame) => Ok(frame.response_code()),
            Err(e) => absorb(code, e),
        }
    }

    /// Gives back the channel and the reset pin.
    pub fn close(self) -> Result<(C, P)> {
        let channel = self.gate.into_inner()?;
        let reset = self.reset.into_inner().map_err(|_| Error::Poisoned)?;
        Ok((channel, reset))
    }
}

#[cfg(feature = "serial")]
impl<P: OutputPin> SensorSession<Box<dyn serialport::SerialPort>, P> {
    /// Opens `port_name` with the sensor's line settings and starts a session on it.
    pub fn open(port_name: &str, reset: P, config: SessionConfig) -> Result<Self> {
        let port = crate::config::open_serial(port_name)?;
        Self::new(port, reset, config)
    }
}

/// Reports a failed exchange the way the "try" operations do.
///
/// Corruption, desync, timeouts and I/O failures become [`ResponseCode::Timeout`]; gating,
/// argument and lock errors still propagate.
fn absorb(code: CommandCode, error: Error) -> Result<ResponseCode> {
    match error {
        Error::SensorAsleep | Error::InvalidArgument(_) | Error::Pin | Error::Poisoned => {
            Err(error)
        }
        Error::Rejected(response) => Ok(response),
        other if other.is_protocol() => {
            warn!("{:?} got a garbled reply: {}", code, other);
            Ok(other.response_code())
        }
        other => {
            warn!("{:?} failed: {}", code, other);
            Ok(other.response_code())
        }
    }
}

fn strip_header(mut payload: Vec<u8>) -> Result<Vec<u8>> {
    if payload.len() < FEATURE_HEADER_LEN {
        return Err(Error::framing("feature payload shorter than its header"));
    }
    payload.drain(..FEATURE_HEADER_LEN);
    Ok(payload)
}
