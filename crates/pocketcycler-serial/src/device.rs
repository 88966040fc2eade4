//! High-level PocketPCR operations over a device session

use pocketcycler_core::{eeprom, ProgramSet};

use crate::error::{Result, SessionError};
use crate::protocol::{
    self, cmd, parse_tagged_value, tag, Notification, RunStatus, EEPROM_FRAME_TIMEOUT,
    MAX_BUFFER_TIMEOUT, QUERY_TIMEOUT, RUN_STATUS_TIMEOUT,
};
use crate::session::DeviceSession;
use crate::transport::Transport;

/// A connected PocketPCR thermocycler
///
/// Thin typed facade over [`DeviceSession`]: each method is one wire
/// operation with the timeout the device's firmware warrants for it.
pub struct PocketPcr<T: Transport> {
    session: DeviceSession<T>,
}

impl<T: Transport> PocketPcr<T> {
    /// Take ownership of a transport and start a session on it
    pub fn new(transport: T) -> Self {
        Self {
            session: DeviceSession::new(transport),
        }
    }

    /// Access the underlying session
    pub fn session(&self) -> &DeviceSession<T> {
        &self.session
    }

    /// Access the underlying session mutably
    pub fn session_mut(&mut self) -> &mut DeviceSession<T> {
        &mut self.session
    }

    /// Receive pending device traffic without blocking beyond one poll
    pub fn pump(&mut self) -> Result<()> {
        self.session.pump()
    }

    /// Drain unsolicited notifications gathered so far
    pub fn drain_events(&mut self) -> Vec<Notification> {
        self.session.drain_events().collect()
    }

    /// Close the link; every later operation fails with `PortClosed`
    pub fn close(&mut self) {
        self.session.close();
    }

    /// Read the current heat block temperature in degrees Celsius
    pub fn read_temp(&mut self) -> Result<f64> {
        let reply = self
            .session
            .query(cmd::READ_TEMP, tag::TEMP, QUERY_TIMEOUT)?;
        parse_tagged_value(&reply).ok_or(SessionError::MalformedReply(reply))
    }

    /// Download and decode the device's stored program set
    ///
    /// Two wire operations: `GetEEPROMSize` announces the image length,
    /// `GetEEPROM` streams that many raw bytes.
    pub fn load_programs(&mut self) -> Result<ProgramSet> {
        let reply = self
            .session
            .query(cmd::GET_EEPROM_SIZE, tag::EEPROM_SIZE, QUERY_TIMEOUT)?;
        let size: usize =
            parse_tagged_value(&reply).ok_or(SessionError::MalformedReply(reply))?;
        log::info!("device reports a {} byte program image", size);

        self.session.send_command(cmd::GET_EEPROM)?;
        let image = self.session.read_binary_frame(size, EEPROM_FRAME_TIMEOUT)?;
        let set = eeprom::decode(&image)?;
        log::info!("loaded {} programs from the device", set.len());
        Ok(set)
    }

    /// Encode and upload a program set, replacing the device's stored one
    ///
    /// Asks the device for its settings buffer capacity first; encoding
    /// fails before any byte is sent if the set does not fit. Returns the
    /// number of image bytes written.
    pub fn upload_programs(&mut self, set: &ProgramSet) -> Result<usize> {
        let reply = self.session.query(
            cmd::GET_MAX_EEPROM_BUFFER,
            tag::MAX_EEPROM,
            MAX_BUFFER_TIMEOUT,
        )?;
        let max: usize =
            parse_tagged_value(&reply).ok_or(SessionError::MalformedReply(reply))?;
        log::info!("device settings buffer holds up to {} bytes", max);

        let image = eeprom::encode(set, max)?;
        self.session.send_command(cmd::SEND_EEPROM)?;
        self.session.send_raw(&image)?;
        log::info!("uploaded {} byte program image", image.len());
        Ok(image.len())
    }

    /// Start the stored program at `index`
    pub fn run_program(&mut self, index: usize) -> Result<()> {
        self.session.send_command(&cmd::run_program(index))
    }

    /// Poll the live run counters
    ///
    /// `Ok(None)` means the reply was malformed or short; the caller keeps
    /// its previous snapshot.
    pub fn query_run_status(&mut self) -> Result<Option<RunStatus>> {
        let reply = self.session.query(
            cmd::QUERY_RUNNING_PCR,
            tag::PCR_STATE,
            RUN_STATUS_TIMEOUT,
        )?;
        Ok(protocol::parse_run_status(&reply))
    }

    /// Simulate a press of the rotary dial button
    pub fn push_button(&mut self) -> Result<()> {
        self.session.send_command(cmd::PUSH_BUTTON)
    }

    /// Simulate a press while the cancel prompt is on screen
    pub fn push_button_cancel(&mut self) -> Result<()> {
        self.session.send_command(cmd::PUSH_BUTTON_CANCEL)
    }

    /// Move the device's on-screen selector
    pub fn set_selector(&mut self, position: usize) -> Result<()> {
        self.session.send_command(&cmd::set_selector(position))
    }

    /// Hold the heat block at a fixed temperature
    pub fn set_block_temp(&mut self, temperature_c: f64) -> Result<()> {
        self.session.send_command(&cmd::block(temperature_c))
    }

    /// Turn the heat block off
    pub fn block_off(&mut self) -> Result<()> {
        self.session.send_command(cmd::BLOCK_OFF)
    }

    /// Read the device's maximum settings buffer size in bytes
    pub fn max_buffer_size(&mut self) -> Result<usize> {
        let reply = self.session.query(
            cmd::GET_MAX_EEPROM_BUFFER,
            tag::MAX_EEPROM,
            MAX_BUFFER_TIMEOUT,
        )?;
        parse_tagged_value(&reply).ok_or(SessionError::MalformedReply(reply))
    }
}
