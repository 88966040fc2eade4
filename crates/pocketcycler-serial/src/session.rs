//! Device session: line accumulation, tagged queries, binary frames and
//! unsolicited notifications
//!
//! The session owns the single physical link. Everything above it follows
//! one cooperative discipline: at most one tagged query is outstanding at a
//! time, periodic work checks `query_in_flight` before issuing anything,
//! and every wait is a bounded poll loop that observes a closed port within
//! one poll granularity.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::error::{Result, SessionError};
use crate::protocol::{self, Notification, POLL_GRANULARITY};
use crate::transport::Transport;

/// Binary payload being collected instead of text
struct BinaryFrame {
    expected: usize,
    collected: Vec<u8>,
}

/// The single owner of the physical device link
pub struct DeviceSession<T: Transport> {
    pub(crate) transport: T,
    /// Raw inbound bytes not yet split into lines
    buf: Vec<u8>,
    /// Complete lines awaiting dispatch
    lines: VecDeque<String>,
    /// Armed while an EEPROM image is being received
    frame: Option<BinaryFrame>,
    /// Parsed unsolicited notifications awaiting subscribers
    events: VecDeque<Notification>,
    query_in_flight: bool,
    open: bool,
}

impl<T: Transport> DeviceSession<T> {
    /// Wrap a transport in a session
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            buf: Vec::new(),
            lines: VecDeque::new(),
            frame: None,
            events: VecDeque::new(),
            query_in_flight: false,
            open: true,
        }
    }

    /// True until [`DeviceSession::close`] is called
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// True while a tagged query is outstanding
    ///
    /// Periodic activities check this and skip their tick instead of
    /// interleaving a second query.
    pub fn query_in_flight(&self) -> bool {
        self.query_in_flight
    }

    /// Close the session
    ///
    /// Any in-progress wait observes the closed port on its next poll
    /// iteration and fails with [`SessionError::PortClosed`]; periodic
    /// activity driven through this session halts with it.
    pub fn close(&mut self) {
        self.open = false;
        self.buf.clear();
        self.lines.clear();
        self.frame = None;
        log::info!("session closed");
    }

    /// Send a newline-terminated command line
    pub fn send_command(&mut self, command: &str) -> Result<()> {
        self.check_open()?;
        log::debug!("-> {}", command);
        self.transport.write(command.as_bytes())?;
        self.transport.write(b"\n")?;
        self.transport.flush()?;
        Ok(())
    }

    /// Send raw bytes (the EEPROM image following `SendEEPROM`)
    pub fn send_raw(&mut self, data: &[u8]) -> Result<()> {
        self.check_open()?;
        log::debug!("-> {} raw bytes", data.len());
        self.transport.write(data)?;
        self.transport.flush()?;
        Ok(())
    }

    /// Receive whatever the device has pushed, waiting at most one poll
    /// granularity
    ///
    /// Completed unsolicited lines are parsed into notifications and
    /// queued; call [`DeviceSession::drain_events`] to consume them.
    pub fn pump(&mut self) -> Result<()> {
        self.check_open()?;
        self.pump_once(POLL_GRANULARITY)?;
        self.dispatch_lines(None);
        Ok(())
    }

    /// Drain queued unsolicited notifications in arrival order
    pub fn drain_events(&mut self) -> impl Iterator<Item = Notification> + '_ {
        self.events.drain(..)
    }

    /// Send a command and wait for the reply line carrying `tag`
    ///
    /// Unsolicited notifications that arrive in between are queued, not
    /// consumed by the wait. On timeout the accumulated text buffer is
    /// cleared and no partial state is applied.
    pub fn query(&mut self, command: &str, tag: &str, timeout: Duration) -> Result<String> {
        self.check_open()?;
        if self.query_in_flight {
            return Err(SessionError::LinkBusy);
        }
        self.query_in_flight = true;
        let result = self.query_inner(command, tag, timeout);
        self.query_in_flight = false;
        if matches!(result, Err(SessionError::Timeout)) {
            self.buf.clear();
            self.lines.clear();
        }
        result
    }

    fn query_inner(&mut self, command: &str, tag: &str, timeout: Duration) -> Result<String> {
        self.send_command(command)?;
        let deadline = Instant::now() + timeout;
        loop {
            self.check_open()?;
            if let Some(reply) = self.dispatch_lines(Some(tag)) {
                log::debug!("<- {}", reply);
                return Ok(reply);
            }
            if Instant::now() >= deadline {
                log::warn!("query {:?} timed out waiting for {:?}", command, tag);
                return Err(SessionError::Timeout);
            }
            self.pump_once(POLL_GRANULARITY)?;
        }
    }

    /// Collect an opaque binary payload of exactly `len` bytes
    ///
    /// Bytes already sitting in the text buffer are claimed first: the
    /// device starts streaming immediately after its `EEPROMSize:` reply,
    /// so the image's head may have raced the caller.
    pub fn read_binary_frame(&mut self, len: usize, timeout: Duration) -> Result<Vec<u8>> {
        self.check_open()?;
        let mut frame = BinaryFrame {
            expected: len,
            collected: Vec::with_capacity(len),
        };
        let carried = self.buf.len().min(len);
        frame.collected.extend(self.buf.drain(..carried));
        self.frame = Some(frame);

        let deadline = Instant::now() + timeout;
        loop {
            self.check_open()?;
            let done = self
                .frame
                .as_ref()
                .is_some_and(|f| f.collected.len() >= f.expected);
            if done {
                if let Some(frame) = self.frame.take() {
                    log::debug!("<- {} byte binary frame", frame.collected.len());
                    return Ok(frame.collected);
                }
            }
            if Instant::now() >= deadline {
                self.frame = None;
                return Err(SessionError::Timeout);
            }
            self.pump_once(POLL_GRANULARITY)?;
        }
    }

    /// One bounded read, routing bytes to the binary frame or the text buffer
    fn pump_once(&mut self, wait: Duration) -> Result<()> {
        let mut chunk = [0u8; 256];
        let n = self
            .transport
            .read_nonblock(&mut chunk, wait.as_millis() as u64)?;
        if n == 0 {
            return Ok(());
        }
        let mut bytes = &chunk[..n];
        if let Some(frame) = self.frame.as_mut() {
            let want = frame.expected - frame.collected.len();
            let take = want.min(bytes.len());
            frame.collected.extend_from_slice(&bytes[..take]);
            bytes = &bytes[take..];
        }
        self.buf.extend_from_slice(bytes);
        self.split_lines();
        Ok(())
    }

    /// Move completed lines out of the byte buffer
    fn split_lines(&mut self) {
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line);
            let text = text.trim_end_matches(['\n', '\r']);
            if !text.is_empty() {
                self.lines.push_back(text.to_owned());
            }
        }
    }

    /// Dispatch queued lines; with a tag, return the first line carrying it
    ///
    /// Known notifications are queued as events regardless of whether a
    /// query is waiting; anything else is dropped.
    fn dispatch_lines(&mut self, tag: Option<&str>) -> Option<String> {
        while let Some(line) = self.lines.pop_front() {
            if let Some(tag) = tag {
                if line.contains(tag) {
                    return Some(line);
                }
            }
            match protocol::parse_notification(&line) {
                Some(event) => {
                    log::debug!("<- event {:?}", event);
                    self.events.push_back(event);
                }
                None => log::debug!("<- dropping line {:?}", line),
            }
        }
        None
    }

    fn check_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(SessionError::PortClosed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    fn session_with(chunks: &[&[u8]]) -> DeviceSession<MockTransport> {
        let mut transport = MockTransport::new();
        for chunk in chunks {
            transport.push_chunk(chunk);
        }
        DeviceSession::new(transport)
    }

    #[test]
    fn tagged_query_returns_reply() {
        let mut session = session_with(&[b"temp:23.41\n"]);
        let reply = session
            .query("ReadTemp", "temp:", Duration::from_millis(100))
            .unwrap();
        assert_eq!(reply, "temp:23.41");
        assert_eq!(session.transport.written_lines(), vec!["ReadTemp"]);
    }

    #[test]
    fn notifications_interleaved_with_reply_do_not_corrupt_it() {
        // The device pushes a counter move and a button press in separate
        // chunks, split mid-line, before the actual reply arrives.
        let mut session = session_with(&[
            b"counter:",
            b"3\nButton",
            b" Pushed\ntemp:95.12\n",
        ]);
        let reply = session
            .query("ReadTemp", "temp:", Duration::from_millis(200))
            .unwrap();
        assert_eq!(reply, "temp:95.12");

        let events: Vec<_> = session.drain_events().collect();
        assert_eq!(
            events,
            vec![Notification::Counter(3), Notification::ButtonPushed]
        );
    }

    #[test]
    fn timeout_clears_the_buffer() {
        let mut session = session_with(&[b"partial reply without newline"]);
        let err = session
            .query("ReadTemp", "temp:", Duration::from_millis(50))
            .unwrap_err();
        assert!(matches!(err, SessionError::Timeout));

        // A later query starts from a clean buffer.
        session.transport.push_chunk(b"temp:20.00\n");
        let reply = session
            .query("ReadTemp", "temp:", Duration::from_millis(100))
            .unwrap();
        assert_eq!(reply, "temp:20.00");
    }

    #[test]
    fn binary_frame_bypasses_the_text_buffer() {
        let mut session = session_with(&[b"EEPROMSize:6\n"]);
        let reply = session
            .query("GetEEPROMSize", "EEPROMSize:", Duration::from_millis(100))
            .unwrap();
        assert_eq!(reply, "EEPROMSize:6");

        session.transport.push_chunk([254u8, 0, 6, 0, b'\n', 7]);
        let frame = session
            .read_binary_frame(6, Duration::from_millis(100))
            .unwrap();
        // The newline byte is payload, not a line terminator.
        assert_eq!(frame, vec![254, 0, 6, 0, b'\n', 7]);
        assert!(session.drain_events().next().is_none());
    }

    #[test]
    fn binary_frame_claims_bytes_that_raced_the_reply() {
        // Image head arrives in the same chunk as the size reply.
        let mut session = session_with(&[b"EEPROMSize:4\n\xfe\x00"]);
        session
            .query("GetEEPROMSize", "EEPROMSize:", Duration::from_millis(100))
            .unwrap();
        session.transport.push_chunk([4u8, 0]);
        let frame = session
            .read_binary_frame(4, Duration::from_millis(100))
            .unwrap();
        assert_eq!(frame, vec![0xfe, 0x00, 4, 0]);
    }

    #[test]
    fn closed_session_fails_fast() {
        let mut session = session_with(&[]);
        session.close();
        assert!(matches!(
            session.query("ReadTemp", "temp:", Duration::from_secs(2)),
            Err(SessionError::PortClosed)
        ));
        assert!(matches!(session.pump(), Err(SessionError::PortClosed)));
        assert!(matches!(
            session.read_binary_frame(4, Duration::from_secs(1)),
            Err(SessionError::PortClosed)
        ));
    }

    #[test]
    fn pump_queues_unsolicited_events() {
        let mut session = session_with(&[b"pcrStart:1,whatever\n", b"PCR Done\n"]);
        session.pump().unwrap();
        session.pump().unwrap();
        let events: Vec<_> = session.drain_events().collect();
        assert_eq!(
            events,
            vec![
                Notification::PcrStart { program: 1 },
                Notification::PcrDone
            ]
        );
    }
}
