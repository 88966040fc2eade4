//! Transport layer abstraction for the device link
//!
//! Provides a unified interface for serial and TCP transports. The session
//! layer only ever needs a blocking write and a bounded, non-blocking read;
//! all protocol timing lives above this trait.

use crate::error::{Result, SessionError};

/// Byte transport to the device
pub trait Transport {
    /// Write bytes to the transport
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Read up to `buf.len()` bytes, waiting at most `timeout_ms`
    /// milliseconds. Returns the number of bytes read, 0 on timeout.
    fn read_nonblock(&mut self, buf: &mut [u8], timeout_ms: u64) -> Result<usize>;

    /// Flush any buffered output
    fn flush(&mut self) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn read_nonblock(&mut self, buf: &mut [u8], timeout_ms: u64) -> Result<usize> {
        (**self).read_nonblock(buf, timeout_ms)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

pub mod serial {
    //! Serial port transport implementation

    use super::*;
    use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
    use std::io::{Read, Write};
    use std::time::Duration;

    /// Serial port transport
    pub struct SerialTransport {
        port: Box<dyn SerialPort>,
    }

    impl SerialTransport {
        /// Open a serial port at the given baud rate (8N1, DTR asserted)
        ///
        /// The device resets when DTR toggles, so DTR is raised once here
        /// and left alone afterwards.
        pub fn open(device: &str, baud: u32) -> Result<Self> {
            let mut port = serialport::new(device, baud)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::One)
                .flow_control(FlowControl::None)
                .timeout(Duration::from_secs(5))
                .open()?;
            port.write_data_terminal_ready(true)?;

            log::info!("Opened serial port {} at {} baud", device, baud);

            Ok(Self { port })
        }
    }

    impl Transport for SerialTransport {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.port.write_all(data)?;
            Ok(())
        }

        fn read_nonblock(&mut self, buf: &mut [u8], timeout_ms: u64) -> Result<usize> {
            let old_timeout = self.port.timeout();
            self.port.set_timeout(Duration::from_millis(timeout_ms))?;

            let result = match self.port.read(buf) {
                Ok(n) => Ok(n),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
                Err(e) => Err(SessionError::from(e)),
            };

            self.port.set_timeout(old_timeout)?;
            result
        }

        fn flush(&mut self) -> Result<()> {
            self.port.flush()?;
            Ok(())
        }
    }
}

pub mod tcp {
    //! TCP socket transport, for devices behind a serial-over-network bridge

    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::time::Duration;

    /// TCP socket transport
    pub struct TcpTransport {
        stream: TcpStream,
    }

    impl TcpTransport {
        /// Connect to a device bridge at the specified host and port
        pub fn connect(host: &str, port: u16) -> Result<Self> {
            let addr = format!("{}:{}", host, port);
            log::info!("Connecting to device bridge at {}", addr);

            let stream = TcpStream::connect(&addr)
                .map_err(|e| SessionError::ConnectionFailed(e.to_string()))?;

            stream.set_nodelay(true).map_err(|e| {
                SessionError::ConnectionFailed(format!("Failed to set TCP_NODELAY: {}", e))
            })?;
            stream
                .set_read_timeout(Some(Duration::from_secs(5)))
                .map_err(|e| {
                    SessionError::ConnectionFailed(format!("Failed to set read timeout: {}", e))
                })?;

            Ok(Self { stream })
        }
    }

    impl Transport for TcpTransport {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.stream.write_all(data)?;
            Ok(())
        }

        fn read_nonblock(&mut self, buf: &mut [u8], timeout_ms: u64) -> Result<usize> {
            self.stream
                .set_read_timeout(Some(Duration::from_millis(timeout_ms.max(1))))?;

            let result = match self.stream.read(buf) {
                Ok(n) => Ok(n),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
                Err(e) => Err(SessionError::from(e)),
            };

            self.stream.set_read_timeout(Some(Duration::from_secs(5)))?;
            result
        }

        fn flush(&mut self) -> Result<()> {
            self.stream.flush()?;
            Ok(())
        }
    }
}
