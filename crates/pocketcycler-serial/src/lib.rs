//! Serial control of the GaudiLabs PocketPCR thermocycler
//!
//! Talks the device's newline-terminated ASCII protocol over a serial port
//! or a TCP bridge. [`PocketPcr`] exposes the wire operations; the
//! [`dial`] and [`monitor`] modules mirror the device's rotary-dial menu
//! and keep a running program's status fresh. Everything runs on the
//! caller's thread: waits are bounded poll loops, never parked reads.
//!
//! ```no_run
//! use pocketcycler_serial::{open, Connection};
//!
//! # fn main() -> Result<(), pocketcycler_serial::SessionError> {
//! let conn: Connection = "/dev/ttyUSB0".parse()?;
//! let mut device = open(&conn, 115200)?;
//! println!("block at {:.2} C", device.read_temp()?);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod device;
pub mod dial;
pub mod error;
pub mod monitor;
pub mod protocol;
pub mod session;
pub mod transport;

pub use device::PocketPcr;
pub use dial::{ClickArbiter, ClickIntent, DialCommand, DialState, DialStateMachine};
pub use error::{Result, SessionError};
pub use monitor::RunMonitor;
pub use protocol::{Notification, RunStatus};
pub use session::DeviceSession;
pub use transport::Transport;

use std::str::FromStr;

use transport::serial::SerialTransport;
use transport::tcp::TcpTransport;

/// How to reach the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connection {
    /// Local serial port device path
    Serial(String),
    /// Serial-over-network bridge
    Tcp {
        /// Bridge hostname or address
        host: String,
        /// Bridge TCP port
        port: u16,
    },
}

impl FromStr for Connection {
    type Err = SessionError;

    /// Parse a connection spec: a device path, or `ip=<host>:<port>`
    fn from_str(spec: &str) -> Result<Self> {
        if let Some(rest) = spec.strip_prefix("ip=") {
            let (host, port) = rest.split_once(':').ok_or_else(|| {
                SessionError::ConnectionFailed(format!(
                    "invalid TCP spec {:?}, expected ip=<host>:<port>",
                    spec
                ))
            })?;
            let port = port.parse().map_err(|_| {
                SessionError::ConnectionFailed(format!("invalid TCP port {:?}", port))
            })?;
            return Ok(Connection::Tcp {
                host: host.to_owned(),
                port,
            });
        }
        Ok(Connection::Serial(spec.to_owned()))
    }
}

/// Open a connection and wrap it in a device handle
///
/// `baud` only applies to serial connections; a TCP bridge sets its own
/// line speed.
pub fn open(conn: &Connection, baud: u32) -> Result<PocketPcr<Box<dyn Transport>>> {
    let transport: Box<dyn Transport> = match conn {
        Connection::Serial(device) => Box::new(SerialTransport::open(device, baud)?),
        Connection::Tcp { host, port } => Box::new(TcpTransport::connect(host, *port)?),
    };
    Ok(PocketPcr::new(transport))
}
