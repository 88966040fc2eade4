//! CLI command implementations
//!
//! Each command owns one session with the device (or none, for the
//! file-only commands) and surfaces errors as plain messages. The
//! interactive commands (`temp --watch`, `run`, `dial`) share the same
//! shape: a poll loop that pumps the session, reacts to notifications and
//! sleeps one poll granularity between iterations.

pub mod dial;
pub mod programs;
pub mod run;
pub mod temp;
pub mod transfer;
