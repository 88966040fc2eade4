//! PocketPCR wire protocol: commands, reply tags, timing contracts and
//! reply parsing
//!
//! The device speaks newline-terminated ASCII in both directions, with one
//! exception: immediately after answering `GetEEPROM` it streams the raw
//! binary EEPROM image whose length was announced by the preceding
//! `EEPROMSize:` reply.

use std::time::Duration;

/// Outbound command lines (sent newline-terminated)
pub mod cmd {
    /// Ask for the size of the stored EEPROM program image
    pub const GET_EEPROM_SIZE: &str = "GetEEPROMSize";
    /// Ask the device to stream the EEPROM image
    pub const GET_EEPROM: &str = "GetEEPROM";
    /// Announce an EEPROM upload; the raw image follows immediately
    pub const SEND_EEPROM: &str = "SendEEPROM";
    /// Ask for the device's maximum settings buffer size
    pub const GET_MAX_EEPROM_BUFFER: &str = "GetMaxEEPROMBuffer";
    /// Ask for the current block temperature
    pub const READ_TEMP: &str = "ReadTemp";
    /// Ask for a running-program status snapshot
    pub const QUERY_RUNNING_PCR: &str = "QueryRunningPCR";
    /// Press the rotary dial button
    pub const PUSH_BUTTON: &str = "PushButton";
    /// Press the button while the cancel prompt is shown
    pub const PUSH_BUTTON_CANCEL: &str = "PushButtonCancel";
    /// Turn the heat block off
    pub const BLOCK_OFF: &str = "Block Off";

    /// Start the program at `index`
    pub fn run_program(index: usize) -> String {
        format!("RunProgram,{index}")
    }

    /// Move the device's selector to `position`
    pub fn set_selector(position: usize) -> String {
        format!("SetSelector,{position}")
    }

    /// Hold the heat block at a fixed temperature
    pub fn block(temperature_c: f64) -> String {
        format!("Block {temperature_c}")
    }
}

/// Tags identifying tagged replies
pub mod tag {
    /// Reply to `ReadTemp`
    pub const TEMP: &str = "temp:";
    /// Reply to `GetEEPROMSize`
    pub const EEPROM_SIZE: &str = "EEPROMSize:";
    /// Reply to `GetMaxEEPROMBuffer`
    pub const MAX_EEPROM: &str = "MAXEEPROM:";
    /// Reply to `QueryRunningPCR`
    pub const PCR_STATE: &str = "pcrState:";
}

/// Deadline for temperature and EEPROM-size queries.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(2);
/// Deadline for run-status polls.
pub const RUN_STATUS_TIMEOUT: Duration = Duration::from_secs(3);
/// Deadline for the max-buffer-size query (the device may be busy writing).
pub const MAX_BUFFER_TIMEOUT: Duration = Duration::from_secs(10);
/// Deadline for the binary EEPROM image that follows an `EEPROMSize:` reply.
pub const EEPROM_FRAME_TIMEOUT: Duration = Duration::from_secs(2);

/// Granularity of a pending wait's poll loop; a closed port is observed
/// within this bound.
pub const POLL_GRANULARITY: Duration = Duration::from_millis(20);
/// Cadence of the idle block-temperature poll.
pub const TEMP_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Cadence of the run-status poll while a program is active.
pub const RUN_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Window for telling a single dial click from a double click.
pub const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(350);

/// Unsolicited lines the device pushes on its own
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// `counter:<n>` - the physical dial moved to an absolute position
    Counter(i32),
    /// `Button Pushed` - the physical dial button was pressed
    ButtonPushed,
    /// `PCR Done` - the running program finished
    PcrDone,
    /// `menu:<n>` - the device switched its top-level menu position
    Menu(i32),
    /// `pcrStart:<index>,...` - a program started running
    PcrStart {
        /// Index of the started program
        program: usize,
    },
}

/// Parse an unsolicited notification line
///
/// Returns `None` for anything that is not a known notification; such
/// lines are dropped by the session, matching the device's chatty boot
/// output.
pub fn parse_notification(line: &str) -> Option<Notification> {
    if let Some(rest) = line.strip_prefix("counter:") {
        return rest.trim().parse().ok().map(Notification::Counter);
    }
    if line.starts_with("Button Pushed") {
        return Some(Notification::ButtonPushed);
    }
    if line.starts_with("PCR Done") {
        return Some(Notification::PcrDone);
    }
    if let Some(rest) = line.strip_prefix("menu:") {
        return rest.trim().parse().ok().map(Notification::Menu);
    }
    if let Some(rest) = line.strip_prefix("pcrStart:") {
        let index = rest.split(',').next()?.trim().parse().ok()?;
        return Some(Notification::PcrStart { program: index });
    }
    None
}

/// Snapshot of the device's live run counters
///
/// Replaced wholesale on each successful poll; a failed or short poll
/// leaves the previous snapshot in place (stale but last known).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunStatus {
    /// Segment (cycle entry) currently executing, zero-based
    pub segment_index: u32,
    /// Block within the segment, zero-based
    pub block_index: u32,
    /// Repeat of the current segment, zero-based
    pub cycle_repeat_index: u32,
    /// Overall cycle counter across the whole program, zero-based
    pub overall_cycle_index: u32,
    /// Segments in the program
    pub total_segments: u32,
    /// Blocks in the current segment
    pub total_blocks: u32,
    /// Repeats of the current segment
    pub cycle_repeats: u32,
    /// Overall cycles in the whole program
    pub total_cycles: u32,
    /// Temperature the block is driving toward
    pub target_temp: f64,
    /// Measured block temperature
    pub block_temp: f64,
    /// Seconds spent in the current block
    pub elapsed_seconds: u32,
}

/// Parse a `pcrState:` reply line into a status snapshot
///
/// A reply with fewer than eleven fields is discarded (`None`), keeping
/// the caller's previous snapshot.
pub fn parse_run_status(line: &str) -> Option<RunStatus> {
    let payload = line.split_once(':')?.1;
    let fields: Vec<&str> = payload.split(',').collect();
    if fields.len() < 11 {
        log::debug!("discarding short pcrState reply ({} fields)", fields.len());
        return None;
    }
    let int = |i: usize| fields[i].trim().parse::<u32>().ok();
    let float = |i: usize| fields[i].trim().parse::<f64>().ok();
    Some(RunStatus {
        segment_index: int(0)?,
        block_index: int(1)?,
        cycle_repeat_index: int(2)?,
        overall_cycle_index: int(3)?,
        total_segments: int(4)?,
        total_blocks: int(5)?,
        cycle_repeats: int(6)?,
        total_cycles: int(7)?,
        target_temp: float(8)?,
        block_temp: float(9)?,
        elapsed_seconds: int(10)?,
    })
}

/// Parse a tagged numeric reply such as `temp:23.41` or `EEPROMSize:182`
pub fn parse_tagged_value<T: std::str::FromStr>(line: &str) -> Option<T> {
    line.split_once(':')?.1.trim().parse().ok()
}
