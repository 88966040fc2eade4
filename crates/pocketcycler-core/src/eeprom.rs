//! Bit-exact codec for the device's settings EEPROM image
//!
//! Layout (all multi-byte integers big-endian):
//!
//! | offset      | field         | encoding                                  |
//! |-------------|---------------|-------------------------------------------|
//! | 0           | sentinel      | constant 254, "program structure present" |
//! | 1..3        | payload length| total bytes written, u16                  |
//! | 3           | program count | u8                                        |
//! | per program | name length   | u8, then that many raw name bytes         |
//! |             | cycle count   | u8                                        |
//! | per cycle   | block count   | u8                                        |
//! |             | repeat count  | u8                                        |
//! | per block   | temperature   | i16 = round(degC * 100)                   |
//! |             | hold seconds  | u16                                       |
//!
//! Count fields are one byte on the wire. Rather than truncating silently
//! the way the original firmware tooling did, [`encode`] rejects anything
//! above 255 with [`CodecError::LimitExceeded`], and [`decode`] verifies
//! the sentinel so a foreign buffer fails loudly instead of misparsing.

use crate::error::CodecError;
use crate::model::{Block, Cycle, Program, ProgramSet};

/// Marks a buffer as carrying a program structure.
pub const SENTINEL: u8 = 254;

/// Fixed bytes before the first program: sentinel, length, program count.
const HEADER_LEN: usize = 4;

/// One-byte ceiling for every count field.
const BYTE_MAX: i64 = 255;

/// Bytes required to encode the given set
pub fn encoded_len(set: &ProgramSet) -> usize {
    let mut total = HEADER_LEN;
    for program in set.programs() {
        total += 1 + program.name().len() + 1;
        for cycle in program.cycles() {
            total += 2 + cycle.blocks().len() * 4;
        }
    }
    total
}

/// Serialize a program set into an EEPROM image
///
/// Fails with [`CodecError::CapacityExceeded`] before building anything
/// when the image would not fit below `max_bytes`, and with
/// [`CodecError::LimitExceeded`] when the image would overflow the u16
/// payload-length header.
pub fn encode(set: &ProgramSet, max_bytes: usize) -> Result<Vec<u8>, CodecError> {
    check_limits(set)?;

    let required = encoded_len(set);
    if required > usize::from(u16::MAX) {
        return Err(CodecError::LimitExceeded {
            what: "image size",
            value: required as i64,
            max: i64::from(u16::MAX),
        });
    }
    if required >= max_bytes {
        return Err(CodecError::CapacityExceeded {
            required,
            max: max_bytes,
        });
    }

    let mut out = Vec::with_capacity(required);
    out.push(SENTINEL);
    out.extend_from_slice(&(required as u16).to_be_bytes());
    out.push(set.len() as u8);
    for program in set.programs() {
        out.push(program.name().len() as u8);
        out.extend_from_slice(program.name().as_bytes());
        out.push(program.cycles().len() as u8);
        for cycle in program.cycles() {
            out.push(cycle.blocks().len() as u8);
            out.push(cycle.repeat_count() as u8);
            for block in cycle.blocks() {
                let centi = (block.temperature_c * 100.0).round() as i16;
                out.extend_from_slice(&centi.to_be_bytes());
                out.extend_from_slice(&(block.hold_seconds as u16).to_be_bytes());
            }
        }
    }
    debug_assert_eq!(out.len(), required);
    log::debug!("encoded {} programs into {} bytes", set.len(), out.len());
    Ok(out)
}

/// Deserialize an EEPROM image into a fresh program set
///
/// The walk is driven by the embedded count fields; the payload length at
/// offset 1 is informational and not trusted. On any failure the caller's
/// previous set stays untouched because a new one is returned wholesale.
pub fn decode(buffer: &[u8]) -> Result<ProgramSet, CodecError> {
    if buffer.len() < HEADER_LEN {
        return Err(CodecError::TruncatedBuffer);
    }
    if buffer[0] != SENTINEL {
        return Err(CodecError::BadSentinel(buffer[0]));
    }

    let mut cursor = Cursor::new(&buffer[HEADER_LEN..]);
    let program_count = buffer[3] as usize;
    let mut programs = Vec::with_capacity(program_count);
    for _ in 0..program_count {
        let name_len = cursor.take_u8()? as usize;
        let name = String::from_utf8_lossy(cursor.take(name_len)?).into_owned();
        let cycle_count = cursor.take_u8()? as usize;
        let mut cycles = Vec::with_capacity(cycle_count);
        for _ in 0..cycle_count {
            let block_count = cursor.take_u8()? as usize;
            let repeat_count = i32::from(cursor.take_u8()?);
            let mut blocks = Vec::with_capacity(block_count);
            for _ in 0..block_count {
                let centi = i16::from_be_bytes(cursor.take_array()?);
                let hold = u16::from_be_bytes(cursor.take_array()?);
                blocks.push(Block::new(f64::from(centi) / 100.0, u32::from(hold)));
            }
            cycles.push(Cycle::new(blocks, repeat_count));
        }
        programs.push(Program::with_cycles(name, cycles));
    }

    log::debug!("decoded {} programs from {} bytes", programs.len(), buffer.len());
    Ok(ProgramSet::from_programs(programs))
}

/// Reject any count that would truncate in its one-byte wire field
fn check_limits(set: &ProgramSet) -> Result<(), CodecError> {
    let reject = |what, value: i64| {
        if value > BYTE_MAX || value < 0 {
            Err(CodecError::LimitExceeded {
                what,
                value,
                max: BYTE_MAX,
            })
        } else {
            Ok(())
        }
    };

    reject("program count", set.len() as i64)?;
    for program in set.programs() {
        reject("program name length", program.name().len() as i64)?;
        reject("cycle count", program.cycles().len() as i64)?;
        for cycle in program.cycles() {
            reject("block count", cycle.blocks().len() as i64)?;
            reject("repeat count", i64::from(cycle.repeat_count()))?;
        }
    }
    Ok(())
}

/// Forward-only reader that turns overruns into `TruncatedBuffer`
struct Cursor<'a> {
    data: &'a [u8],
    at: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, at: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let end = self.at.checked_add(len).ok_or(CodecError::TruncatedBuffer)?;
        if end > self.data.len() {
            return Err(CodecError::TruncatedBuffer);
        }
        let slice = &self.data[self.at..end];
        self.at = end;
        Ok(slice)
    }

    fn take_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}
