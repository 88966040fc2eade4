//! Program interchange documents
//!
//! A hierarchical document mirroring the in-memory model exactly:
//! `Program { Name, Cycles[ Cycle { RepeatCount, Blocks[ Block {
//! Temperature, HoldSeconds } ] } ] }`. Round-tripping through a document
//! reproduces the model field for field; derived caches are recomputed on
//! import rather than stored. Serialized as RON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DocumentError;
use crate::model::{Block, Cycle, Program, ProgramSet};

/// Top-level interchange document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramDocument {
    /// Programs in device order
    pub programs: Vec<DocProgram>,
}

/// One program as exported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "Program")]
pub struct DocProgram {
    /// Program name
    pub name: String,
    /// Cycles in execution order
    pub cycles: Vec<DocCycle>,
}

/// One cycle as exported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "Cycle")]
pub struct DocCycle {
    /// How many times the cycle repeats
    pub repeat_count: i32,
    /// Temperature/time steps
    pub blocks: Vec<DocBlock>,
}

/// One temperature/time step as exported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "Block")]
pub struct DocBlock {
    /// Target temperature in degrees Celsius
    pub temperature: f64,
    /// Seconds to hold at the target
    pub hold_seconds: u32,
}

impl ProgramDocument {
    /// Snapshot a program set into a document
    pub fn from_set(set: &ProgramSet) -> Self {
        Self {
            programs: set
                .programs()
                .iter()
                .map(|program| DocProgram {
                    name: program.name().to_owned(),
                    cycles: program
                        .cycles()
                        .iter()
                        .map(|cycle| DocCycle {
                            repeat_count: cycle.repeat_count(),
                            blocks: cycle
                                .blocks()
                                .iter()
                                .map(|block| DocBlock {
                                    temperature: block.temperature_c,
                                    hold_seconds: block.hold_seconds,
                                })
                                .collect(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    /// Rebuild an in-memory program set from the document
    pub fn into_set(self) -> ProgramSet {
        ProgramSet::from_programs(
            self.programs
                .into_iter()
                .map(|program| {
                    Program::with_cycles(
                        program.name,
                        program
                            .cycles
                            .into_iter()
                            .map(|cycle| {
                                Cycle::new(
                                    cycle
                                        .blocks
                                        .into_iter()
                                        .map(|block| Block::new(block.temperature, block.hold_seconds))
                                        .collect(),
                                    cycle.repeat_count,
                                )
                            })
                            .collect(),
                    )
                })
                .collect(),
        )
    }

    /// Write the document to a file
    pub fn save_file(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Read a document from a file
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let text = fs::read_to_string(path)?;
        Ok(ron::from_str(&text)?)
    }
}
