//! In-memory thermocycling program model
//!
//! A [`ProgramSet`] holds an ordered list of [`Program`]s, each an ordered
//! list of [`Cycle`]s, each an ordered list of temperature/time [`Block`]s.
//! Entities are owned exclusively by their container and are always located
//! by index; editing operations keep the derived caches (`total_cycles`,
//! the name index) consistent.

use std::collections::BTreeMap;

use crate::error::ModelError;

/// Lowest temperature representable in the device's fixed-point wire format.
pub const TEMP_MIN_C: f64 = -327.68;
/// Highest temperature representable in the device's fixed-point wire format.
pub const TEMP_MAX_C: f64 = 327.67;
/// Longest hold time representable as an unsigned 16-bit second count.
pub const HOLD_MAX_SECONDS: u32 = 65_535;

/// Default step inserted when growing an (invariant-violating) empty cycle.
const DEFAULT_BLOCK: Block = Block {
    temperature_c: 50.0,
    hold_seconds: 20,
};

/// What an editing operation did, from the collaborator's point of view
///
/// Collaborators (the CLI, an editing UI) receive plain facts, never
/// geometry: `Redraw` means the displayed structure or a value that
/// affects transition drawing changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// Value accepted; nothing displayed needs to change shape
    Quiet,
    /// Structure or displayed geometry changed; collaborators should redraw
    Redraw,
    /// A repeat count of zero or less asks for the cycle to be removed;
    /// nothing was mutated, confirmation is the caller's concern
    RemovalRequested,
}

/// One temperature/time step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    /// Target temperature in degrees Celsius
    pub temperature_c: f64,
    /// Seconds to hold at the target temperature
    pub hold_seconds: u32,
}

impl Block {
    /// Create a step
    pub fn new(temperature_c: f64, hold_seconds: u32) -> Self {
        Self {
            temperature_c,
            hold_seconds,
        }
    }
}

/// An ordered run of blocks repeated `repeat_count` times
///
/// Invariant: at least one block. A repeat count of zero or less is a
/// removal request, never a storable state.
#[derive(Debug, Clone, PartialEq)]
pub struct Cycle {
    blocks: Vec<Block>,
    repeat_count: i32,
}

impl Cycle {
    /// Create a cycle from steps and a repeat count
    pub fn new(blocks: Vec<Block>, repeat_count: i32) -> Self {
        Self {
            blocks,
            repeat_count,
        }
    }

    /// The temperature/time steps, in execution order
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// How many times this cycle repeats
    pub fn repeat_count(&self) -> i32 {
        self.repeat_count
    }
}

/// A named ordered sequence of cycles representing a full run
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    name: String,
    cycles: Vec<Cycle>,
    /// Derived cache: sum of every cycle's repeat count. Recomputed after
    /// each structural change, never trusted as a source of truth.
    total_cycles: i32,
}

impl Program {
    /// Create an empty program
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cycles: Vec::new(),
            total_cycles: 0,
        }
    }

    /// Create a program from already-built cycles
    pub fn with_cycles(name: impl Into<String>, cycles: Vec<Cycle>) -> Self {
        let mut program = Self {
            name: name.into(),
            cycles,
            total_cycles: 0,
        };
        program.recount();
        program
    }

    /// Program name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The cycles, in execution order
    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    /// Sum of every cycle's repeat count (derived cache)
    pub fn total_cycles(&self) -> i32 {
        self.total_cycles
    }

    /// Wall-clock estimate for a full run, ignoring ramp times
    pub fn estimated_seconds(&self) -> u64 {
        self.cycles
            .iter()
            .map(|c| {
                let per_pass: u64 = c.blocks.iter().map(|b| u64::from(b.hold_seconds)).sum();
                per_pass * c.repeat_count.max(0) as u64
            })
            .sum()
    }

    /// Recompute `total_cycles` from the cycle list
    pub fn recount(&mut self) {
        self.total_cycles = self.cycles.iter().map(|c| c.repeat_count).sum();
    }

    /// Change a block's target temperature
    ///
    /// Accepted values are finite and within the wire-representable range.
    /// A changed temperature asks for a redraw because displayed transition
    /// geometry depends on it.
    pub fn set_block_temperature(
        &mut self,
        cycle: usize,
        block: usize,
        value: f64,
    ) -> Result<EditOutcome, ModelError> {
        if !value.is_finite() || !(TEMP_MIN_C..=TEMP_MAX_C).contains(&value) {
            return Err(ModelError::Validation {
                field: "temperature",
                value,
                min: TEMP_MIN_C,
                max: TEMP_MAX_C,
            });
        }
        let slot = self.block_mut(cycle, block)?;
        if slot.temperature_c == value {
            return Ok(EditOutcome::Quiet);
        }
        slot.temperature_c = value;
        Ok(EditOutcome::Redraw)
    }

    /// Change a block's hold time in seconds
    pub fn set_block_hold_seconds(
        &mut self,
        cycle: usize,
        block: usize,
        value: u32,
    ) -> Result<EditOutcome, ModelError> {
        if value > HOLD_MAX_SECONDS {
            return Err(ModelError::Validation {
                field: "hold time",
                value: f64::from(value),
                min: 0.0,
                max: f64::from(HOLD_MAX_SECONDS),
            });
        }
        let slot = self.block_mut(cycle, block)?;
        slot.hold_seconds = value;
        Ok(EditOutcome::Quiet)
    }

    /// Append a step to a cycle by duplicating its last block
    ///
    /// The empty-cycle branch inserts a 50 degC / 20 s default; it cannot
    /// occur while the one-block invariant holds but is kept as written in
    /// case an editing path ever produces an empty cycle.
    pub fn grow_cycle(&mut self, cycle: usize) -> Result<EditOutcome, ModelError> {
        let cycle = self.cycle_mut(cycle)?;
        let step = cycle.blocks.last().copied().unwrap_or(DEFAULT_BLOCK);
        cycle.blocks.push(step);
        Ok(EditOutcome::Redraw)
    }

    /// Drop the last step of a cycle
    pub fn shrink_cycle(&mut self, cycle: usize) -> Result<EditOutcome, ModelError> {
        let cycle = self.cycle_mut(cycle)?;
        if cycle.blocks.len() <= 1 {
            return Err(ModelError::CannotRemoveLastBlock);
        }
        cycle.blocks.pop();
        Ok(EditOutcome::Redraw)
    }

    /// Change how many times a cycle repeats
    ///
    /// A value of zero or less signals removal intent and mutates nothing;
    /// the caller decides whether to follow up with [`Program::remove_cycle`].
    pub fn set_cycle_repeat_count(
        &mut self,
        cycle: usize,
        count: i32,
    ) -> Result<EditOutcome, ModelError> {
        let slot = self.cycle_mut(cycle)?;
        if count <= 0 {
            return Ok(EditOutcome::RemovalRequested);
        }
        if slot.repeat_count != count {
            slot.repeat_count = count;
            self.recount();
        }
        Ok(EditOutcome::Quiet)
    }

    /// Insert a fresh 3-step cycle template before `index`
    pub fn insert_cycle_before(&mut self, index: usize) -> Result<EditOutcome, ModelError> {
        if index > self.cycles.len() {
            return Err(ModelError::IndexOutOfRange {
                what: "cycle",
                index,
            });
        }
        self.cycles.insert(index, amplify_template());
        self.recount();
        Ok(EditOutcome::Redraw)
    }

    /// Remove a cycle
    pub fn remove_cycle(&mut self, index: usize) -> Result<EditOutcome, ModelError> {
        if index >= self.cycles.len() {
            return Err(ModelError::IndexOutOfRange {
                what: "cycle",
                index,
            });
        }
        self.cycles.remove(index);
        self.recount();
        Ok(EditOutcome::Redraw)
    }

    fn cycle_mut(&mut self, index: usize) -> Result<&mut Cycle, ModelError> {
        self.cycles.get_mut(index).ok_or(ModelError::IndexOutOfRange {
            what: "cycle",
            index,
        })
    }

    fn block_mut(&mut self, cycle: usize, block: usize) -> Result<&mut Block, ModelError> {
        self.cycle_mut(cycle)?
            .blocks
            .get_mut(block)
            .ok_or(ModelError::IndexOutOfRange {
                what: "block",
                index: block,
            })
    }
}

/// The standard denature/amplify/extend/hold cycle for the amplify step
fn amplify_template() -> Cycle {
    Cycle::new(
        vec![
            Block::new(95.0, 15),
            Block::new(56.0, 15),
            Block::new(72.0, 15),
        ],
        1,
    )
}

/// The ordered collection of programs mirrored to/from the device
///
/// `name_index` is a derived lookup cache rebuilt wholesale after every
/// structural change: list order is authoritative, and on duplicate names
/// the first occurrence wins while later duplicates are absent from the
/// index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgramSet {
    programs: Vec<Program>,
    name_index: BTreeMap<String, usize>,
}

impl ProgramSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from decoded or imported programs
    ///
    /// Derived caches are recomputed; nothing from the source is trusted.
    pub fn from_programs(mut programs: Vec<Program>) -> Self {
        for program in &mut programs {
            program.recount();
        }
        let mut set = Self {
            programs,
            name_index: BTreeMap::new(),
        };
        set.rebuild_index();
        set
    }

    /// Number of programs
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// True when the set holds no programs
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// The programs, in device order
    pub fn programs(&self) -> &[Program] {
        &self.programs
    }

    /// A program by position
    pub fn program(&self, index: usize) -> Option<&Program> {
        self.programs.get(index)
    }

    /// Mutable access to a program for block/cycle editing
    ///
    /// Renaming goes through [`ProgramSet::rename_program`] so the name
    /// index stays consistent.
    pub fn program_mut(&mut self, index: usize) -> Option<&mut Program> {
        self.programs.get_mut(index)
    }

    /// Resolve a name through the index (first occurrence wins)
    pub fn find(&self, name: &str) -> Option<&Program> {
        self.name_index.get(name).map(|&i| &self.programs[i])
    }

    /// Append a new program built from the standard 4-cycle template
    ///
    /// Returns the new program's index.
    pub fn add_program(&mut self, name: impl Into<String>) -> usize {
        let program = Program::with_cycles(
            name,
            vec![
                // denature
                Cycle::new(vec![Block::new(95.0, 180)], 1),
                // amplify
                Cycle::new(
                    vec![
                        Block::new(95.0, 15),
                        Block::new(56.0, 15),
                        Block::new(72.0, 15),
                    ],
                    35,
                ),
                // extend
                Cycle::new(vec![Block::new(72.0, 120)], 1),
                // hold
                Cycle::new(vec![Block::new(25.0, 21_000)], 1),
            ],
        );
        self.programs.push(program);
        self.rebuild_index();
        self.programs.len() - 1
    }

    /// Remove a program
    pub fn remove_program(&mut self, index: usize) -> Result<EditOutcome, ModelError> {
        if index >= self.programs.len() {
            return Err(ModelError::IndexOutOfRange {
                what: "program",
                index,
            });
        }
        self.programs.remove(index);
        self.rebuild_index();
        Ok(EditOutcome::Redraw)
    }

    /// Rename a program
    pub fn rename_program(
        &mut self,
        index: usize,
        name: impl Into<String>,
    ) -> Result<EditOutcome, ModelError> {
        let program = self
            .programs
            .get_mut(index)
            .ok_or(ModelError::IndexOutOfRange {
                what: "program",
                index,
            })?;
        program.name = name.into();
        self.rebuild_index();
        Ok(EditOutcome::Redraw)
    }

    /// Rebuild the name lookup cache from the program list
    pub fn rebuild_index(&mut self) {
        self.name_index.clear();
        for (position, program) in self.programs.iter().enumerate() {
            if !self.name_index.contains_key(program.name()) {
                self.name_index.insert(program.name().to_owned(), position);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_cycle_program() -> Program {
        Program::with_cycles(
            "test",
            vec![
                Cycle::new(vec![Block::new(95.0, 15)], 1),
                Cycle::new(vec![Block::new(72.0, 30), Block::new(60.0, 10)], 35),
            ],
        )
    }

    #[test]
    fn recount_tracks_repeat_edits() {
        let mut program = two_cycle_program();
        assert_eq!(program.total_cycles(), 36);

        program.set_cycle_repeat_count(1, 10).unwrap();
        assert_eq!(program.total_cycles(), 11);

        program.insert_cycle_before(0).unwrap();
        assert_eq!(program.total_cycles(), 12);

        program.remove_cycle(2).unwrap();
        let expected: i32 = program.cycles().iter().map(Cycle::repeat_count).sum();
        assert_eq!(program.total_cycles(), expected);
    }

    #[test]
    fn repeat_count_of_zero_is_removal_intent() {
        let mut program = two_cycle_program();
        let outcome = program.set_cycle_repeat_count(1, 0).unwrap();
        assert_eq!(outcome, EditOutcome::RemovalRequested);
        // Nothing was mutated.
        assert_eq!(program.cycles()[1].repeat_count(), 35);
        assert_eq!(program.total_cycles(), 36);
    }

    #[test]
    fn grow_duplicates_last_block() {
        let mut program = Program::with_cycles(
            "grow",
            vec![Cycle::new(vec![Block::new(95.0, 15)], 1)],
        );
        program.grow_cycle(0).unwrap();
        assert_eq!(
            program.cycles()[0].blocks(),
            &[Block::new(95.0, 15), Block::new(95.0, 15)]
        );
    }

    #[test]
    fn shrink_refuses_last_block() {
        let mut program = Program::with_cycles(
            "shrink",
            vec![Cycle::new(vec![Block::new(95.0, 15)], 1)],
        );
        assert_eq!(
            program.shrink_cycle(0),
            Err(ModelError::CannotRemoveLastBlock)
        );
        assert_eq!(program.cycles()[0].blocks().len(), 1);
    }

    #[test]
    fn temperature_validation_rejects_out_of_range() {
        let mut program = two_cycle_program();
        assert!(matches!(
            program.set_block_temperature(0, 0, f64::NAN),
            Err(ModelError::Validation { .. })
        ));
        assert!(matches!(
            program.set_block_temperature(0, 0, 400.0),
            Err(ModelError::Validation { .. })
        ));
        // Field left unmodified on failure.
        assert_eq!(program.cycles()[0].blocks()[0].temperature_c, 95.0);
    }

    #[test]
    fn temperature_change_requests_redraw() {
        let mut program = two_cycle_program();
        assert_eq!(
            program.set_block_temperature(0, 0, 94.0).unwrap(),
            EditOutcome::Redraw
        );
        assert_eq!(
            program.set_block_temperature(0, 0, 94.0).unwrap(),
            EditOutcome::Quiet
        );
        assert_eq!(
            program.set_block_hold_seconds(0, 0, 45).unwrap(),
            EditOutcome::Quiet
        );
    }

    #[test]
    fn name_index_prefers_first_occurrence() {
        let mut set = ProgramSet::from_programs(vec![
            Program::with_cycles("A", vec![Cycle::new(vec![Block::new(95.0, 1)], 1)]),
            Program::with_cycles("B", vec![Cycle::new(vec![Block::new(72.0, 2)], 2)]),
            Program::with_cycles("A", vec![Cycle::new(vec![Block::new(25.0, 3)], 3)]),
        ]);
        let found = set.find("A").unwrap();
        assert_eq!(found.cycles()[0].blocks()[0].temperature_c, 95.0);

        // Removing the first "A" promotes the duplicate.
        set.remove_program(0).unwrap();
        let found = set.find("A").unwrap();
        assert_eq!(found.cycles()[0].blocks()[0].temperature_c, 25.0);
    }

    #[test]
    fn add_program_uses_standard_template() {
        let mut set = ProgramSet::new();
        let index = set.add_program("Standard");
        let program = set.program(index).unwrap();
        assert_eq!(program.cycles().len(), 4);
        assert_eq!(program.total_cycles(), 38);
        assert_eq!(program.cycles()[1].blocks().len(), 3);
        assert_eq!(program.cycles()[3].blocks()[0].hold_seconds, 21_000);
        assert!(set.find("Standard").is_some());
    }

    #[test]
    fn rename_rebuilds_index() {
        let mut set = ProgramSet::new();
        set.add_program("Old");
        set.rename_program(0, "New").unwrap();
        assert!(set.find("Old").is_none());
        assert!(set.find("New").is_some());
    }
}
