//! pocketcycler-core - Program data model and EEPROM codec
//!
//! Device-independent half of the PocketPCR controller: the in-memory
//! thermocycling program model with its editing operations, the bit-exact
//! codec for the device's settings EEPROM image, and the interchange
//! document used for export/import. The serial link layer lives in
//! `pocketcycler-serial` and consumes these types; it never hands protocol
//! bytes to collaborators.
//!
//! # Example
//!
//! ```
//! use pocketcycler_core::{eeprom, ProgramSet};
//!
//! let mut set = ProgramSet::new();
//! set.add_program("Standard");
//!
//! let image = eeprom::encode(&set, 1024).expect("fits");
//! let decoded = eeprom::decode(&image).expect("own image parses");
//! assert_eq!(decoded, set);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod document;
pub mod eeprom;
pub mod error;
pub mod model;

pub use document::ProgramDocument;
pub use error::{CodecError, DocumentError, ModelError};
pub use model::{Block, Cycle, EditOutcome, Program, ProgramSet};
