//! The machines built from the lower layers.
//!
//! - [`Computer`] - the three-phase stored-program computer
//! - [`ProgrammableAdder`] - separate code and data memories, no jumps
//! - [`programs`] - ready-made programs such as multiplication

pub mod config;
pub mod machine;
pub mod opcode;
pub mod programmable_adder;
pub mod programs;

pub use config::{ComputerConfig, ConfigError};
pub use machine::{Computer, ComputerError, MemoryDump, Phase};
pub use opcode::{decode_line, Opcode};
pub use programmable_adder::ProgrammableAdder;
