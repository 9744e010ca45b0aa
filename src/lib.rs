//! # Code Computer
//!
//! A stored-program 8-bit computer built, layer by layer, from a single
//! primitive: a two-state signal node that notifies its subscribers when
//! it changes.
//!
//! signal → gate → latch → counter → RAM → adder → control unit → computer
//!
//! No layer reads beneath the one below it. The instruction cycle and the
//! arithmetic of [`Computer`] emerge from how the nodes are wired.

pub mod signal;
pub mod logic;
pub mod sequential;
pub mod ram;
pub mod oscillator;
pub mod accumulator;
pub mod computer;
pub mod asm;

#[cfg(feature = "tui")]
pub mod tui;

// Re-export commonly used types
pub use signal::{BitsError, Circuit, NodeId, Readable, ReadableBus, Signal};
pub use oscillator::Oscillator;
pub use computer::{Computer, ComputerConfig, ComputerError, MemoryDump, Opcode, Phase};
pub use asm::{assemble, disassemble, AssemblerError, ImageError, ProgramImage, load_image, save_image};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
