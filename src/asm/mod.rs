//! Assembler and disassembler for stored-program images.
//!
//! This module provides:
//! - A two-pass assembler (text → [`ProgramImage`])
//! - A disassembler (image → readable text)
//! - The `.ccp` program image text format

pub mod assembler;
pub mod disasm;
pub mod image;

pub use assembler::{assemble, AssemblerError};
pub use disasm::{disassemble, disassemble_image};
pub use image::{load_image, parse_image, save_image, ImageError, ProgramImage, Segment};
