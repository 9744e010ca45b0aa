//! Disassembler for stored-program images.
//!
//! Converts bytes back to readable assembly, two bytes per instruction.

use super::image::ProgramImage;
use crate::computer::Opcode;

/// Disassemble a single instruction to text.
pub fn disassemble_instruction(opcode: u8, operand: u8) -> String {
    match Opcode::from_byte(opcode) {
        Some(op) => format!("{} 0x{:02x}", op, operand),
        None => format!("DAT 0x{:02x}, 0x{:02x}", opcode, operand),
    }
}

/// Disassemble bytes loaded at `origin`, one line per instruction.
pub fn disassemble(origin: u64, bytes: &[u8]) -> String {
    let mut output = String::new();
    for (i, pair) in bytes.chunks(2).enumerate() {
        let addr = origin + 2 * i as u64;
        let text = match *pair {
            [opcode, operand] => disassemble_instruction(opcode, operand),
            [byte] => format!("DAT 0x{:02x}", byte),
            _ => continue,
        };
        output.push_str(&format!("{:02x}: {}\n", addr, text));
    }
    output
}

/// Disassemble every segment of an image.
pub fn disassemble_image(image: &ProgramImage) -> String {
    let mut output = String::new();
    for segment in &image.segments {
        output.push_str(&format!("; @{:02x}\n", segment.origin));
        output.push_str(&disassemble(segment.origin, &segment.bytes));
    }
    output
}
