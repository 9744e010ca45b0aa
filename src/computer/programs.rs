//! Ready-made programs for the stored-program computer.

use super::machine::{Computer, ComputerError};
use super::opcode::Opcode;

const LOD: u64 = Opcode::Lod as u64;
const STO: u64 = Opcode::Sto as u64;
const ADD: u64 = Opcode::Add as u64;
const ADC: u64 = Opcode::Adc as u64;
const JIZ: u64 = Opcode::Jiz as u64;
const JNZ: u64 = Opcode::Jnz as u64;
const HLT: u64 = Opcode::Hlt as u64;

pub const MULTIPLICAND: u64 = 0x80;
pub const MULTIPLIER: u64 = 0x81;
pub const PRODUCT_HIGH: u64 = 0x82;
pub const PRODUCT_LOW: u64 = 0x83;
/// Loop counter; zero whenever the program is not running.
pub const COUNTER: u64 = 0x84;

/// Upper bound on clock toggles for any pair of byte operands.
pub const MULTIPLY_MAX_TICKS: u64 = 16_384;

/// 8 x 8 -> 16 bit multiplication by repeated addition, loaded at `0x00`.
///
/// Clears the product first, so it can be rerun on the same operands, and
/// halts at once when the multiplier is zero. `0x20` holds the `HLT` opcode,
/// which doubles as the constant `-1`; `0x21` is always zero.
pub const MULTIPLY: [u64; 34] = [
    LOD, COUNTER,
    STO, PRODUCT_HIGH,
    STO, PRODUCT_LOW,
    LOD, MULTIPLIER,
    JIZ, 0x20,
    STO, COUNTER,
    // loop:
    LOD, PRODUCT_LOW,
    ADD, MULTIPLICAND,
    STO, PRODUCT_LOW,
    LOD, PRODUCT_HIGH,
    ADC, 0x21,
    STO, PRODUCT_HIGH,
    LOD, COUNTER,
    ADD, 0x20,
    STO, COUNTER,
    JNZ, 0x0c,
    HLT, 0x00,
];

/// Write the multiplication program and its operands into `computer`.
pub fn load_multiply(computer: &mut Computer, a: u8, b: u8) -> Result<(), ComputerError> {
    computer.write_ram(MULTIPLICAND, &[u64::from(a), u64::from(b), 0, 0, 0])?;
    computer.write_ram(0x00, &MULTIPLY)
}

/// Read the 16-bit product left by a finished run.
pub fn product(computer: &Computer) -> Result<u16, ComputerError> {
    let high = computer.read_ram(PRODUCT_HIGH)?;
    let low = computer.read_ram(PRODUCT_LOW)?;
    Ok(((high << 8) | low) as u16)
}

/// Multiply two bytes on a fresh computer.
pub fn multiply(a: u8, b: u8) -> Result<u16, ComputerError> {
    let mut computer = Computer::new();
    load_multiply(&mut computer, a, b)?;
    computer.run_limited(MULTIPLY_MAX_TICKS)?;
    product(&computer)
}
