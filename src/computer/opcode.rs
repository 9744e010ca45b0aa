//! Instruction set of the stored-program machine.
//!
//! Every instruction is two bytes: the opcode followed by one operand
//! address. `HLT` still occupies an operand slot, which is ignored.

use serde::{Deserialize, Serialize};

use crate::logic::{multi_and, not};
use crate::signal::{bits, Circuit, ReadableBus, Signal};

/// Opcodes understood by the computer.
///
/// Any byte outside this table decodes to no control line at all and the
/// instruction passes through its three phases as a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    // ==================== Memory ====================
    /// data := [addr]
    Lod = 0x10,
    /// [addr] := data
    Sto = 0x11,

    // ==================== Arithmetic ====================
    /// data := data + [addr]
    Add = 0x20,
    /// data := data - [addr]
    Sub = 0x21,
    /// data := data + [addr] + carry
    Adc = 0x22,
    /// data := data - [addr] - borrow
    Sbb = 0x23,

    // ==================== Control Flow ====================
    Jmp = 0x30,
    /// Jump if the zero flag is set.
    Jiz = 0x31,
    /// Jump if the carry flag is set.
    Jic = 0x32,
    /// Jump if the zero flag is clear.
    Jnz = 0x33,
    /// Jump if the carry flag is clear.
    Jnc = 0x34,
    Hlt = 0xff,
}

impl Opcode {
    pub const ALL: [Opcode; 12] = [
        Opcode::Lod,
        Opcode::Sto,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Adc,
        Opcode::Sbb,
        Opcode::Jmp,
        Opcode::Jiz,
        Opcode::Jic,
        Opcode::Jnz,
        Opcode::Jnc,
        Opcode::Hlt,
    ];

    pub fn byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Option<Opcode> {
        Self::ALL.iter().copied().find(|op| op.byte() == byte)
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Lod => "LOD",
            Opcode::Sto => "STO",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Adc => "ADC",
            Opcode::Sbb => "SBB",
            Opcode::Jmp => "JMP",
            Opcode::Jiz => "JIZ",
            Opcode::Jic => "JIC",
            Opcode::Jnz => "JNZ",
            Opcode::Jnc => "JNC",
            Opcode::Hlt => "HLT",
        }
    }

    /// Case-insensitive mnemonic lookup.
    pub fn from_mnemonic(text: &str) -> Option<Opcode> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.mnemonic().eq_ignore_ascii_case(text))
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(self, Opcode::Add | Opcode::Sub | Opcode::Adc | Opcode::Sbb)
    }

    pub fn is_jump(self) -> bool {
        matches!(
            self,
            Opcode::Jmp | Opcode::Jiz | Opcode::Jic | Opcode::Jnz | Opcode::Jnc
        )
    }

    /// Whether the operand is an address the instruction reads or writes.
    pub fn uses_operand(self) -> bool {
        self != Opcode::Hlt
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A line that is high exactly while `code` holds `opcode`.
///
/// Compares every bit of `code` against the opcode zero-extended to the
/// bus width.
pub fn decode_line<B>(c: &Circuit, code: &B, opcode: u8) -> Signal
where
    B: ReadableBus + ?Sized,
{
    let terms: Vec<Signal> = code
        .signals()
        .into_iter()
        .enumerate()
        .map(|(i, bit)| {
            if bits::nth_bit(u64::from(opcode), i) {
                bit
            } else {
                not(c, bit)
            }
        })
        .collect();
    multi_and(c, &terms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_roundtrip() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::from_byte(op.byte()), Some(op));
            assert_eq!(Opcode::from_mnemonic(op.mnemonic()), Some(op));
        }
        assert_eq!(Opcode::from_byte(0x00), None);
        assert_eq!(Opcode::from_byte(0x35), None);
        assert_eq!(Opcode::from_mnemonic("sbb"), Some(Opcode::Sbb));
        assert_eq!(Opcode::from_mnemonic("NOP"), None);
    }

    #[test]
    fn test_classification() {
        assert!(Opcode::Adc.is_arithmetic());
        assert!(!Opcode::Lod.is_arithmetic());
        assert!(Opcode::Jnc.is_jump());
        assert!(!Opcode::Hlt.is_jump());
        assert!(!Opcode::Hlt.uses_operand());
        assert_eq!(Opcode::Jiz.to_string(), "JIZ");
    }

    #[test]
    fn test_decode_line() {
        let c = Circuit::new();
        let code = c.bus(8, 0).unwrap();
        let line = decode_line(&c, &code, 0xd0);
        for value in 0..=0xffu64 {
            c.write_bus(&code, value).unwrap();
            assert_eq!(c.read(line), value == 0xd0, "op code {value:#x}");
        }
    }

    #[test]
    fn test_decode_line_zero_extends() {
        let c = Circuit::new();
        let code = c.bus(12, 0x1ff).unwrap();
        let halt = decode_line(&c, &code, Opcode::Hlt.byte());
        assert!(!c.read(halt));
        c.write_bus(&code, 0x0ff).unwrap();
        assert!(c.read(halt));
    }
}
