//! Two-pass assembler for the stored-program computer.
//!
//! Syntax:
//! ```text
//! ; Comment
//!         ORG 0x00        ; Set origin address
//! LOOP:   LOD COUNT       ; Load from a labelled address
//!         SUB ONE
//!         STO COUNT
//!         JNZ LOOP        ; Jump to label
//!         HLT             ; Operand optional
//!
//!         ORG 0x80
//! COUNT:  DAT 10
//! ONE:    DAT 1, 0xff, -1 ; Several bytes; negatives are two's complement
//! ```

use std::collections::HashMap;

use thiserror::Error;

use super::image::{ProgramImage, Segment};
use crate::computer::Opcode;

/// Highest address an 8-bit program can occupy.
const MAX_ADDRESS: u64 = 0xff;

/// Assemble source code to a program image.
pub fn assemble(source: &str) -> Result<ProgramImage, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)
}

/// A byte whose value is a label not resolved yet.
#[derive(Debug)]
struct Pending {
    segment: usize,
    offset: usize,
    label: String,
    line: usize,
}

/// The assembler state.
struct Assembler {
    /// Current address (origin).
    current_addr: u64,
    /// Symbol table (label -> address).
    symbols: HashMap<String, u64>,
    /// Forward and backward label references, patched in pass 2.
    pending: Vec<Pending>,
    image: ProgramImage,
    /// Set by `ORG`; the next emitted byte opens a new segment.
    new_segment: bool,
}

impl Assembler {
    fn new() -> Self {
        Self {
            current_addr: 0,
            symbols: HashMap::new(),
            pending: Vec::new(),
            image: ProgramImage::new(),
            new_segment: true,
        }
    }

    fn assemble(&mut self, source: &str) -> Result<ProgramImage, AssemblerError> {
        // Pass 1: collect labels and emit bytes with placeholders
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }

        // Pass 2: patch label references
        self.resolve_references()?;

        Ok(std::mem::take(&mut self.image))
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        let line = match line.find(';') {
            Some(idx) => &line[..idx],
            None => line,
        }
        .trim();
        if line.is_empty() {
            return Ok(());
        }

        let rest = match line.find(':') {
            Some(colon_idx) => {
                self.define_label(&line[..colon_idx], line_num)?;
                line[colon_idx + 1..].trim()
            }
            None => line,
        };
        if rest.is_empty() {
            return Ok(());
        }

        let (mnemonic, operands) = match rest.split_once(char::is_whitespace) {
            Some((mnemonic, operands)) => (mnemonic, operands.trim()),
            None => (rest, ""),
        };
        self.process_statement(&mnemonic.to_uppercase(), operands, line_num)
    }

    fn define_label(&mut self, label: &str, line_num: usize) -> Result<(), AssemblerError> {
        let label = label.trim().to_uppercase();
        let valid = label
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!("invalid label '{label}'"),
            });
        }
        if self.symbols.contains_key(&label) {
            return Err(AssemblerError::DuplicateLabel {
                line: line_num,
                label,
            });
        }
        self.symbols.insert(label, self.current_addr);
        Ok(())
    }

    fn process_statement(
        &mut self,
        mnemonic: &str,
        operands: &str,
        line_num: usize,
    ) -> Result<(), AssemblerError> {
        match mnemonic {
            // Directives
            "ORG" => {
                let addr = self.parse_number(single_operand(mnemonic, operands, line_num)?, line_num)?;
                if !(0..=MAX_ADDRESS as i64).contains(&addr) {
                    return Err(AssemblerError::ValueOutOfRange {
                        line: line_num,
                        value: addr,
                    });
                }
                self.current_addr = addr as u64;
                self.new_segment = true;
            }

            "DAT" => {
                if operands.is_empty() {
                    return Err(AssemblerError::SyntaxError {
                        line: line_num,
                        message: "DAT requires a value".into(),
                    });
                }
                for operand in operands.split(',') {
                    self.emit_operand(operand.trim(), line_num)?;
                }
            }

            // Instructions
            _ => {
                let opcode = Opcode::from_mnemonic(mnemonic).ok_or_else(|| {
                    AssemblerError::UnknownMnemonic {
                        line: line_num,
                        mnemonic: mnemonic.to_string(),
                    }
                })?;
                self.emit(opcode.byte(), line_num)?;
                if operands.is_empty() && !opcode.uses_operand() {
                    self.emit(0, line_num)?;
                } else {
                    let operand = single_operand(mnemonic, operands, line_num)?;
                    self.emit_operand(operand, line_num)?;
                }
            }
        }

        Ok(())
    }

    fn emit_operand(&mut self, operand: &str, line_num: usize) -> Result<(), AssemblerError> {
        if is_label(operand) {
            self.emit(0, line_num)?;
            if let Some(segment) = self.image.segments.last() {
                self.pending.push(Pending {
                    segment: self.image.segments.len() - 1,
                    offset: segment.bytes.len() - 1,
                    label: operand.to_uppercase(),
                    line: line_num,
                });
            }
            return Ok(());
        }

        let value = self.parse_number(operand, line_num)?;
        let byte = match value {
            0..=255 => value as u8,
            -128..=-1 => (value + 256) as u8,
            _ => {
                return Err(AssemblerError::ValueOutOfRange {
                    line: line_num,
                    value,
                })
            }
        };
        self.emit(byte, line_num)
    }

    fn parse_number(&self, operand: &str, line_num: usize) -> Result<i64, AssemblerError> {
        let parsed = match operand
            .strip_prefix("0x")
            .or_else(|| operand.strip_prefix("0X"))
        {
            Some(hex) => i64::from_str_radix(hex, 16),
            None => operand.parse::<i64>(),
        };
        parsed.map_err(|_| AssemblerError::SyntaxError {
            line: line_num,
            message: format!("invalid number '{operand}'"),
        })
    }

    fn emit(&mut self, byte: u8, line_num: usize) -> Result<(), AssemblerError> {
        if self.current_addr > MAX_ADDRESS {
            return Err(AssemblerError::ValueOutOfRange {
                line: line_num,
                value: self.current_addr as i64,
            });
        }
        if self.new_segment {
            self.image.segments.push(Segment::new(self.current_addr));
            self.new_segment = false;
        }
        if let Some(segment) = self.image.segments.last_mut() {
            segment.bytes.push(byte);
        }
        self.current_addr += 1;
        Ok(())
    }

    fn resolve_references(&mut self) -> Result<(), AssemblerError> {
        for pending in &self.pending {
            let addr = self.symbols.get(&pending.label).ok_or_else(|| {
                AssemblerError::UndefinedLabel {
                    line: pending.line,
                    label: pending.label.clone(),
                }
            })?;
            if let Some(byte) = self
                .image
                .segments
                .get_mut(pending.segment)
                .and_then(|s| s.bytes.get_mut(pending.offset))
            {
                *byte = *addr as u8;
            }
        }
        Ok(())
    }
}

fn is_label(operand: &str) -> bool {
    operand
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
}

fn single_operand<'a>(
    mnemonic: &str,
    operands: &'a str,
    line_num: usize,
) -> Result<&'a str, AssemblerError> {
    match operands.split_whitespace().collect::<Vec<_>>().as_slice() {
        [operand] => Ok(*operand),
        [] => Err(AssemblerError::SyntaxError {
            line: line_num,
            message: format!("{mnemonic} requires an operand"),
        }),
        _ => Err(AssemblerError::SyntaxError {
            line: line_num,
            message: format!("{mnemonic} takes one operand"),
        }),
    }
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("duplicate label on line {line}: {label}")]
    DuplicateLabel { line: usize, label: String },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_simple() {
        let source = r#"
            ; load/store
            LOD 0x80
            STO 129
            HLT
        "#;

        let image = assemble(source).unwrap();
        assert_eq!(image.segments.len(), 1);
        assert_eq!(image.segments[0].origin, 0);
        assert_eq!(image.segments[0].bytes, vec![0x10, 0x80, 0x11, 0x81, 0xff, 0x00]);
    }

    #[test]
    fn test_assemble_with_labels() {
        let source = r#"
        START:  lod first
                sub second
                jnz start
        END:    hlt
                ORG 0x80
        FIRST:  DAT 0x0a
        SECOND: DAT 5
        "#;

        let image = assemble(source).unwrap();
        assert_eq!(image.segments[0].bytes, vec![0x10, 0x80, 0x21, 0x81, 0x33, 0x00, 0xff, 0x00]);
        assert_eq!(image.segments[1], Segment { origin: 0x80, bytes: vec![0x0a, 0x05] });
    }

    #[test]
    fn test_assemble_data() {
        let source = r#"
            ORG 0x10
            DAT 42, -1, 0xFF, 0
            DAT HERE
        HERE:
        "#;

        let image = assemble(source).unwrap();
        assert_eq!(image.segments[0].origin, 0x10);
        assert_eq!(image.segments[0].bytes, vec![42, 0xff, 0xff, 0, 0x15]);
    }

    #[test]
    fn test_assemble_errors() {
        assert_eq!(
            assemble("LOD 1\nNOP 2"),
            Err(AssemblerError::UnknownMnemonic {
                line: 2,
                mnemonic: "NOP".into()
            })
        );
        assert_eq!(
            assemble("JMP NOWHERE"),
            Err(AssemblerError::UndefinedLabel {
                line: 1,
                label: "NOWHERE".into()
            })
        );
        assert_eq!(
            assemble("A: HLT\na: HLT"),
            Err(AssemblerError::DuplicateLabel {
                line: 2,
                label: "A".into()
            })
        );
        assert_eq!(
            assemble("DAT 256"),
            Err(AssemblerError::ValueOutOfRange { line: 1, value: 256 })
        );
        assert!(matches!(assemble("LOD"), Err(AssemblerError::SyntaxError { line: 1, .. })));
        assert!(matches!(assemble("LOD 1 2"), Err(AssemblerError::SyntaxError { .. })));
        assert!(matches!(assemble("1X: HLT"), Err(AssemblerError::SyntaxError { .. })));
        assert!(matches!(
            assemble("ORG 0xff\nHLT"),
            Err(AssemblerError::ValueOutOfRange { line: 2, value: 0x100 })
        ));
    }

    #[test]
    fn test_assembled_program_runs() {
        use crate::computer::Computer;

        let source = r#"
                LOD A
                ADD B
                STO SUM
                HLT
                ORG 0x80
        A:      DAT 0x21
        B:      DAT 0x05
        SUM:    DAT 0
        "#;
        let mut computer = Computer::new();
        assemble(source).unwrap().load_into(&mut computer).unwrap();
        computer.run();
        assert_eq!(computer.read_ram(0x82), Ok(0x26));
    }
}
