//! Adder-only programmable machine: the step before the stored-program
//! computer.
//!
//! Code and data live in two separate memories addressed by one ripple
//! counter, so every instruction executes in a single clock pulse and there
//! is no way to jump.

use tracing::info;

use crate::logic::{and, multi_or, not, ones_complement, or, selector, MultiAdder};
use crate::oscillator::Oscillator;
use crate::ram::{ControlPanelRam, RamDriver};
use crate::sequential::{EdgeLatch, LatchConfig, MultiEdgeLatch, MultiLatchConfig, RippleCounter};
use crate::signal::{bits, Circuit, NodeId, ReadableBus, Signal};

use super::machine::ComputerError;
use super::opcode::{decode_line, Opcode};

pub const ADDRESS_WIDTH: usize = 4;
pub const DATA_WIDTH: usize = 8;

/// Console lines of one memory.
#[derive(Debug, Clone)]
struct Console {
    takeover: NodeId,
    address: Vec<NodeId>,
    data: Vec<NodeId>,
    write: NodeId,
}

impl Console {
    fn new(c: &Circuit) -> Self {
        Self {
            takeover: c.node(false),
            address: (0..ADDRESS_WIDTH).map(|_| c.node(false)).collect(),
            data: (0..DATA_WIDTH).map(|_| c.node(false)).collect(),
            write: c.node(false),
        }
    }

    fn driver(&self) -> RamDriver {
        RamDriver::new(&self.address, &self.data, self.write)
    }
}

#[derive(Debug)]
pub struct ProgrammableAdder {
    circuit: Circuit,
    clock: Oscillator,
    reset: NodeId,
    code_console: Console,
    data_console: Console,
    code_ram: ControlPanelRam,
    data_ram: ControlPanelRam,
    data: Vec<NodeId>,
    counter: RippleCounter,
    halt: Signal,
}

impl ProgrammableAdder {
    pub fn new() -> Self {
        let c = Circuit::new();
        let code_console = Console::new(&c);
        let data_console = Console::new(&c);
        let reset = c.node(false);
        let clock = Oscillator::new(&c, false);
        let write = c.node(false);
        let data: Vec<NodeId> = (0..DATA_WIDTH).map(|_| c.node(false)).collect();

        let counter = RippleCounter::new(&c, ADDRESS_WIDTH, &clock, reset, 0);
        let no_data = vec![Signal::FALSE; DATA_WIDTH];
        let code_ram = ControlPanelRam::new(
            &c,
            &RamDriver::new(&counter, &no_data, Signal::FALSE),
            code_console.takeover,
            &code_console.driver(),
        );
        let data_ram = ControlPanelRam::new(
            &c,
            &RamDriver::new(&counter, &data, write),
            data_console.takeover,
            &data_console.driver(),
        );

        let op = |opcode: Opcode| decode_line(&c, &code_ram, opcode.byte());
        let load = op(Opcode::Lod);
        let store = op(Opcode::Sto);
        let add = op(Opcode::Add);
        let subtract = op(Opcode::Sub);
        let add_with_carry = op(Opcode::Adc);
        let subtract_with_borrow = op(Opcode::Sbb);
        let halt = op(Opcode::Hlt);

        let store_pulse = and(&c, store, &clock);
        c.link(write, store_pulse);

        let carry_in = c.node(false);
        let inverting = or(&c, subtract, subtract_with_borrow);
        let operand = ones_complement(&c, inverting, &data_ram);
        let adder = MultiAdder::new(&c, carry_in, &operand, &data);

        let arithmetic = multi_or(&c, &[add, subtract, add_with_carry, subtract_with_borrow]);
        let carry_clock = and(&c, &clock, arithmetic);
        let carry = EdgeLatch::new(
            &c,
            carry_clock,
            adder.carry,
            LatchConfig::default().with_clear(reset),
        );
        let chained = or(&c, add_with_carry, subtract_with_borrow);
        let carry_chain = and(&c, carry, chained);
        let carry_source = or(&c, carry_chain, subtract);
        c.link(carry_in, carry_source);

        // Only loads and arithmetic touch the data register; a store must
        // write the value it already holds.
        let updates_data = multi_or(
            &c,
            &[add, subtract, add_with_carry, subtract_with_borrow, load],
        );
        let data_clock = and(&c, &clock, updates_data);
        let data_select: Vec<Signal> = data_ram
            .signals()
            .into_iter()
            .zip(adder.signals())
            .map(|(word, sum)| {
                let computing = not(&c, load);
                selector(&c, computing, word, sum)
            })
            .collect();
        let latch = MultiEdgeLatch::new(
            &c,
            data_clock,
            &data_select,
            MultiLatchConfig::default().with_clear(reset),
        );
        c.link_bus(&data, &latch);

        Self {
            circuit: c,
            clock,
            reset,
            code_console,
            data_console,
            code_ram,
            data_ram,
            data,
            counter,
            halt,
        }
    }

    /// Store `words` as (code, data) pairs at consecutive addresses from
    /// `address`. A trailing code word without data gets data 0.
    pub fn write_program(&mut self, address: u64, words: &[u64]) -> Result<(), ComputerError> {
        let instructions = words.len().div_ceil(2) as u64;
        if let Some(last) = instructions.checked_sub(1) {
            let end = address.saturating_add(last);
            if !bits::fits(end, ADDRESS_WIDTH) {
                return Err(ComputerError::AddressOutOfRange {
                    address: end,
                    width: ADDRESS_WIDTH,
                });
            }
        }
        for &word in words {
            bits::to_bits(word, DATA_WIDTH)?;
        }

        let c = &self.circuit;
        c.write(self.code_console.takeover, true);
        c.write(self.data_console.takeover, true);
        for (at, pair) in (address..).zip(words.chunks(2)) {
            let code = pair[0];
            let data = pair.get(1).copied().unwrap_or(0);
            for (console, word) in [(&self.code_console, code), (&self.data_console, data)] {
                c.write_bus(&console.address, at)?;
                c.write_bus(&console.data, word)?;
                c.write(console.write, true);
                c.write(console.write, false);
            }
        }
        c.write(self.code_console.takeover, false);
        c.write(self.data_console.takeover, false);
        Ok(())
    }

    /// Clear the counter, register and carry, then clock until `HLT`.
    pub fn run(&mut self) -> u64 {
        let c = &self.circuit;
        c.write(self.reset, true);
        c.write(self.reset, false);
        let (halt, clock) = (self.halt, self.clock.node());
        let ticks = self.clock.run_until(c, |c| c.read(halt) && !c.read(clock));
        info!(ticks, "programmable adder halted");
        ticks
    }

    fn read(&self, console: &Console, ram: &ControlPanelRam, address: u64) -> Result<u64, ComputerError> {
        let c = &self.circuit;
        c.write(console.takeover, true);
        let word = c.write_bus(&console.address, address).map(|()| c.read_bus(ram));
        c.write(console.takeover, false);
        word.map_err(|_| ComputerError::AddressOutOfRange {
            address,
            width: ADDRESS_WIDTH,
        })
    }

    pub fn read_code(&self, address: u64) -> Result<u64, ComputerError> {
        self.read(&self.code_console, &self.code_ram, address)
    }

    pub fn read_data(&self, address: u64) -> Result<u64, ComputerError> {
        self.read(&self.data_console, &self.data_ram, address)
    }

    pub fn data(&self) -> u64 {
        self.circuit.read_bus(&self.data)
    }

    pub fn program_counter(&self) -> u64 {
        self.circuit.read_bus(&self.counter)
    }

    pub fn is_halted(&self) -> bool {
        self.circuit.read(self.halt)
    }
}

impl Default for ProgrammableAdder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Opcode::*;

    fn op(opcode: Opcode) -> u64 {
        u64::from(opcode.byte())
    }

    fn data_after(program: &[u64], words: u64) -> Vec<u64> {
        let mut adder = ProgrammableAdder::new();
        adder.write_program(0x0, program).unwrap();
        adder.run();
        (0..words).map(|at| adder.read_data(at).unwrap()).collect()
    }

    #[test]
    fn test_write_program() {
        let mut adder = ProgrammableAdder::new();
        adder.write_program(0x1, &[0x7e, 0x57, 0xed]).unwrap();
        adder.write_program(0x8, &[0xc0, 0xde]).unwrap();
        for at in 0..16 {
            let (code, data) = match at {
                0x1 => (0x7e, 0x57),
                0x2 => (0xed, 0x00),
                0x8 => (0xc0, 0xde),
                _ => (0x00, 0x00),
            };
            assert_eq!(adder.read_code(at), Ok(code), "code {at}");
            assert_eq!(adder.read_data(at), Ok(data), "data {at}");
        }
    }

    #[test]
    fn test_write_program_out_of_range() {
        let mut adder = ProgrammableAdder::new();
        assert_eq!(
            adder.write_program(0xf, &[op(Lod), 0x01, op(Hlt)]),
            Err(ComputerError::AddressOutOfRange {
                address: 0x10,
                width: ADDRESS_WIDTH
            })
        );
        assert!(adder.write_program(0x0, &[0x100]).is_err());
        assert!(adder.read_data(0x10).is_err());
    }

    #[test]
    fn test_load_store() {
        let program = [op(Lod), 0x56, op(Sto), 0x10, op(Lod), 0xf0, op(Sto), 0x15, op(Hlt)];
        assert_eq!(data_after(&program, 4), vec![0x56, 0x56, 0xf0, 0xf0]);
    }

    #[test]
    fn test_add_subtract() {
        let program = [op(Lod), 0x56, op(Add), 0x2a, op(Sub), 0x38, op(Sto), 0x00, op(Hlt)];
        assert_eq!(data_after(&program, 4)[3], 0x56 + 0x2a - 0x38);
    }

    #[test]
    fn test_add_no_carry() {
        let program = [
            op(Lod), 0xab, op(Add), 0x2c, op(Sto), 0x00,
            op(Lod), 0x76, op(Adc), 0x23, op(Sto), 0x00,
            op(Hlt),
        ];
        let data = data_after(&program, 6);
        assert_eq!(data[2], 0xd7);
        assert_eq!(data[5], 0x99);
    }

    #[test]
    fn test_add_with_carry() {
        let program = [
            op(Lod), 0xff, op(Add), 0xff, op(Sto), 0x00,
            op(Lod), 0x01, op(Adc), 0x01, op(Sto), 0x00,
            op(Hlt),
        ];
        let data = data_after(&program, 6);
        assert_eq!(data[2], 0xfe);
        assert_eq!(data[5], 0x03);
    }

    #[test]
    fn test_subtract_with_borrow() {
        let program = [
            op(Lod), 0x00, op(Sub), 0x01, op(Sto), 0x00,
            op(Lod), 0x01, op(Sbb), 0x00, op(Sto), 0x00,
            op(Hlt),
        ];
        let data = data_after(&program, 6);
        assert_eq!((data[5], data[2]), (0x00, 0xff));

        let program = [
            op(Lod), 0x03, op(Sub), 0x05, op(Sto), 0x00,
            op(Lod), 0x05, op(Sbb), 0x00, op(Sto), 0x00,
            op(Hlt),
        ];
        let data = data_after(&program, 6);
        assert_eq!((data[5], data[2]), (0x04, 0xfe));
    }

    #[test]
    fn test_halt_stops_counter() {
        let mut adder = ProgrammableAdder::new();
        adder
            .write_program(0x0, &[op(Lod), 0x21, op(Hlt), 0x00, op(Lod), 0x42])
            .unwrap();
        adder.run();
        assert!(adder.is_halted());
        assert_eq!(adder.program_counter(), 1);
        assert_eq!(adder.data(), 0x21);
    }
}
