//! The three-phase stored-program computer.
//!
//! One RAM array holds both program and data. A three-output ring counter
//! splits every instruction into phases:
//!
//! - code: latch the opcode addressed by the program counter, then advance
//! - address: latch the operand byte into the address register
//! - data: read or write memory at the address register, then advance, or
//!   load the program counter from the address register for a taken jump
//!
//! Everything here is wiring; the behaviour emerges from the gates.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::logic::{
    and, multi_and, multi_nor, multi_or, not, ones_complement, or, selector, MultiAdder,
};
use crate::oscillator::Oscillator;
use crate::ram::{ControlPanelRam, RamDriver};
use crate::sequential::{
    AddressCounter, EdgeLatch, Invertible, LatchConfig, LevelLatch, MultiEdgeLatch,
    MultiLatchConfig, RingCounter,
};
use crate::signal::{bits, BitsError, Circuit, NodeId, ReadableBus, Signal};

use super::config::{ComputerConfig, ConfigError};
use super::opcode::{decode_line, Opcode};

/// Time slice of the instruction cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Code,
    Address,
    Data,
}

impl Phase {
    fn from_index(index: usize) -> Option<Phase> {
        match index {
            0 => Some(Phase::Code),
            1 => Some(Phase::Address),
            2 => Some(Phase::Data),
            _ => None,
        }
    }
}

/// Snapshot of the whole memory array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryDump {
    pub address_width: usize,
    pub data_width: usize,
    pub words: Vec<u64>,
}

/// Programmable computer assembled from gates, latches and counters.
pub struct Computer {
    circuit: Circuit,
    config: ComputerConfig,
    clock: Oscillator,
    reset: NodeId,

    // Console bus.
    pause: NodeId,
    takeover: NodeId,
    address_override: Vec<NodeId>,
    data_override: Vec<NodeId>,
    write_override: NodeId,
    ram: ControlPanelRam,

    code: Vec<NodeId>,
    address: Vec<NodeId>,
    data: Vec<NodeId>,
    counter: AddressCounter,
    phases: RingCounter,
    carry: EdgeLatch,
    zero: EdgeLatch,
    halted: Signal,
}

fn register(c: &Circuit, width: usize, value: u64) -> Vec<NodeId> {
    (0..width).map(|i| c.node(bits::nth_bit(value, i))).collect()
}

impl Computer {
    /// 8-bit address, 8-bit data, all registers clear.
    pub fn new() -> Self {
        let config = ComputerConfig::default();
        Self::build(Circuit::new(), config)
    }

    pub fn with_config(config: ComputerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(Circuit::new(), config))
    }

    fn build(c: Circuit, config: ComputerConfig) -> Self {
        let aw = config.address_width;
        let dw = config.data_width;

        let pause = c.node(false);
        let takeover = c.node(false);
        let address_override = register(&c, aw, 0);
        let data_override = register(&c, dw, 0);
        let write_override = c.node(false);
        let reset = c.node(false);
        let clock = Oscillator::new(&c, false);

        let code = register(&c, dw, config.code);
        let address = register(&c, dw, config.address);
        let data = register(&c, dw, config.data);
        let write = c.node(false);
        let set = c.node(false);

        let phases = RingCounter::new(&c, 3, &clock, reset);
        let [code_phase, address_phase, data_phase] = {
            let outputs = phases.outputs();
            [outputs[0], outputs[1], outputs[2]]
        };

        // The program counter steps when the clock falls at the end of the
        // code and data phases.
        let stepping = or(&c, code_phase, data_phase);
        let counter_clock = LevelLatch::new(&c, stepping, &clock, LatchConfig::default());
        let counter = AddressCounter::new(&c, counter_clock, &address[..aw], set, reset, 0);
        let pc = counter.signals();
        let memory_address: Vec<Signal> = (0..aw)
            .map(|i| {
                let fetching = not(&c, address_phase);
                selector(&c, fetching, address[i], pc[i])
            })
            .collect();

        let ram = ControlPanelRam::new(
            &c,
            &RamDriver::new(&memory_address, &data, write),
            takeover,
            &RamDriver::new(&address_override, &data_override, write_override),
        );

        let cleared = MultiLatchConfig::default().with_clear(reset);
        let code_latch =
            MultiEdgeLatch::new(&c, code_phase, &ram, cleared.clone().with_state(config.code));
        c.link_bus(&code, &code_latch);
        let address_latch = MultiEdgeLatch::new(
            &c,
            address_phase,
            &ram,
            cleared.clone().with_state(config.address),
        );
        c.link_bus(&address, &address_latch);

        let op = |opcode: Opcode| decode_line(&c, &code, opcode.byte());
        let load = op(Opcode::Lod);
        let store = op(Opcode::Sto);
        let add = op(Opcode::Add);
        let subtract = op(Opcode::Sub);
        let add_with_carry = op(Opcode::Adc);
        let subtract_with_borrow = op(Opcode::Sbb);
        let jump = op(Opcode::Jmp);
        let jump_if_zero = op(Opcode::Jiz);
        let jump_if_carry = op(Opcode::Jic);
        let jump_if_not_zero = op(Opcode::Jnz);
        let jump_if_not_carry = op(Opcode::Jnc);
        let halt = op(Opcode::Hlt);

        // Memory follows the data register for the low half of the address
        // phase, unless the console has paused stores.
        let storing = and(&c, store, address_phase);
        let clock_low = not(&c, &clock);
        let running = not(&c, pause);
        let store_pulse = multi_and(&c, &[storing, clock_low, running]);
        c.link(write, store_pulse);

        let carry_in = c.node(false);
        let inverting = or(&c, subtract, subtract_with_borrow);
        let operand = ones_complement(&c, inverting, &ram);
        let adder = MultiAdder::new(&c, carry_in, &operand, &data);

        let arithmetic = multi_or(&c, &[add, subtract, add_with_carry, subtract_with_borrow]);
        let carry_clock = and(&c, data_phase, arithmetic);
        let flag = LatchConfig::default().with_clear(reset);
        let carry = EdgeLatch::new(&c, carry_clock, adder.carry, flag.with_state(config.carry));
        let chained = or(&c, add_with_carry, subtract_with_borrow);
        let carry_chain = and(&c, carry, chained);
        let carry_source = or(&c, carry_chain, subtract);
        c.link(carry_in, carry_source);

        let updates_data = multi_or(
            &c,
            &[add, subtract, add_with_carry, subtract_with_borrow, load],
        );
        let data_clock = and(&c, data_phase, updates_data);
        let data_select: Vec<Signal> = ram
            .signals()
            .into_iter()
            .zip(adder.signals())
            .map(|(word, sum)| {
                let computing = not(&c, load);
                selector(&c, computing, word, sum)
            })
            .collect();
        let data_latch =
            MultiEdgeLatch::new(&c, data_clock, &data_select, cleared.with_state(config.data));
        c.link_bus(&data, &data_latch);

        let sum_is_zero = multi_nor(&c, &adder);
        let zero = EdgeLatch::new(&c, data_clock, sum_is_zero, flag.with_state(config.zero));

        let taken = [
            jump,
            and(&c, jump_if_zero, zero),
            and(&c, jump_if_carry, carry),
            and(&c, jump_if_not_zero, zero.bar()),
            and(&c, jump_if_not_carry, carry.bar()),
        ];
        let any_taken = multi_or(&c, &taken);
        let load_counter = and(&c, any_taken, data_phase);
        c.link(set, load_counter);

        // HLT runs through its own operand and data phases before stopping.
        let halted = multi_and(&c, &[halt, data_phase.into(), clock_low]);

        debug!(
            nodes = c.node_count(),
            address_width = aw,
            data_width = dw,
            "computer built"
        );

        Self {
            circuit: c,
            config,
            clock,
            reset,
            pause,
            takeover,
            address_override,
            data_override,
            write_override,
            ram,
            code,
            address,
            data,
            counter,
            phases,
            carry,
            zero,
            halted,
        }
    }

    // ==================== Control ====================

    /// Pulse the reset line: program counter, phase, registers and flags
    /// return to zero, with the data phase active. Memory is untouched.
    pub fn reset(&mut self) {
        let c = &self.circuit;
        c.write(self.reset, true);
        c.write(self.reset, false);
        debug!("computer reset");
    }

    /// Reset, then run until a `HLT` instruction completes. Returns the
    /// clock toggles used.
    ///
    /// A program that never halts never returns; see [`Computer::run_limited`].
    pub fn run(&mut self) -> u64 {
        self.reset();
        let halted = self.halted;
        let ticks = self.clock.run_until(&self.circuit, move |c| c.read(halted));
        info!(ticks, "execution halted");
        ticks
    }

    /// Reset, then run until halted or until `max_ticks` clock toggles.
    pub fn run_limited(&mut self, max_ticks: u64) -> Result<u64, ComputerError> {
        self.reset();
        let mut remaining = max_ticks;
        let halted = self.halted;
        let mut finished = false;
        let ticks = self.clock.run_until(&self.circuit, |c| {
            finished = c.read(halted);
            if finished || remaining == 0 {
                return true;
            }
            remaining -= 1;
            false
        });
        if !finished {
            warn!(max_ticks, "reached maximum ticks, stopping execution");
            return Err(ComputerError::CycleLimit { max_ticks });
        }
        info!(ticks, "execution halted");
        Ok(ticks)
    }

    /// Advance one phase: one full clock pulse.
    pub fn step_phase(&mut self) {
        self.clock.run(&self.circuit, 2, |_, _| {});
    }

    pub fn run_phases(&mut self, phases: u64) {
        self.clock.run(&self.circuit, phases * 2, |_, _| {});
    }

    // ==================== Console ====================

    fn check_address(&self, address: u64) -> Result<(), ComputerError> {
        if address >= self.config.memory_size() as u64 {
            return Err(ComputerError::AddressOutOfRange {
                address,
                width: self.config.address_width,
            });
        }
        Ok(())
    }

    /// Give `f` the memory through the console lines.
    ///
    /// Stores are paused before the bus switches and resumed after it
    /// switches back, so a program stopped in the middle of `STO` neither
    /// writes the console's words nor sees its addresses.
    fn console<T>(&self, f: impl FnOnce(&Circuit) -> T) -> T {
        let c = &self.circuit;
        c.write(self.pause, true);
        c.write(self.takeover, true);
        let result = f(c);
        c.write(self.write_override, false);
        c.write(self.takeover, false);
        c.write(self.pause, false);
        result
    }

    /// Load `words` into consecutive addresses starting at `address`
    /// through the console override.
    ///
    /// Everything is validated before the console takes over, so a rejected
    /// call leaves memory unchanged.
    pub fn write_ram(&mut self, address: u64, words: &[u64]) -> Result<(), ComputerError> {
        if let Some(last) = (words.len() as u64).checked_sub(1) {
            self.check_address(address.saturating_add(last))?;
        }
        for &word in words {
            bits::to_bits(word, self.config.data_width)?;
        }

        self.console(|c| -> Result<(), ComputerError> {
            for (at, &word) in (address..).zip(words) {
                c.write_bus(&self.address_override, at)?;
                c.write_bus(&self.data_override, word)?;
                c.write(self.write_override, true);
                c.write(self.write_override, false);
            }
            Ok(())
        })?;
        debug!(address, words = words.len(), "memory written");
        Ok(())
    }

    /// Read one word. Safe between phases of a running program.
    pub fn read_ram(&self, address: u64) -> Result<u64, ComputerError> {
        self.check_address(address)?;
        self.console(|c| -> Result<u64, ComputerError> {
            c.write_bus(&self.address_override, address)?;
            Ok(c.read_bus(&self.ram))
        })
    }

    /// Read every memory word in address order.
    pub fn dump_ram(&self) -> MemoryDump {
        let words: Vec<u64> = self.console(|c| {
            (0..self.config.memory_size() as u64)
                .map(|at| {
                    for (i, &node) in self.address_override.iter().enumerate() {
                        c.write(node, bits::nth_bit(at, i));
                    }
                    c.read_bus(&self.ram)
                })
                .collect()
        });
        MemoryDump {
            address_width: self.config.address_width,
            data_width: self.config.data_width,
            words,
        }
    }

    // ==================== Inspection ====================

    pub fn config(&self) -> &ComputerConfig {
        &self.config
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    pub fn clock(&self) -> &Oscillator {
        &self.clock
    }

    pub fn code(&self) -> u64 {
        self.circuit.read_bus(&self.code)
    }

    pub fn address(&self) -> u64 {
        self.circuit.read_bus(&self.address)
    }

    pub fn data(&self) -> u64 {
        self.circuit.read_bus(&self.data)
    }

    pub fn program_counter(&self) -> u64 {
        self.circuit.read_bus(&self.counter)
    }

    /// Active phase, or `None` before the first reset.
    pub fn phase(&self) -> Option<Phase> {
        self.phases.active(&self.circuit).and_then(Phase::from_index)
    }

    pub fn carry(&self) -> bool {
        self.circuit.read(self.carry)
    }

    pub fn zero(&self) -> bool {
        self.circuit.read(self.zero)
    }

    /// True once a `HLT` instruction has finished its data phase.
    pub fn is_halted(&self) -> bool {
        self.circuit.read(self.halted)
    }

    pub fn takeover(&self) -> NodeId {
        self.takeover
    }

    pub fn address_override(&self) -> &[NodeId] {
        &self.address_override
    }

    pub fn data_override(&self) -> &[NodeId] {
        &self.data_override
    }

    pub fn write_override(&self) -> NodeId {
        self.write_override
    }

    pub fn reset_line(&self) -> NodeId {
        self.reset
    }

    /// Memory output: the word at whichever address is connected.
    pub fn ram(&self) -> &ControlPanelRam {
        &self.ram
    }
}

impl Default for Computer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Computer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computer")
            .field("config", &self.config)
            .field("phase", &self.phase())
            .field("pc", &self.program_counter())
            .field("code", &self.code())
            .field("address", &self.address())
            .field("data", &self.data())
            .field("carry", &self.carry())
            .field("zero", &self.zero())
            .finish()
    }
}

/// Errors reported by [`Computer`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComputerError {
    #[error("bus error: {0}")]
    Bits(#[from] BitsError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("address {address:#x} is outside the {width}-bit address space")]
    AddressOutOfRange { address: u64, width: usize },

    #[error("program did not halt within {max_ticks} clock ticks")]
    CycleLimit { max_ticks: u64 },
}
