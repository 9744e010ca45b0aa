//! Front-panel application state and logic.

use std::collections::HashSet;

use crate::asm::disasm::disassemble_instruction;
use crate::asm::ProgramImage;
use crate::computer::{Computer, ComputerConfig, ComputerError, MemoryDump, Phase};

/// Front-panel application state.
pub struct DebuggerApp {
    /// The machine being debugged.
    pub computer: Computer,
    /// Loaded program, reloaded on reset.
    pub image: ProgramImage,
    /// Breakpoints (by program counter at the start of an instruction).
    pub breakpoints: HashSet<u64>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Memory view scroll offset, in rows of 16 words.
    pub mem_scroll: usize,
    /// Clock toggles since the last reset.
    pub ticks: u64,
    /// Memory as of the last step.
    pub memory: MemoryDump,
}

impl DebuggerApp {
    /// Create a front panel for a machine built from `config`, with a
    /// loaded program.
    pub fn new(image: ProgramImage, config: ComputerConfig) -> Result<Self, ComputerError> {
        let mut computer = Computer::with_config(config)?;
        image.load_into(&mut computer)?;
        computer.reset();
        let memory = computer.dump_ram();

        Ok(Self {
            computer,
            image,
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status: "Ready. 'p' phase, 's' step, 'r' run, 'q' quit.".into(),
            mem_scroll: 0,
            ticks: 0,
            memory,
        })
    }

    fn refresh(&mut self) {
        self.memory = self.computer.dump_ram();
    }

    fn word(&self, address: u64) -> u8 {
        self.memory.words.get(address as usize).copied().unwrap_or(0) as u8
    }

    /// Advance one clock pulse.
    pub fn step_phase(&mut self) {
        if self.computer.is_halted() {
            self.status = "Halted. 'x' to reset.".into();
            self.running = false;
            return;
        }
        self.computer.step_phase();
        self.ticks += 2;
        self.refresh();
        self.status = format!(
            "PC={:02x} {:?} phase",
            self.computer.program_counter(),
            self.computer.phase().unwrap_or(Phase::Data)
        );
    }

    /// Advance to the end of the next data phase, or until halted.
    pub fn step(&mut self) {
        if self.computer.is_halted() {
            self.status = "Halted. 'x' to reset.".into();
            self.running = false;
            return;
        }

        let pc = self.computer.program_counter();
        let (opcode, operand) = (self.word(pc), self.word(pc + 1));
        for _ in 0..3 {
            self.computer.step_phase();
            self.ticks += 2;
            if self.computer.is_halted() {
                break;
            }
        }
        self.refresh();
        self.status = format!("PC={:02x}: {}", pc, disassemble_instruction(opcode, operand));
    }

    /// Run until halt or breakpoint.
    pub fn run(&mut self) {
        self.running = true;
        self.status = "Running...".into();
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        if self.computer.is_halted() {
            self.running = false;
            self.status = format!("Halted after {} ticks", self.ticks);
            return;
        }

        self.step();

        let pc = self.computer.program_counter();
        if self.breakpoints.contains(&pc) {
            self.running = false;
            self.status = format!("Breakpoint at PC={:02x}", pc);
        }
    }

    /// Toggle breakpoint at the current program counter.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.computer.program_counter();
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at PC={:02x}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC={:02x}", pc);
        }
    }

    /// Reload the program and pulse reset.
    pub fn reset(&mut self) {
        if let Err(e) = self.image.load_into(&mut self.computer) {
            self.status = format!("Error: {}", e);
            return;
        }
        self.computer.reset();
        self.ticks = 0;
        self.running = false;
        self.refresh();
        self.status = "Reset. Ready.".into();
    }

    /// Disassembly from a little before the program counter.
    pub fn get_disassembly(&self, lines: usize) -> Vec<(u64, String, bool)> {
        let pc = self.computer.program_counter() & !1;
        let size = self.memory.words.len() as u64;
        let start = pc.saturating_sub(2 * (lines as u64 / 2));

        (0..lines as u64)
            .map(|i| start + 2 * i)
            .take_while(|&addr| addr + 1 < size)
            .map(|addr| {
                let text = disassemble_instruction(self.word(addr), self.word(addr + 1));
                (addr, text, addr == pc)
            })
            .collect()
    }
}

/// Run the front panel with a program.
pub fn run_debugger(image: ProgramImage, config: ComputerConfig) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    let mut app = DebuggerApp::new(image, config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    // Main loop
    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('p') => {
                            app.running = false;
                            app.step_phase();
                        }
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char(' ') => {
                            app.running = false;
                            app.status = "Paused.".into();
                        }
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Up => {
                            app.mem_scroll = app.mem_scroll.saturating_sub(1);
                        }
                        KeyCode::Down => {
                            let rows = app.memory.words.len().div_ceil(16);
                            if app.mem_scroll + 1 < rows {
                                app.mem_scroll += 1;
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        if app.running {
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}
