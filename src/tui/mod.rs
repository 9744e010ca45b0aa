//! Front-panel debugger for the stored-program computer.
//!
//! Provides an interactive terminal front panel with:
//! - Register and flag lamps
//! - Memory view
//! - Phase/step/run/breakpoint controls
//! - Disassembly around the program counter

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
