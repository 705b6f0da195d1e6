//! # E20 Simulator
//!
//! An instruction-set simulator for the E20, a small 16-bit educational
//! architecture with 8 registers, a 16-bit program counter and 8192
//! words of unified memory.
//!
//! Programs terminate by convention: a `j` instruction whose target is
//! its own address halts the machine.

pub mod bits;
pub mod cpu;
pub mod asm;
pub mod report;

#[cfg(feature = "tui")]
pub mod tui;

// Re-export commonly used types
pub use bits::Word;
pub use cpu::{Cpu, CpuState, CpuError, MachineConfig, Memory, Registers, Instruction};
pub use asm::{disassemble, load_machine_code, parse_machine_code, MachineCodeError};
pub use report::{format_state, StateReport};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
