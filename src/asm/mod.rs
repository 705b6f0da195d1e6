//! Program images for the E20.
//!
//! This module provides:
//! - A loader and writer for the `ram[i] = 16'b...;` machine code format
//! - A disassembler (words → readable E20 assembly)

pub mod machine_code;
pub mod disasm;

pub use disasm::{disassemble, disassemble_instruction};
pub use machine_code::{
    format_machine_code, load_machine_code, parse_machine_code, parse_machine_code_str,
    save_machine_code, MachineCodeError,
};
