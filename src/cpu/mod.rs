//! CPU emulation for the E20.
//!
//! This module implements the complete E20 architecture:
//! - 8192 sixteen-bit memory words shared by code and data
//! - 8 registers `$0`-`$7` (`$0` fixed at zero) and a 16-bit PC
//! - 13 instructions in three encoding formats

pub mod config;
pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;

pub use config::{MachineConfig, ConfigError, UndefinedOpcode, HaltProbe};
pub use memory::{Memory, MemoryError};
pub use registers::Registers;
pub use decode::{Instruction, DecodeError, decode, encode};
pub use execute::{Cpu, CpuError, CpuState, Step};
