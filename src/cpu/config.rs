//! Machine configuration.
//!
//! A [`MachineConfig`] is built once, validated, and handed to
//! [`Cpu::with_config`](crate::cpu::Cpu::with_config). The defaults describe
//! the reference E20 machine.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Number of general-purpose registers.
pub const NUM_REGS: usize = 8;

/// Width of a machine word in bits.
pub const WORD_BITS: u32 = 16;

/// Number of words in the reference memory.
pub const MEM_SIZE: usize = 8192;

/// Register written by JAL with the return address.
pub const LINK_REGISTER: usize = 7;

/// What the run loop does with an undefined three-register opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedOpcode {
    /// Stop with [`CpuError::Decode`](crate::cpu::CpuError::Decode).
    #[default]
    Fault,
    /// Skip the word: no register write, PC advances by one.
    Ignore,
}

/// Which memory cell the halt detector inspects after a self-jump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HaltProbe {
    /// The word that was actually fetched (`pc mod mem_size`).
    #[default]
    Fetched,
    /// The cell at `pc mod (mem_size - 1)`. Differs from `Fetched` only
    /// when the self-jump sits in the last memory cell.
    Legacy,
}

/// Immutable description of the simulated machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Memory size in words.
    pub mem_size: usize,
    /// Stop with an error after this many steps. `None` runs forever.
    pub max_steps: Option<u64>,
    /// Handling of undefined opcodes.
    pub undefined_opcode: UndefinedOpcode,
    /// Halt detector probe address.
    pub halt_probe: HaltProbe,
}

impl MachineConfig {
    /// Largest memory a 16-bit address can reach.
    pub const MAX_MEM_SIZE: usize = 1 << WORD_BITS;

    /// Check that the configuration describes a machine we can build.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mem_size == 0 || self.mem_size > Self::MAX_MEM_SIZE {
            return Err(ConfigError::MemorySize(self.mem_size));
        }
        if self.max_steps == Some(0) {
            return Err(ConfigError::ZeroStepLimit);
        }
        Ok(())
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_json(&text)
    }

    /// Parse a configuration from JSON text. Missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            mem_size: MEM_SIZE,
            max_steps: None,
            undefined_opcode: UndefinedOpcode::Fault,
            halt_probe: HaltProbe::Fetched,
        }
    }
}

/// Errors that can occur while building a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("memory size {0} out of range (1-65536)")]
    MemorySize(usize),

    #[error("step limit must be at least 1")]
    ZeroStepLimit,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("invalid config: {0}")]
    Parse(String),
}
