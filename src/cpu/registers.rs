//! E20 register file.
//!
//! The E20 has 8 general-purpose registers `$0`-`$7` and a 16-bit
//! program counter. `$0` always reads as zero; writes to it are dropped.
//! `$7` doubles as the link register for JAL.

use crate::bits::{self, Word};
use crate::cpu::config::NUM_REGS;
use serde::{Serialize, Deserialize};

/// The E20 register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// General-purpose registers. Index 0 is held at zero.
    gpr: [Word; NUM_REGS],

    /// Program counter: address of the next instruction to fetch.
    pub pc: Word,
}

impl Registers {
    /// Create a new register file with all values zeroed.
    pub fn new() -> Self {
        Self {
            gpr: [0; NUM_REGS],
            pc: 0,
        }
    }

    /// Reset all registers to zero.
    pub fn reset(&mut self) {
        self.gpr = [0; NUM_REGS];
        self.pc = 0;
    }

    /// Read a register. Indices wrap to the 3-bit register field.
    #[inline]
    pub fn read(&self, index: usize) -> Word {
        self.gpr[index % NUM_REGS]
    }

    /// Write a register. Writes to `$0` are discarded.
    #[inline]
    pub fn write(&mut self, index: usize, value: Word) {
        let index = index % NUM_REGS;
        if index != 0 {
            self.gpr[index] = value;
        }
    }

    /// All register values in index order.
    pub fn values(&self) -> &[Word; NUM_REGS] {
        &self.gpr
    }

    /// Increment the program counter by 1, wrapping at 16 bits.
    /// Returns the old value.
    pub fn advance_pc(&mut self) -> Word {
        let old = self.pc;
        self.pc = bits::arith::add(self.pc, 1);
        old
    }

    /// Set the program counter to an absolute address.
    pub fn jump(&mut self, addr: Word) {
        self.pc = addr;
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}
