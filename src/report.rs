//! Final machine state output.
//!
//! [`format_state`] prints the text block graders diff against:
//!
//! ```text
//! Final state:
//! 	pc=    1
//! 	$0=    0
//! 	...
//! 2085 4001 0000 0000 0000 0000 0000 0000
//! ```
//!
//! [`StateReport`] carries the same data for JSON output.

use crate::bits::Word;
use crate::cpu::{Cpu, CpuState};
use serde::{Serialize, Deserialize};
use std::fmt::Write;

/// Memory words shown by default.
pub const DEFAULT_MEM_QUANTITY: usize = 128;

/// Words per memory line.
const WORDS_PER_LINE: usize = 8;

/// Format the final state: pc, all registers, then the first
/// `mem_quantity` memory words in hex, eight per line.
pub fn format_state(cpu: &Cpu, mem_quantity: usize) -> String {
    let mut out = String::new();

    out.push_str("Final state:\n");
    let _ = writeln!(out, "\tpc={:5}", cpu.regs.pc);
    for (reg, value) in cpu.regs.values().iter().enumerate() {
        let _ = writeln!(out, "\t${}={:5}", reg, value);
    }

    for line in cpu.mem.dump(0, mem_quantity).chunks(WORDS_PER_LINE) {
        for word in line {
            let _ = write!(out, "{:04x} ", word);
        }
        out.push('\n');
    }

    out
}

/// Serializable snapshot of the machine after a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateReport {
    pub pc: Word,
    pub registers: Vec<Word>,
    pub memory: Vec<Word>,
    pub steps: u64,
    pub state: CpuState,
}

impl StateReport {
    /// Capture the pc, registers and the first `mem_quantity` words.
    pub fn capture(cpu: &Cpu, mem_quantity: usize) -> Self {
        Self {
            pc: cpu.regs.pc,
            registers: cpu.regs.values().to_vec(),
            memory: cpu.mem.dump(0, mem_quantity).to_vec(),
            steps: cpu.steps,
            state: cpu.state,
        }
    }
}
