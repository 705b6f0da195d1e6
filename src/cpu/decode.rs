//! Instruction decoder for the E20.
//!
//! Every instruction is one 16-bit word. The top 3 bits (the format
//! selector) choose one of three layouts:
//!
//! ```text
//! three-register  000 | srcA:3 | srcB:3 | dst:3 | func:4
//! zero-register   01x | imm:13
//! two-register    op:3 | src:3 | dst:3 | imm:7
//! ```

use crate::bits::{field, Word};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// A register index in `0..8`.
pub type Reg = u8;

/// Decoded E20 instruction.
///
/// Immediates are kept as the raw field bits; sign extension happens at
/// execution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    // ==================== Three-register ====================

    /// `$dst := $src_a + $src_b`
    Add { src_a: Reg, src_b: Reg, dst: Reg },

    /// `$dst := $src_a - $src_b`
    Sub { src_a: Reg, src_b: Reg, dst: Reg },

    /// `$dst := $src_a | $src_b`
    Or { src_a: Reg, src_b: Reg, dst: Reg },

    /// `$dst := $src_a & $src_b`
    And { src_a: Reg, src_b: Reg, dst: Reg },

    /// `$dst := ($src_a < $src_b) ? 1 : 0`, unsigned.
    Slt { src_a: Reg, src_b: Reg, dst: Reg },

    /// `pc := $src`
    Jr { src: Reg },

    // ==================== Two-register ====================

    /// `$dst := ($src < sext(imm)) ? 1 : 0`, unsigned.
    Slti { src: Reg, dst: Reg, imm: Word },

    /// `$dst := mem[$src + imm]`
    Lw { src: Reg, dst: Reg, imm: Word },

    /// `mem[$src + imm] := $dst`
    Sw { src: Reg, dst: Reg, imm: Word },

    /// `if $src == $dst then pc := pc + 1 + imm`
    Jeq { src: Reg, dst: Reg, imm: Word },

    /// `$dst := $src + imm`
    Addi { src: Reg, dst: Reg, imm: Word },

    // ==================== Zero-register ====================

    /// `pc := imm`
    J { imm: Word },

    /// `$7 := pc + 1; pc := imm`
    Jal { imm: Word },
}

/// Format selector values (bits 15-13).
pub struct Selector;

impl Selector {
    pub const THREE_REG: Word = 0b000;
    pub const ADDI: Word = 0b001;
    pub const J: Word = 0b010;
    pub const JAL: Word = 0b011;
    pub const LW: Word = 0b100;
    pub const SW: Word = 0b101;
    pub const JEQ: Word = 0b110;
    pub const SLTI: Word = 0b111;
}

/// Function codes of the three-register format (bits 3-0).
struct Func;

impl Func {
    const ADD: Word = 0b0000;
    const SUB: Word = 0b0001;
    const OR: Word = 0b0010;
    const AND: Word = 0b0011;
    const SLT: Word = 0b0100;
    const JR: Word = 0b1000;
}

/// Width of the two-register immediate.
pub const IMM7_BITS: u32 = 7;

/// Width of the zero-register immediate.
pub const IMM13_BITS: u32 = 13;

/// Extract the format selector of a raw word.
#[inline]
pub const fn selector(word: Word) -> Word {
    field(word, 13, 3)
}

#[inline]
fn reg(word: Word, shift: u32) -> Reg {
    field(word, shift, 3) as Reg
}

/// Decode a 16-bit instruction word.
///
/// Pure: the result depends only on `word`.
pub fn decode(word: Word) -> Result<Instruction, DecodeError> {
    let instruction = match selector(word) {
        Selector::THREE_REG => {
            let src_a = reg(word, 10);
            let src_b = reg(word, 7);
            let dst = reg(word, 4);
            match field(word, 0, 4) {
                Func::ADD => Instruction::Add { src_a, src_b, dst },
                Func::SUB => Instruction::Sub { src_a, src_b, dst },
                Func::OR => Instruction::Or { src_a, src_b, dst },
                Func::AND => Instruction::And { src_a, src_b, dst },
                Func::SLT => Instruction::Slt { src_a, src_b, dst },
                Func::JR => Instruction::Jr { src: src_a },
                func => return Err(DecodeError::InvalidOpcode { word, func }),
            }
        }
        Selector::J => Instruction::J { imm: field(word, 0, IMM13_BITS) },
        Selector::JAL => Instruction::Jal { imm: field(word, 0, IMM13_BITS) },
        op => {
            let src = reg(word, 10);
            let dst = reg(word, 7);
            let imm = field(word, 0, IMM7_BITS);
            match op {
                Selector::ADDI => Instruction::Addi { src, dst, imm },
                Selector::LW => Instruction::Lw { src, dst, imm },
                Selector::SW => Instruction::Sw { src, dst, imm },
                Selector::JEQ => Instruction::Jeq { src, dst, imm },
                _ => Instruction::Slti { src, dst, imm },
            }
        }
    };

    Ok(instruction)
}

/// Encode an instruction back to a 16-bit word.
///
/// Register indices and immediates are truncated to their field widths.
pub fn encode(instr: &Instruction) -> Word {
    fn three_reg(src_a: Reg, src_b: Reg, dst: Reg, func: Word) -> Word {
        ((src_a as Word & 7) << 10) | ((src_b as Word & 7) << 7) | ((dst as Word & 7) << 4) | func
    }
    fn two_reg(op: Word, src: Reg, dst: Reg, imm: Word) -> Word {
        (op << 13) | ((src as Word & 7) << 10) | ((dst as Word & 7) << 7) | (imm & 0x7F)
    }
    fn zero_reg(op: Word, imm: Word) -> Word {
        (op << 13) | (imm & 0x1FFF)
    }

    match *instr {
        Instruction::Add { src_a, src_b, dst } => three_reg(src_a, src_b, dst, Func::ADD),
        Instruction::Sub { src_a, src_b, dst } => three_reg(src_a, src_b, dst, Func::SUB),
        Instruction::Or { src_a, src_b, dst } => three_reg(src_a, src_b, dst, Func::OR),
        Instruction::And { src_a, src_b, dst } => three_reg(src_a, src_b, dst, Func::AND),
        Instruction::Slt { src_a, src_b, dst } => three_reg(src_a, src_b, dst, Func::SLT),
        Instruction::Jr { src } => three_reg(src, 0, 0, Func::JR),
        Instruction::Slti { src, dst, imm } => two_reg(Selector::SLTI, src, dst, imm),
        Instruction::Lw { src, dst, imm } => two_reg(Selector::LW, src, dst, imm),
        Instruction::Sw { src, dst, imm } => two_reg(Selector::SW, src, dst, imm),
        Instruction::Jeq { src, dst, imm } => two_reg(Selector::JEQ, src, dst, imm),
        Instruction::Addi { src, dst, imm } => two_reg(Selector::ADDI, src, dst, imm),
        Instruction::J { imm } => zero_reg(Selector::J, imm),
        Instruction::Jal { imm } => zero_reg(Selector::JAL, imm),
    }
}

impl Instruction {
    /// Format selector this instruction encodes to.
    pub fn selector(&self) -> Word {
        selector(encode(self))
    }

    /// Lowercase assembly mnemonic.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Add { .. } => "add",
            Instruction::Sub { .. } => "sub",
            Instruction::Or { .. } => "or",
            Instruction::And { .. } => "and",
            Instruction::Slt { .. } => "slt",
            Instruction::Jr { .. } => "jr",
            Instruction::Slti { .. } => "slti",
            Instruction::Lw { .. } => "lw",
            Instruction::Sw { .. } => "sw",
            Instruction::Jeq { .. } => "jeq",
            Instruction::Addi { .. } => "addi",
            Instruction::J { .. } => "j",
            Instruction::Jal { .. } => "jal",
        }
    }
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid three-register function code {func:#06b} in word {word:#06x}")]
    InvalidOpcode { word: Word, func: Word },
}
