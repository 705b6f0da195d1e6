//! Disassembler for E20 programs.
//!
//! Renders instruction words as E20 assembly. Three-register and
//! two-register forms list the destination first, as the assembler
//! expects: `add $3,$1,$2`, `addi $1,$0,5`, `lw $2,-3($1)`.

use crate::bits::{arith, signed_value, Word};
use crate::cpu::decode::{decode, Instruction, IMM7_BITS};
use std::fmt;

impl fmt::Display for Instruction {
    /// Formats branch offsets relative to the next instruction.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.mnemonic();
        match *self {
            Instruction::Add { src_a, src_b, dst }
            | Instruction::Sub { src_a, src_b, dst }
            | Instruction::Or { src_a, src_b, dst }
            | Instruction::And { src_a, src_b, dst }
            | Instruction::Slt { src_a, src_b, dst } => {
                write!(f, "{} ${},${},${}", m, dst, src_a, src_b)
            }
            Instruction::Jr { src } => write!(f, "{} ${}", m, src),
            Instruction::Slti { src, dst, imm } | Instruction::Addi { src, dst, imm } => {
                write!(f, "{} ${},${},{}", m, dst, src, imm7(imm))
            }
            Instruction::Lw { src, dst, imm } | Instruction::Sw { src, dst, imm } => {
                write!(f, "{} ${},{}(${})", m, dst, imm7(imm), src)
            }
            Instruction::Jeq { src, dst, imm } => {
                write!(f, "{} ${},${},{:+}", m, src, dst, imm7(imm))
            }
            Instruction::J { imm } | Instruction::Jal { imm } => write!(f, "{} {}", m, imm),
        }
    }
}

#[inline]
fn imm7(imm: Word) -> i32 {
    signed_value(imm, IMM7_BITS)
}

/// Disassemble a single word located at `addr`.
///
/// Branch targets are shown as absolute addresses. Undecodable words are
/// shown as `.fill` data.
pub fn disassemble_instruction(addr: Word, word: Word) -> String {
    match decode(word) {
        Ok(Instruction::Jeq { src, dst, imm }) => {
            let target = arith::offset(addr, 1 + imm7(imm));
            format!("jeq ${},${},{}", src, dst, target)
        }
        Ok(decoded) => decoded.to_string(),
        Err(_) => format!(".fill {}", word),
    }
}

/// Disassemble a slice of words starting at address 0.
pub fn disassemble(words: &[Word]) -> String {
    let mut output = String::new();
    output.push_str("; E20 Disassembly\n");
    output.push_str("; ---------------\n\n");

    for (addr, &word) in words.iter().enumerate() {
        let line = disassemble_instruction(addr as Word, word);
        output.push_str(&format!("{:04}: {:<20}; {:016b}\n", addr, line, word));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::encode;

    fn dis(instr: Instruction, addr: Word) -> String {
        disassemble_instruction(addr, encode(&instr))
    }

    #[test]
    fn test_disassemble_three_reg() {
        assert_eq!(dis(Instruction::Add { src_a: 1, src_b: 2, dst: 3 }, 0), "add $3,$1,$2");
        assert_eq!(dis(Instruction::Slt { src_a: 4, src_b: 5, dst: 6 }, 0), "slt $6,$4,$5");
        assert_eq!(dis(Instruction::Jr { src: 7 }, 0), "jr $7");
    }

    #[test]
    fn test_disassemble_two_reg() {
        assert_eq!(dis(Instruction::Addi { src: 0, dst: 1, imm: 5 }, 0), "addi $1,$0,5");
        assert_eq!(dis(Instruction::Slti { src: 2, dst: 1, imm: 0x7F }, 0), "slti $1,$2,-1");
        assert_eq!(dis(Instruction::Lw { src: 1, dst: 2, imm: 0b1111101 }, 0), "lw $2,-3($1)");
        assert_eq!(dis(Instruction::Sw { src: 1, dst: 2, imm: 4 }, 0), "sw $2,4($1)");
    }

    #[test]
    fn test_disassemble_jeq_absolute_target() {
        let back = Instruction::Jeq { src: 1, dst: 2, imm: 0b1111110 }; // -2
        assert_eq!(dis(back, 10), "jeq $1,$2,9");
        assert_eq!(back.to_string(), "jeq $1,$2,-2");
    }

    #[test]
    fn test_disassemble_jumps() {
        assert_eq!(dis(Instruction::J { imm: 1 }, 1), "j 1");
        assert_eq!(dis(Instruction::Jal { imm: 8191 }, 0), "jal 8191");
    }

    #[test]
    fn test_disassemble_undefined() {
        assert_eq!(disassemble_instruction(0, 0b0000_0000_0000_1111), ".fill 15");
    }

    #[test]
    fn test_disassemble_listing() {
        let listing = disassemble(&[
            encode(&Instruction::Addi { src: 0, dst: 1, imm: 5 }),
            encode(&Instruction::J { imm: 1 }),
        ]);
        assert!(listing.contains("0000: addi $1,$0,5"));
        assert!(listing.contains("0001: j 1"));
    }
}
