//! CPU execution engine for the E20.
//!
//! Implements the fetch-decode-execute cycle, every instruction behavior,
//! and the halt convention: a `j` whose target is its own address.

use crate::bits::{arith, sign_extend, signed_value, Word};
use crate::cpu::{Memory, Registers};
use crate::cpu::config::{ConfigError, HaltProbe, MachineConfig, UndefinedOpcode, LINK_REGISTER};
use crate::cpu::decode::{self, DecodeError, Instruction, Reg, Selector, IMM7_BITS};
use crate::cpu::memory::MemoryError;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU observed a jump-to-self and stopped.
    Halted,
    /// CPU stopped on an error.
    Error,
}

/// Record of one executed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Address the word was fetched from (before wrapping into memory).
    pub pc: Word,
    /// Raw instruction word.
    pub word: Word,
    /// Decoded instruction, `None` if the word was skipped as undefined.
    pub instruction: Option<Instruction>,
    /// Program counter after the step.
    pub next_pc: Word,
}

/// The E20 CPU: register file, memory and run state.
#[derive(Clone, Serialize)]
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Instructions executed so far.
    pub steps: u64,
    config: MachineConfig,
    last_instr: Option<Instruction>,
}

impl Cpu {
    /// Create a CPU for the reference machine with zeroed state.
    pub fn new() -> Self {
        Self::build(MachineConfig::default())
    }

    /// Create a CPU from a validated configuration.
    pub fn with_config(config: MachineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: MachineConfig) -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::with_size(config.mem_size),
            state: CpuState::Running,
            steps: 0,
            config,
            last_instr: None,
        }
    }

    /// The configuration this CPU was built with.
    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Reset the CPU to initial state, clearing memory.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.state = CpuState::Running;
        self.steps = 0;
        self.last_instr = None;
    }

    /// Load a program image at address 0.
    pub fn load_program(&mut self, program: &[Word]) -> Result<(), MemoryError> {
        self.mem.load_program(program)?;
        debug!(words = program.len(), "program loaded");
        Ok(())
    }

    /// Execute a single instruction.
    ///
    /// Returns a record of the step, or an error. After a step that
    /// halts, the program counter still holds the self-jump address.
    pub fn step(&mut self) -> Result<Step, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }
        if let Some(limit) = self.config.max_steps {
            if self.steps >= limit {
                self.state = CpuState::Error;
                return Err(CpuError::StepLimit { limit });
            }
        }

        // Fetch
        let pc = self.regs.pc;
        let word = self.mem.read(pc as usize);

        // Decode and execute
        let (instruction, next_pc) = match decode::decode(word) {
            Ok(instr) => (Some(instr), self.execute(instr, pc)),
            Err(e) => match self.config.undefined_opcode {
                UndefinedOpcode::Fault => {
                    self.state = CpuState::Error;
                    return Err(CpuError::Decode { pc, source: e });
                }
                UndefinedOpcode::Ignore => {
                    warn!(pc, word, "skipping undefined instruction");
                    (None, arith::add(pc, 1))
                }
            },
        };

        trace!(pc, word, instr = ?instruction, next_pc, "step");

        self.regs.jump(next_pc);
        self.steps += 1;
        self.last_instr = instruction;

        if next_pc == pc && self.is_halt_word(pc, word) {
            self.state = CpuState::Halted;
            info!(pc, steps = self.steps, "halted");
        }

        Ok(Step { pc, word, instruction, next_pc })
    }

    /// Run until halt or error.
    ///
    /// Returns the number of instructions executed. Without a configured
    /// step limit a program that never jumps to itself runs forever.
    pub fn run(&mut self) -> Result<u64, CpuError> {
        let start_steps = self.steps;

        while self.state == CpuState::Running {
            self.step()?;
        }

        Ok(self.steps - start_steps)
    }

    /// Run for at most `max_steps` instructions.
    pub fn run_limited(&mut self, max_steps: u64) -> Result<u64, CpuError> {
        let start_steps = self.steps;
        let limit = self.steps.saturating_add(max_steps);

        while self.state == CpuState::Running && self.steps < limit {
            self.step()?;
        }

        Ok(self.steps - start_steps)
    }

    /// Execute a decoded instruction fetched from `pc`.
    ///
    /// Mutates registers and memory and returns the next program counter,
    /// already wrapped to 16 bits.
    pub fn execute(&mut self, instr: Instruction, pc: Word) -> Word {
        let next = arith::add(pc, 1);

        match instr {
            // ==================== Three-register ====================

            Instruction::Add { src_a, src_b, dst } => {
                self.alu(dst, src_a, src_b, arith::add);
                next
            }

            Instruction::Sub { src_a, src_b, dst } => {
                self.alu(dst, src_a, src_b, arith::sub);
                next
            }

            Instruction::Or { src_a, src_b, dst } => {
                self.alu(dst, src_a, src_b, arith::or);
                next
            }

            Instruction::And { src_a, src_b, dst } => {
                self.alu(dst, src_a, src_b, arith::and);
                next
            }

            Instruction::Slt { src_a, src_b, dst } => {
                self.alu(dst, src_a, src_b, arith::less_than);
                next
            }

            Instruction::Jr { src } => self.reg(src),

            // ==================== Two-register ====================

            Instruction::Slti { src, dst, imm } => {
                let value = arith::less_than(self.reg(src), sign_extend(imm, IMM7_BITS));
                self.regs.write(dst as usize, value);
                next
            }

            Instruction::Lw { src, dst, imm } => {
                let addr = self.effective_address(src, imm);
                let value = self.mem.read(addr);
                self.regs.write(dst as usize, value);
                next
            }

            Instruction::Sw { src, dst, imm } => {
                let addr = self.effective_address(src, imm);
                let value = self.reg(dst);
                self.mem.write(addr, value);
                next
            }

            Instruction::Jeq { src, dst, imm } => {
                if self.reg(src) == self.reg(dst) {
                    arith::offset(pc, 1 + signed_value(imm, IMM7_BITS))
                } else {
                    next
                }
            }

            Instruction::Addi { src, dst, imm } => {
                let value = arith::offset(self.reg(src), signed_value(imm, IMM7_BITS));
                self.regs.write(dst as usize, value);
                next
            }

            // ==================== Zero-register ====================

            Instruction::J { imm } => imm,

            Instruction::Jal { imm } => {
                self.regs.write(LINK_REGISTER, next);
                imm
            }
        }
    }

    /// Memory index addressed by `$src + sext(imm)`, reduced into memory.
    pub fn effective_address(&self, src: Reg, imm: Word) -> usize {
        let addr = arith::offset(self.reg(src), signed_value(imm, IMM7_BITS));
        self.mem.wrap(addr as usize)
    }

    #[inline]
    fn reg(&self, index: Reg) -> Word {
        self.regs.read(index as usize)
    }

    #[inline]
    fn alu(&mut self, dst: Reg, src_a: Reg, src_b: Reg, op: fn(Word, Word) -> Word) {
        let value = op(self.reg(src_a), self.reg(src_b));
        self.regs.write(dst as usize, value);
    }

    /// Whether the word probed for a self-jump at `pc` is a `j`.
    fn is_halt_word(&self, pc: Word, fetched: Word) -> bool {
        let probed = match self.config.halt_probe {
            HaltProbe::Fetched => fetched,
            HaltProbe::Legacy => {
                let modulus = self.mem.size().saturating_sub(1).max(1);
                self.mem.read(pc as usize % modulus)
            }
        };
        decode::selector(probed) == Selector::J
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("steps", &self.steps)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("at pc={pc}: {source}")]
    Decode { pc: Word, source: DecodeError },

    #[error("step limit of {limit} reached without halting")]
    StepLimit { limit: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::encode;

    fn make_program(instructions: &[Instruction]) -> Vec<Word> {
        instructions.iter().map(encode).collect()
    }

    fn cpu_with(instructions: &[Instruction]) -> Cpu {
        let mut cpu = Cpu::new();
        cpu.load_program(&make_program(instructions)).unwrap();
        cpu
    }

    /// Run one instruction at `pc` with the given register values.
    fn exec_one(instr: Instruction, pc: Word, regs: &[(usize, Word)]) -> (Cpu, Word) {
        let mut cpu = Cpu::new();
        for &(r, v) in regs {
            cpu.regs.write(r, v);
        }
        let next = cpu.execute(instr, pc);
        (cpu, next)
    }

    #[test]
    fn test_addi_then_halt() {
        let mut cpu = cpu_with(&[
            Instruction::Addi { src: 0, dst: 1, imm: 5 },
            Instruction::J { imm: 1 },
        ]);

        let executed = cpu.run().unwrap();

        assert_eq!(executed, 2);
        assert!(cpu.is_halted());
        assert_eq!(cpu.regs.pc, 1);
        assert_eq!(cpu.regs.values(), &[0, 5, 0, 0, 0, 0, 0, 0]);
        assert!(cpu.mem.dump(2, 8190).iter().all(|&w| w == 0));
    }

    #[test]
    fn test_halt_on_first_word() {
        let mut cpu = cpu_with(&[Instruction::J { imm: 0 }]);
        assert_eq!(cpu.run().unwrap(), 1);
        assert_eq!(cpu.regs.pc, 0);
        assert!(cpu.is_halted());
    }

    #[test]
    fn test_empty_memory_runs_adds_to_zero() {
        // An all-zero word is `add $0, $0, $0`: it never halts on its own.
        let mut cpu = Cpu::new();
        assert_eq!(cpu.run_limited(100).unwrap(), 100);
        assert!(cpu.is_running());
        assert_eq!(cpu.regs.pc, 100);
    }

    #[test]
    fn test_step_after_halt() {
        let mut cpu = cpu_with(&[Instruction::J { imm: 0 }]);
        cpu.run().unwrap();
        assert_eq!(cpu.step(), Err(CpuError::NotRunning(CpuState::Halted)));
    }

    #[test]
    fn test_three_reg_ops() {
        let regs = [(1, 65535), (2, 2)];
        let (cpu, next) = exec_one(Instruction::Add { src_a: 1, src_b: 2, dst: 3 }, 10, &regs);
        assert_eq!((cpu.regs.read(3), next), (1, 11));

        let (cpu, _) = exec_one(Instruction::Sub { src_a: 2, src_b: 1, dst: 3 }, 10, &regs);
        assert_eq!(cpu.regs.read(3), 3);

        let (cpu, _) = exec_one(Instruction::Or { src_a: 1, src_b: 2, dst: 3 }, 10, &[(1, 0b1010), (2, 0b0101)]);
        assert_eq!(cpu.regs.read(3), 0b1111);

        let (cpu, _) = exec_one(Instruction::And { src_a: 1, src_b: 2, dst: 3 }, 10, &[(1, 0b1110), (2, 0b0111)]);
        assert_eq!(cpu.regs.read(3), 0b0110);
    }

    #[test]
    fn test_slt_unsigned() {
        let (cpu, _) = exec_one(Instruction::Slt { src_a: 1, src_b: 2, dst: 3 }, 0, &[(1, 1), (2, 0xFFFF)]);
        assert_eq!(cpu.regs.read(3), 1);

        let (cpu, _) = exec_one(Instruction::Slt { src_a: 2, src_b: 1, dst: 3 }, 0, &[(1, 1), (2, 0xFFFF)]);
        assert_eq!(cpu.regs.read(3), 0);
    }

    #[test]
    fn test_writes_to_zero_register_still_advance() {
        let cases = [
            Instruction::Add { src_a: 1, src_b: 1, dst: 0 },
            Instruction::Slt { src_a: 0, src_b: 1, dst: 0 },
            Instruction::Addi { src: 1, dst: 0, imm: 3 },
            Instruction::Lw { src: 1, dst: 0, imm: 0 },
            Instruction::Slti { src: 0, dst: 0, imm: 5 },
        ];
        for instr in cases {
            let (mut cpu, _) = exec_one(instr, 0, &[(1, 9)]);
            cpu.mem.write(9, 77);
            let next = cpu.execute(instr, 20);
            assert_eq!(cpu.regs.read(0), 0, "{:?}", instr);
            assert_eq!(next, 21, "{:?}", instr);
        }
    }

    #[test]
    fn test_jr() {
        let (_, next) = exec_one(Instruction::Jr { src: 5 }, 3, &[(5, 40000)]);
        assert_eq!(next, 40000);
    }

    #[test]
    fn test_slti_compares_against_extended_pattern() {
        // imm -1 extends to 0xFFFF, so every value but 0xFFFF is below it.
        let (cpu, _) = exec_one(Instruction::Slti { src: 1, dst: 2, imm: 0x7F }, 0, &[(1, 1000)]);
        assert_eq!(cpu.regs.read(2), 1);

        let (cpu, _) = exec_one(Instruction::Slti { src: 1, dst: 2, imm: 5 }, 0, &[(1, 4)]);
        assert_eq!(cpu.regs.read(2), 1);

        let (cpu, _) = exec_one(Instruction::Slti { src: 1, dst: 2, imm: 5 }, 0, &[(1, 5)]);
        assert_eq!(cpu.regs.read(2), 0);
    }

    #[test]
    fn test_lw_sw_wrap_address() {
        let mut cpu = Cpu::new();
        cpu.regs.write(1, 65535);
        cpu.regs.write(2, 0xBEEF);

        // 65535 + 1 wraps to 0
        let next = cpu.execute(Instruction::Sw { src: 1, dst: 2, imm: 1 }, 0);
        assert_eq!(next, 1);
        assert_eq!(cpu.mem.read(0), 0xBEEF);

        // 65535 + 10 = 9 (mod 65536)
        cpu.mem.write(9, 1234);
        cpu.execute(Instruction::Lw { src: 1, dst: 3, imm: 10 }, 0);
        assert_eq!(cpu.regs.read(3), 1234);

        // 8191 + 3 wraps to 2 within memory
        cpu.regs.write(4, 8191);
        assert_eq!(cpu.effective_address(4, 3), 2);
    }

    #[test]
    fn test_lw_negative_offset() {
        let mut cpu = Cpu::new();
        cpu.regs.write(1, 10);
        cpu.mem.write(7, 55);
        // imm 0b1111101 = -3
        cpu.execute(Instruction::Lw { src: 1, dst: 2, imm: 0b1111101 }, 0);
        assert_eq!(cpu.regs.read(2), 55);
    }

    #[test]
    fn test_sw_from_zero_register_stores_zero() {
        let mut cpu = Cpu::new();
        cpu.mem.write(5, 99);
        cpu.execute(Instruction::Sw { src: 0, dst: 0, imm: 5 }, 0);
        assert_eq!(cpu.mem.read(5), 0);
    }

    #[test]
    fn test_jeq() {
        let taken = Instruction::Jeq { src: 1, dst: 2, imm: 0b1111110 }; // -2
        let (_, next) = exec_one(taken, 10, &[(1, 4), (2, 4)]);
        assert_eq!(next, 9);

        let (_, next) = exec_one(taken, 10, &[(1, 4), (2, 5)]);
        assert_eq!(next, 11);

        // branch below zero wraps to the top of the PC range
        let (_, next) = exec_one(taken, 0, &[]);
        assert_eq!(next, 65535);
    }

    #[test]
    fn test_addi_negative() {
        let (cpu, _) = exec_one(Instruction::Addi { src: 1, dst: 1, imm: 0x7F }, 0, &[(1, 0)]);
        assert_eq!(cpu.regs.read(1), 65535);
    }

    #[test]
    fn test_jal_and_jr_return() {
        let mut cpu = cpu_with(&[
            Instruction::Jal { imm: 3 },           // 0: call
            Instruction::J { imm: 1 },             // 1: halt
            Instruction::Addi { src: 0, dst: 2, imm: 1 },
            Instruction::Addi { src: 0, dst: 1, imm: 9 }, // 3: body
            Instruction::Jr { src: 7 },            // 4: return
        ]);

        cpu.run().unwrap();

        assert!(cpu.is_halted());
        assert_eq!(cpu.regs.pc, 1);
        assert_eq!(cpu.regs.read(7), 1);
        assert_eq!(cpu.regs.read(1), 9);
        assert_eq!(cpu.regs.read(2), 0);
    }

    #[test]
    fn test_jal_to_self_does_not_halt() {
        let mut cpu = cpu_with(&[Instruction::Jal { imm: 0 }]);
        assert_eq!(cpu.run_limited(50).unwrap(), 50);
        assert!(cpu.is_running());
        assert_eq!(cpu.regs.read(7), 1);
    }

    #[test]
    fn test_other_self_jumps_do_not_halt() {
        // jeq $0, $0, -1 and jr to own address loop forever
        let mut cpu = cpu_with(&[Instruction::Jeq { src: 0, dst: 0, imm: 0x7F }]);
        assert_eq!(cpu.run_limited(20).unwrap(), 20);
        assert!(cpu.is_running());

        let mut cpu = cpu_with(&[Instruction::Jr { src: 0 }]);
        assert_eq!(cpu.run_limited(20).unwrap(), 20);
        assert!(cpu.is_running());
    }

    #[test]
    fn test_undefined_opcode_faults_by_default() {
        let mut cpu = Cpu::new();
        cpu.load_program(&[0b000_001_010_011_0101]).unwrap();

        let err = cpu.run().unwrap_err();
        assert!(matches!(err, CpuError::Decode { pc: 0, .. }));
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().starts_with("invalid three-register function code"));
        assert_eq!(cpu.state, CpuState::Error);
    }

    #[test]
    fn test_undefined_opcode_ignored_when_lenient() {
        let config = MachineConfig { undefined_opcode: UndefinedOpcode::Ignore, ..Default::default() };
        let mut cpu = Cpu::with_config(config).unwrap();
        cpu.regs.write(1, 3);
        cpu.load_program(&[
            0b000_001_001_001_0111,
            encode(&Instruction::J { imm: 1 }),
        ]).unwrap();

        let step = cpu.step().unwrap();
        assert_eq!(step.instruction, None);
        assert_eq!(step.next_pc, 1);
        assert_eq!(cpu.regs.read(1), 3);

        cpu.run().unwrap();
        assert!(cpu.is_halted());
        assert_eq!(cpu.steps, 2);
    }

    #[test]
    fn test_step_limit() {
        let config = MachineConfig { max_steps: Some(10), ..Default::default() };
        let mut cpu = Cpu::with_config(config).unwrap();

        assert_eq!(cpu.run(), Err(CpuError::StepLimit { limit: 10 }));
        assert_eq!(cpu.steps, 10);
        assert_eq!(cpu.state, CpuState::Error);
    }

    #[test]
    fn test_halt_in_last_cell_depends_on_probe() {
        let halt = encode(&Instruction::J { imm: 8191 });

        // Fetched probe sees the `j` at 8191.
        let mut cpu = Cpu::new();
        cpu.mem.write(8191, halt);
        cpu.regs.jump(8191);
        cpu.run_limited(5).unwrap();
        assert!(cpu.is_halted());

        // Legacy probe reads cell 8191 % 8191 = 0, which is not a `j`.
        let config = MachineConfig { halt_probe: HaltProbe::Legacy, ..Default::default() };
        let mut cpu = Cpu::with_config(config).unwrap();
        cpu.mem.write(8191, halt);
        cpu.regs.jump(8191);
        assert_eq!(cpu.run_limited(5).unwrap(), 5);
        assert!(cpu.is_running());
        assert_eq!(cpu.regs.pc, 8191);
    }

    #[test]
    fn test_probes_agree_below_last_cell() {
        let config = MachineConfig { halt_probe: HaltProbe::Legacy, ..Default::default() };
        let mut cpu = Cpu::with_config(config).unwrap();
        cpu.load_program(&make_program(&[
            Instruction::Addi { src: 0, dst: 1, imm: 5 },
            Instruction::J { imm: 1 },
        ])).unwrap();
        cpu.run().unwrap();
        assert!(cpu.is_halted());
        assert_eq!(cpu.regs.pc, 1);
    }

    #[test]
    fn test_fetch_wraps_pc_into_memory() {
        let mut cpu = Cpu::new();
        cpu.mem.write(5, encode(&Instruction::Addi { src: 0, dst: 1, imm: 1 }));
        cpu.regs.jump(8192 + 5);

        let step = cpu.step().unwrap();
        assert_eq!(step.pc, 8197);
        assert_eq!(step.next_pc, 8198);
        assert_eq!(cpu.regs.read(1), 1);
    }

    #[test]
    fn test_pc_wraps_at_16_bits() {
        let mut cpu = Cpu::new();
        cpu.regs.jump(65535);
        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0);
    }

    #[test]
    fn test_reset() {
        let mut cpu = cpu_with(&[Instruction::Addi { src: 0, dst: 1, imm: 5 }, Instruction::J { imm: 1 }]);
        cpu.run().unwrap();
        cpu.reset();
        assert!(cpu.is_running());
        assert_eq!(cpu.steps, 0);
        assert_eq!(cpu.regs, Registers::new());
        assert_eq!(cpu.mem.used_len(), 0);
    }
}
