//! Debugger application state and logic.

use crate::{Cpu, MachineConfig, Word};
use crate::asm::disasm::disassemble_instruction;
use crate::cpu::ConfigError;
use std::collections::HashSet;

/// Debugger application state.
pub struct DebuggerApp {
    /// The CPU being debugged.
    pub cpu: Cpu,
    /// Original program for reference.
    pub program: Vec<Word>,
    /// Breakpoints (by address).
    pub breakpoints: HashSet<Word>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Memory view scroll offset, in rows of 8 words.
    pub mem_scroll: usize,
}

impl DebuggerApp {
    /// Steps executed per tick while running continuously.
    const STEPS_PER_TICK: usize = 1000;

    /// Create a new debugger with a loaded program.
    pub fn new(program: Vec<Word>, config: MachineConfig) -> Result<Self, ConfigError> {
        let mut cpu = Cpu::with_config(config)?;
        let status = match cpu.load_program(&program) {
            Ok(()) => "Ready. Press 's' to step, 'r' to run, 'q' to quit.".to_string(),
            Err(e) => format!("Load error: {}", e),
        };

        Ok(Self {
            cpu,
            program,
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status,
            mem_scroll: 0,
        })
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        if !self.cpu.is_running() {
            self.status = format!("CPU stopped: {:?}", self.cpu.state);
            self.running = false;
            return;
        }

        match self.cpu.step() {
            Ok(step) => {
                let disasm = disassemble_instruction(step.pc, step.word);
                self.status = if self.cpu.is_halted() {
                    format!("Halted at pc={} after {} steps", step.pc, self.cpu.steps)
                } else {
                    format!("pc={:04}: {}", step.pc, disasm)
                };
            }
            Err(e) => {
                self.status = format!("Error: {}", e);
                self.running = false;
            }
        }
    }

    /// Run until halt, breakpoint, or error.
    pub fn run(&mut self) {
        self.running = true;
        self.status = "Running...".into();
    }

    /// Run one batch of continuous execution.
    pub fn tick(&mut self) {
        for _ in 0..Self::STEPS_PER_TICK {
            if !self.running {
                return;
            }

            if !self.cpu.is_running() {
                self.running = false;
                return;
            }

            self.step();

            let pc = self.cpu.regs.pc;
            if self.running && self.breakpoints.contains(&pc) {
                self.running = false;
                self.status = format!("Breakpoint at pc={}", pc);
            }
        }
    }

    /// Toggle breakpoint at the current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.cpu.regs.pc;
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at pc={}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at pc={}", pc);
        }
    }

    /// Reset CPU to initial state and reload the program.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.running = false;
        self.status = match self.cpu.load_program(&self.program) {
            Ok(()) => "Reset. Ready.".into(),
            Err(e) => format!("Load error: {}", e),
        };
    }

    /// Scroll the memory view by `rows`, clamped to memory.
    pub fn scroll_memory(&mut self, rows: isize) {
        let max_row = self.cpu.mem.size().saturating_sub(1) / 8;
        self.mem_scroll = self.mem_scroll.saturating_add_signed(rows).min(max_row);
    }

    /// Get disassembly around current PC: `(addr, text, is_current)`.
    pub fn get_disassembly(&self, lines: usize) -> Vec<(Word, String, bool)> {
        let pc = self.cpu.regs.pc as usize % self.cpu.mem.size();
        let start = pc.saturating_sub(lines / 2);
        let end = (start + lines).min(self.cpu.mem.size());

        (start..end)
            .map(|addr| {
                let word = self.cpu.mem.read(addr);
                let addr = addr as Word;
                (addr, disassemble_instruction(addr, word), addr as usize == pc)
            })
            .collect()
    }
}

/// Run the debugger with a program.
pub fn run_debugger(program: Vec<Word>, config: MachineConfig) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    let mut app = DebuggerApp::new(program, config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    // Main loop
    loop {
        // Draw
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        // Handle input
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => {
                            app.running = false;
                            app.status = "Paused.".into();
                        }
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Up => app.scroll_memory(-1),
                        KeyCode::Down => app.scroll_memory(1),
                        KeyCode::PageUp => app.scroll_memory(-16),
                        KeyCode::PageDown => app.scroll_memory(16),
                        _ => {}
                    }
                }
            }
        }

        // Tick for continuous running
        if app.running {
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}
