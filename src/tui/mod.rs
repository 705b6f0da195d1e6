//! TUI debugger for the E20 simulator.
//!
//! Provides an interactive terminal-based debugger with:
//! - Register and PC view
//! - Hex memory view
//! - Step/run/breakpoint controls
//! - Disassembly view around the PC

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
