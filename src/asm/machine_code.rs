//! E20 machine code file format.
//!
//! One memory word per line, in the form produced by the E20 assembler:
//!
//! ```text
//! ram[0] = 16'b0010000010000101;  // addi $1, $0, 5
//! ram[1] = 16'b0100000000000001;  // j 1
//! ```
//!
//! Addresses start at 0 and increase by one per line. Anything after the
//! `;` is ignored.

use crate::bits::Word;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use thiserror::Error;

/// Parse machine code text from a reader.
///
/// `capacity` is the memory size in words; an address at or beyond it is
/// rejected. Loading stops at the first error.
pub fn parse_machine_code<R: BufRead>(reader: R, capacity: usize) -> Result<Vec<Word>, MachineCodeError> {
    let mut words = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(|e| MachineCodeError::Io(e.to_string()))?;
        let line_num = line_num + 1;

        let (addr, value) = parse_line(&line).ok_or_else(|| MachineCodeError::Parse {
            line: line_num,
            text: line.clone(),
        })?;

        let expected = words.len();
        if addr != expected {
            return Err(MachineCodeError::Sequence { line: line_num, found: addr, expected });
        }
        if addr >= capacity {
            return Err(MachineCodeError::Capacity { line: line_num, addr, capacity });
        }

        words.push(value);
    }

    Ok(words)
}

/// Parse machine code held in a string.
pub fn parse_machine_code_str(text: &str, capacity: usize) -> Result<Vec<Word>, MachineCodeError> {
    parse_machine_code(text.as_bytes(), capacity)
}

/// Load a machine code file from disk.
pub fn load_machine_code<P: AsRef<Path>>(path: P, capacity: usize) -> Result<Vec<Word>, MachineCodeError> {
    let file = std::fs::File::open(path.as_ref())
        .map_err(|e| MachineCodeError::Io(e.to_string()))?;
    parse_machine_code(BufReader::new(file), capacity)
}

/// Render words in machine code format.
pub fn format_machine_code(words: &[Word]) -> String {
    words
        .iter()
        .enumerate()
        .map(|(addr, word)| format!("ram[{}] = 16'b{:016b};\n", addr, word))
        .collect()
}

/// Save words to disk in machine code format.
pub fn save_machine_code<P: AsRef<Path>>(path: P, words: &[Word]) -> Result<(), MachineCodeError> {
    let mut file = std::fs::File::create(path.as_ref())
        .map_err(|e| MachineCodeError::Io(e.to_string()))?;
    file.write_all(format_machine_code(words).as_bytes())
        .map_err(|e| MachineCodeError::Io(e.to_string()))
}

/// Split `ram[<addr>] = 16'b<bits>;<rest>` into address and word.
fn parse_line(line: &str) -> Option<(usize, Word)> {
    let rest = line.strip_prefix("ram[")?;
    let (addr, rest) = split_run(rest, |c| c.is_ascii_digit())?;
    let rest = rest.strip_prefix("] = 16'b")?;
    let (bits, rest) = split_run(rest, |c| c.is_ascii_digit())?;
    rest.strip_prefix(';')?;

    // An address too large for usize is still out of sequence.
    let addr = addr.parse().unwrap_or(usize::MAX);
    let value = Word::from_str_radix(bits, 2).ok()?;
    Some((addr, value))
}

/// Split off a non-empty leading run of characters matching `pred`.
fn split_run(s: &str, pred: impl Fn(char) -> bool) -> Option<(&str, &str)> {
    let end = s.find(|c: char| !pred(c)).unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    Some(s.split_at(end))
}

/// Errors that can occur while loading machine code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineCodeError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("can't parse line {line}: {text}")]
    Parse { line: usize, text: String },

    #[error("memory addresses encountered out of sequence on line {line}: {found} (expected {expected})")]
    Sequence { line: usize, found: usize, expected: usize },

    #[error("program too big for memory: address {addr} on line {line} exceeds capacity {capacity}")]
    Capacity { line: usize, addr: usize, capacity: usize },
}
