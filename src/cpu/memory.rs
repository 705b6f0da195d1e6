//! E20 memory subsystem.
//!
//! A flat array of 16-bit words shared by code and data. Every address is
//! reduced modulo the memory size before use, so reads and writes never
//! fail once the memory exists.

use crate::bits::Word;
use crate::cpu::config::{MachineConfig, MEM_SIZE};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Word-addressed E20 memory.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MemoryImage")]
pub struct Memory {
    cells: Vec<Word>,
}

/// Unchecked serialized form of [`Memory`].
#[derive(Deserialize)]
struct MemoryImage {
    cells: Vec<Word>,
}

impl TryFrom<MemoryImage> for Memory {
    type Error = MemoryError;

    fn try_from(image: MemoryImage) -> Result<Self, Self::Error> {
        if image.cells.is_empty() || image.cells.len() > MachineConfig::MAX_MEM_SIZE {
            return Err(MemoryError::InvalidSize(image.cells.len()));
        }
        Ok(Self { cells: image.cells })
    }
}

impl Memory {
    /// Create the reference 8192-word memory, zeroed.
    pub fn new() -> Self {
        Self::with_size(MEM_SIZE)
    }

    /// Create a zeroed memory of `size` words. `size` must be non-zero.
    pub fn with_size(size: usize) -> Self {
        assert!(size > 0, "memory size must be non-zero");
        Self {
            cells: vec![0; size],
        }
    }

    /// Number of words.
    #[inline]
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    /// Reduce an address into range.
    #[inline]
    pub fn wrap(&self, addr: usize) -> usize {
        addr % self.cells.len()
    }

    /// Read the word at `addr mod size`.
    #[inline]
    pub fn read(&self, addr: usize) -> Word {
        self.cells[self.wrap(addr)]
    }

    /// Write the word at `addr mod size`.
    #[inline]
    pub fn write(&mut self, addr: usize, value: Word) {
        let index = self.wrap(addr);
        self.cells[index] = value;
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Load a program image starting at address 0.
    pub fn load_program(&mut self, program: &[Word]) -> Result<(), MemoryError> {
        if program.len() > self.cells.len() {
            return Err(MemoryError::ProgramTooLarge {
                size: program.len(),
                available: self.cells.len(),
            });
        }

        self.cells[..program.len()].copy_from_slice(program);
        Ok(())
    }

    /// Words `start..start+count`, clipped to the end of memory.
    pub fn dump(&self, start: usize, count: usize) -> &[Word] {
        let start = start.min(self.cells.len());
        let end = start.saturating_add(count).min(self.cells.len());
        &self.cells[start..end]
    }

    /// Index one past the last non-zero word.
    pub fn used_len(&self) -> usize {
        self.cells.iter().rposition(|&w| w != 0).map_or(0, |i| i + 1)
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|&&w| w != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &self.cells.len())
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("memory size {0} out of range (1-65536)")]
    InvalidSize(usize),

    #[error("program size {size} exceeds available space {available}")]
    ProgramTooLarge { size: usize, available: usize },
}
