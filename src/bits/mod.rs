//! Bit-level primitives for the E20 word.
//!
//! This module provides the pieces every other part of the simulator
//! is built from:
//! - [`Word`] - the 16-bit unsigned machine word
//! - [`field`] - fixed-width bit range extraction
//! - [`sign_extend`] / [`signed_value`] - two's-complement immediates
//! - [`arith`] - wraparound 16-bit arithmetic

mod field;
pub mod arith;

pub use field::{field, sign_extend, signed_value};

/// The native 16-bit machine word.
///
/// Registers, memory cells, instructions and the program counter all use
/// this width. Arithmetic on words wraps modulo 65536.
pub type Word = u16;
