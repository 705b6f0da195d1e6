//! Bit field extraction and sign extension.

use super::Word;

/// Extract `width` bits of `word` starting at bit `shift` (0 = LSB).
///
/// The result is right-aligned. A `width` of 16 or more returns every bit
/// above `shift`.
#[inline]
pub const fn field(word: Word, shift: u32, width: u32) -> Word {
    if shift >= Word::BITS {
        return 0;
    }
    let shifted = word >> shift;
    if width >= Word::BITS {
        shifted
    } else {
        shifted & ((1 << width) - 1)
    }
}

/// Sign-extend a `width`-bit two's-complement value into a full word.
///
/// Bits above `width` in `value` are ignored. The high bits of the result
/// are copies of bit `width - 1`, so `sign_extend(0b1111011, 7)` is
/// `0xFFFB`.
#[inline]
pub const fn sign_extend(value: Word, width: u32) -> Word {
    if width == 0 {
        return 0;
    }
    if width >= Word::BITS {
        return value;
    }
    let shift = Word::BITS - width;
    (((value << shift) as i16) >> shift) as Word
}

/// Interpret a `width`-bit two's-complement value as a native signed integer.
///
/// Agrees with [`sign_extend`] modulo 65536, but keeps the sign so it can
/// be added to another quantity (a PC, a base register) before wrapping.
#[inline]
pub const fn signed_value(value: Word, width: u32) -> i32 {
    sign_extend(value, width) as i16 as i32
}
