//! Wraparound arithmetic on 16-bit words.
//!
//! Every result is reduced modulo 65536, matching the register width.

use super::Word;

/// Add two words modulo 65536.
#[inline]
pub const fn add(a: Word, b: Word) -> Word {
    a.wrapping_add(b)
}

/// Subtract `b` from `a` modulo 65536.
#[inline]
pub const fn sub(a: Word, b: Word) -> Word {
    a.wrapping_sub(b)
}

/// Bitwise OR.
#[inline]
pub const fn or(a: Word, b: Word) -> Word {
    a | b
}

/// Bitwise AND.
#[inline]
pub const fn and(a: Word, b: Word) -> Word {
    a & b
}

/// Unsigned comparison, returning 1 when `a < b` and 0 otherwise.
#[inline]
pub const fn less_than(a: Word, b: Word) -> Word {
    (a < b) as Word
}

/// Add a signed offset to a word and wrap the result to 16 bits.
///
/// Used for PC-relative targets and base+offset addressing.
#[inline]
pub const fn offset(base: Word, delta: i32) -> Word {
    (base as i32).wrapping_add(delta).rem_euclid(1 << Word::BITS) as Word
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_wraps() {
        assert_eq!(add(65535, 2), 1);
        assert_eq!(add(3, 4), 7);
    }

    #[test]
    fn test_sub_wraps() {
        assert_eq!(sub(0, 1), 65535);
        assert_eq!(sub(10, 3), 7);
    }

    #[test]
    fn test_less_than_is_unsigned() {
        assert_eq!(less_than(1, 2), 1);
        assert_eq!(less_than(2, 1), 0);
        assert_eq!(less_than(2, 2), 0);
        // 0xFFFF is large, not -1
        assert_eq!(less_than(0xFFFF, 1), 0);
    }

    #[test]
    fn test_offset() {
        assert_eq!(offset(10, -3), 7);
        assert_eq!(offset(0, -1), 65535);
        assert_eq!(offset(65535, 1), 0);
        assert_eq!(offset(65535, 63), 62);
    }
}
