//! Conversions between integers and bit sequences.
//!
//! Bit `i` of a sequence carries weight `2^i`; index 0 is the least
//! significant bit everywhere in this crate.

use thiserror::Error;

/// Widest bus whose value still fits the `u64` integer interpretation.
pub const MAX_WIDTH: usize = 64;

/// Errors raised when an integer is presented to a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BitsError {
    #[error("overflow: {value:#x} does not fit in {width} bits")]
    Overflow { value: u64, width: usize },
}

/// Whether `value` is representable in `width` bits.
#[inline]
pub fn fits(value: u64, width: usize) -> bool {
    width >= MAX_WIDTH || value >> width == 0
}

/// Split `value` into `width` bits, failing instead of truncating.
pub fn to_bits(value: u64, width: usize) -> Result<Vec<bool>, BitsError> {
    if !fits(value, width) {
        return Err(BitsError::Overflow { value, width });
    }
    Ok((0..width).map(|i| nth_bit(value, i)).collect())
}

/// Integer interpretation of a bit sequence.
pub fn from_bits<I: IntoIterator<Item = bool>>(bits: I) -> u64 {
    bits.into_iter()
        .take(MAX_WIDTH)
        .enumerate()
        .fold(0, |acc, (i, bit)| if bit { acc | (1 << i) } else { acc })
}

#[inline]
pub fn nth_bit(value: u64, i: usize) -> bool {
    i < MAX_WIDTH && (value >> i) & 1 == 1
}

/// All-ones value for a `width`-bit bus.
#[inline]
pub fn mask(width: usize) -> u64 {
    if width >= MAX_WIDTH {
        u64::MAX
    } else {
        (1 << width) - 1
    }
}
