//! Pixel storage strategies.
//!
//! Every pixel type picks a backing word type and a packing factor. Numeric pixels
//! store one value per word; `bool` pixels pack 32 to a `u32` word, pixel `i` of a row
//! living in bit `i % 32` of word `i / 32`.

use std::fmt::Debug;

use crate::fixed::Level;

/// Number of bits in a packed boolean storage word.
pub const WORD_BITS: usize = u32::BITS as usize;

/// A pixel type together with the way rows of it are laid out in storage words.
pub trait Pixel: Copy + PartialEq + Default + Debug + Send + Sync + 'static {
    /// Unit of backing storage.
    type Word: Copy + PartialEq + Default + Debug + Send + Sync + 'static;

    /// Number of pixels held by one storage word.
    const PER_WORD: usize;

    /// Read pixel `index` from a row's words.
    fn read(words: &[Self::Word], index: usize) -> Self;

    /// Write pixel `index` into a row's words.
    fn write(words: &mut [Self::Word], index: usize, value: Self);

    /// A word whose every pixel equals `value`.
    fn splat(value: Self) -> Self::Word;

    /// Whether the pixel belongs to the foreground of a binary trace.
    fn is_foreground(self) -> bool;

    /// Signed level relative to `zero` for the zero-crossing tracer, saturated to
    /// a quarter of the mantissa range.
    fn level(self, zero: Level) -> Level;

    /// Neutral level used when the caller does not pick one.
    fn default_zero() -> Level {
        Level::ZERO
    }

    /// Number of words needed for a row of `len` pixels.
    fn words_for(len: usize) -> usize {
        len.div_ceil(Self::PER_WORD)
    }

    /// Append the run lengths of the first `len` pixels to `out`, starting with a
    /// background run (possibly empty), without a terminator.
    fn push_runs(words: &[Self::Word], len: usize, out: &mut Vec<u32>) {
        let mut color = false;
        let mut count = 0u32;
        for index in 0..len {
            if Self::read(words, index).is_foreground() != color {
                out.push(count);
                count = 0;
                color = !color;
            }
            count += 1;
        }
        out.push(count);
    }
}

/// Mantissa of one intensity step.
const LEVEL_SCALE: i64 = Level::ONE.to_bits() as i64;

/// Largest level magnitude handed to the tracer. The difference of two such
/// levels still fits the mantissa.
const MAX_LEVEL_BITS: i64 = (i32::MAX >> 2) as i64;

/// `bits - zero`, saturated to the traceable range. The sign is always kept.
fn level_from_bits(bits: i64, zero: Level) -> Level {
    let bits = bits.saturating_sub(i64::from(zero.to_bits()));
    Level::from_bits(bits.clamp(-MAX_LEVEL_BITS, MAX_LEVEL_BITS) as i32)
}

macro_rules! impl_integer_pixel {
    ($($ty:ty),* $(,)?) => {$(
        impl Pixel for $ty {
            type Word = $ty;
            const PER_WORD: usize = 1;

            fn read(words: &[Self::Word], index: usize) -> Self {
                words[index]
            }

            fn write(words: &mut [Self::Word], index: usize, value: Self) {
                words[index] = value;
            }

            fn splat(value: Self) -> Self::Word {
                value
            }

            fn is_foreground(self) -> bool {
                self != 0
            }

            fn level(self, zero: Level) -> Level {
                level_from_bits(i64::from(self) * LEVEL_SCALE, zero)
            }
        }
    )*};
}

impl_integer_pixel!(i8, u16, i16, i32);

impl Pixel for u8 {
    type Word = u8;
    const PER_WORD: usize = 1;

    fn read(words: &[Self::Word], index: usize) -> Self {
        words[index]
    }

    fn write(words: &mut [Self::Word], index: usize, value: Self) {
        words[index] = value;
    }

    fn splat(value: Self) -> Self::Word {
        value
    }

    fn is_foreground(self) -> bool {
        self != 0
    }

    fn level(self, zero: Level) -> Level {
        level_from_bits(i64::from(self) * LEVEL_SCALE, zero)
    }

    fn default_zero() -> Level {
        Level::from_int(128)
    }
}

macro_rules! impl_float_pixel {
    ($($ty:ty),* $(,)?) => {$(
        impl Pixel for $ty {
            type Word = $ty;
            const PER_WORD: usize = 1;

            fn read(words: &[Self::Word], index: usize) -> Self {
                words[index]
            }

            fn write(words: &mut [Self::Word], index: usize, value: Self) {
                words[index] = value;
            }

            fn splat(value: Self) -> Self::Word {
                value
            }

            fn is_foreground(self) -> bool {
                self != 0.0
            }

            fn level(self, zero: Level) -> Level {
                // `as` saturates and maps NaN to 0
                let bits = (f64::from(self) * LEVEL_SCALE as f64).round() as i64;
                level_from_bits(bits, zero)
            }
        }
    )*};
}

impl_float_pixel!(f32, f64);

impl Pixel for bool {
    type Word = u32;
    const PER_WORD: usize = WORD_BITS;

    fn read(words: &[Self::Word], index: usize) -> Self {
        (words[index / WORD_BITS] >> (index % WORD_BITS)) & 1 != 0
    }

    fn write(words: &mut [Self::Word], index: usize, value: Self) {
        let mask = 1u32 << (index % WORD_BITS);
        let word = &mut words[index / WORD_BITS];
        if value {
            *word |= mask;
        } else {
            *word &= !mask;
        }
    }

    fn splat(value: Self) -> Self::Word {
        if value { u32::MAX } else { 0 }
    }

    fn is_foreground(self) -> bool {
        self
    }

    fn level(self, zero: Level) -> Level {
        let value = if self { 16 } else { -16 };
        level_from_bits(value * LEVEL_SCALE, zero)
    }

    fn push_runs(words: &[Self::Word], len: usize, out: &mut Vec<u32>) {
        let mut start = 0;
        let mut color = false;
        while start < len {
            let end = next_transition(words, start, len, color);
            out.push((end - start) as u32);
            start = end;
            color = !color;
        }
        if len == 0 {
            out.push(0);
        }
    }
}

/// Position of the first pixel at or after `from` whose color differs from `color`,
/// or `len` when the rest of the row keeps that color.
///
/// Works a word at a time: words made entirely of `color` are skipped without looking
/// at individual bits.
pub(crate) fn next_transition(words: &[u32], from: usize, len: usize, color: bool) -> usize {
    let flip = if color { u32::MAX } else { 0 };
    let mut word_index = from / WORD_BITS;
    let mut differing = (words[word_index] ^ flip) & (u32::MAX << (from % WORD_BITS));
    loop {
        if differing != 0 {
            let position = word_index * WORD_BITS + differing.trailing_zeros() as usize;
            return position.min(len);
        }
        word_index += 1;
        if word_index * WORD_BITS >= len {
            return len;
        }
        differing = words[word_index] ^ flip;
    }
}

/// Set or clear the bits `start..end` of a packed row, a word at a time.
pub(crate) fn fill_bit_range(words: &mut [u32], start: usize, end: usize, value: bool) {
    let mut index = start;
    while index < end {
        let offset = index % WORD_BITS;
        let take = (WORD_BITS - offset).min(end - index);
        let mask = if take == WORD_BITS {
            u32::MAX
        } else {
            ((1u32 << take) - 1) << offset
        };
        let word = &mut words[index / WORD_BITS];
        if value {
            *word |= mask;
        } else {
            *word &= !mask;
        }
        index += take;
    }
}
