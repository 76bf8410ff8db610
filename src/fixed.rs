use std::fmt;
use std::ops::{Add, AddAssign, Neg, Not, Shl, Shr, Sub, SubAssign};

/// Signed fixed-point scalar: an `i32` mantissa carrying `FRAC` fractional bits.
///
/// All arithmetic is exact integer arithmetic on the mantissa, which keeps sub-pixel
/// positions bit-for-bit reproducible: two crossings interpolated from the same pair
/// of samples always compare equal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fixed<const FRAC: u32>(i32);

/// Sub-pixel coordinate used by the zero-crossing tracer (1/256 pixel).
pub type Coord = Fixed<8>;

/// Signed sample level relative to the zero threshold (1/16 intensity step).
pub type Level = Fixed<4>;

impl<const FRAC: u32> Fixed<FRAC> {
    pub const ZERO: Self = Self(0);
    /// Smallest positive value.
    pub const EPSILON: Self = Self(1);
    pub const ONE: Self = Self(1 << FRAC);
    pub const HALF: Self = Self((1 << FRAC) >> 1);

    const FRAC_MASK: i32 = (1 << FRAC) - 1;
    const SCALE: f64 = (1u64 << FRAC) as f64;

    /// Wrap a raw mantissa.
    pub const fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    /// Raw mantissa.
    pub const fn to_bits(self) -> i32 {
        self.0
    }

    pub const fn from_int(value: i32) -> Self {
        Self(value << FRAC)
    }

    /// Nearest representable value, rounding halves away from zero.
    pub fn from_f64(value: f64) -> Self {
        Self((value * Self::SCALE).round() as i32)
    }

    pub fn from_f32(value: f32) -> Self {
        Self::from_f64(f64::from(value))
    }

    /// `num / den` rounded to the nearest representable value.
    ///
    /// `den` must be non-zero. The intermediate is computed in 64 bits, so any pair of
    /// raw mantissas is accepted.
    pub fn from_ratio(num: i32, den: i32) -> Self {
        let scaled = (i64::from(num) << (FRAC + 1)) / i64::from(den);
        Self(((scaled + 1) >> 1) as i32)
    }

    pub fn to_f64(self) -> f64 {
        f64::from(self.0) / Self::SCALE
    }

    pub fn to_f32(self) -> f32 {
        self.to_f64() as f32
    }

    /// True when the fractional bits are all zero.
    pub const fn is_int(self) -> bool {
        self.0 & Self::FRAC_MASK == 0
    }

    /// True when both values are negative or both are non-negative.
    pub const fn same_sign(self, other: Self) -> bool {
        (self.0 ^ other.0) >= 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub const fn abs(self) -> Self {
        Self(self.0.wrapping_abs())
    }

    /// Largest integer not greater than the value.
    pub const fn floor(self) -> i32 {
        self.0 >> FRAC
    }
}

impl<const FRAC: u32> From<i32> for Fixed<FRAC> {
    fn from(value: i32) -> Self {
        Self::from_int(value)
    }
}

impl<const FRAC: u32> Add for Fixed<FRAC> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl<const FRAC: u32> Sub for Fixed<FRAC> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl<const FRAC: u32> AddAssign for Fixed<FRAC> {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl<const FRAC: u32> SubAssign for Fixed<FRAC> {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl<const FRAC: u32> Neg for Fixed<FRAC> {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

/// Bitwise complement of the mantissa, i.e. `-x - EPSILON`.
impl<const FRAC: u32> Not for Fixed<FRAC> {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl<const FRAC: u32> Shl<u32> for Fixed<FRAC> {
    type Output = Self;

    fn shl(self, rhs: u32) -> Self {
        Self(self.0 << rhs)
    }
}

impl<const FRAC: u32> Shr<u32> for Fixed<FRAC> {
    type Output = Self;

    fn shr(self, rhs: u32) -> Self {
        Self(self.0 >> rhs)
    }
}

impl<const FRAC: u32> fmt::Display for Fixed<FRAC> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match f.precision() {
            Some(precision) => write!(f, "{:.*}", precision, self.to_f64()),
            None => write!(f, "{}", self.to_f64()),
        }
    }
}
