//! Integer money in minor currency units.
//!
//! Every amount the engine touches is a whole number of cents. Decimal text
//! from the outside world is parsed with `rust_decimal` and rounded to the
//! nearest cent before it becomes a [`Cents`] value; nothing downstream ever
//! sees a fraction of a cent.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;
use thiserror::Error;

/// Errors produced when converting decimal text into [`Cents`].
#[derive(Error, Debug)]
pub enum ParseCentsError {
    /// The text is not a decimal number.
    #[error("invalid decimal: {0}")]
    Decimal(#[from] rust_decimal::Error),

    /// The rounded value does not fit in 64-bit cents.
    #[error("amount {0} is out of range")]
    OutOfRange(Decimal),
}

/// A signed amount of money in cents.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use settlement_engine::Cents;
///
/// let amount = Cents::from_str("10.5").unwrap();
/// assert_eq!(amount.as_i64(), 1050);
/// assert_eq!(amount.to_string(), "10.50");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Cents(i64);

impl Cents {
    /// Number of decimal places in a major-unit rendering.
    pub const SCALE: u32 = 2;

    /// Zero value.
    pub const ZERO: Self = Cents(0);

    /// Largest amount accepted for a single expense or split value read from
    /// input: one trillion major units.
    pub const MAX_AMOUNT: Self = Cents(100_000_000_000_000);

    /// Wraps a raw cent count.
    pub const fn new(cents: i64) -> Self {
        Cents(cents)
    }

    /// Returns the raw cent count.
    pub const fn as_i64(self) -> i64 {
        self.0
    }

    /// Converts a major-unit decimal (e.g. dollars) to cents, rounding half
    /// away from zero.
    pub fn from_major(value: Decimal) -> Result<Self, ParseCentsError> {
        let rounded =
            value.round_dp_with_strategy(Self::SCALE, RoundingStrategy::MidpointAwayFromZero);
        rounded
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|cents| cents.to_i64())
            .map(Cents)
            .ok_or(ParseCentsError::OutOfRange(value))
    }

    /// Checked addition. Returns `None` on `i64` overflow.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Cents)
    }

    /// Saturating addition.
    pub fn saturating_add(self, rhs: Self) -> Self {
        Cents(self.0.saturating_add(rhs.0))
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Absolute value. Saturates at `i64::MAX` for `i64::MIN`.
    pub fn abs(self) -> Self {
        Cents(self.0.saturating_abs())
    }
}

impl From<i64> for Cents {
    fn from(cents: i64) -> Self {
        Cents(cents)
    }
}

impl FromStr for Cents {
    type Err = ParseCentsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s.trim())?;
        Cents::from_major(decimal)
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, magnitude / 100, magnitude % 100)
    }
}

impl Add for Cents {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Cents(self.0 + rhs.0)
    }
}

impl AddAssign for Cents {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Cents {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Cents(self.0 - rhs.0)
    }
}

impl SubAssign for Cents {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Cents {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Cents(-self.0)
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Cents::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Cents> for Cents {
    fn sum<I: Iterator<Item = &'a Cents>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl Serialize for Cents {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cents {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Cents::from_str(&s).map_err(serde::de::Error::custom)
    }
}
