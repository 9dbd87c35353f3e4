//! # Fixed-Point Credit Amounts
//!
//! **CRITICAL: NO FLOATING POINT IN BALANCE CALCULATIONS**
//!
//! Credits are the arcade's money-like currency: two decimal places, stored
//! as u64 minor units (cents). All arithmetic is integer arithmetic.
//!
//! ## Why Fixed-Point?
//!
//! - Deterministic: same calculation = same result on all hardware
//! - No rounding errors: 0.10 + 0.20 == 0.30 (unlike IEEE 754 floats)
//! - Auditable: every transaction entry must be reproducible to the cent

use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{EconomyError, EconomyResult};

/// Number of decimal places for credit amounts.
const DECIMAL_PLACES: u32 = 2;

/// The multiplier between whole credits and minor units.
const MULTIPLIER: u64 = 10u64.pow(DECIMAL_PLACES);

/// A non-negative credit amount with 2 decimal places.
///
/// Internally stores value * 100 as a u64.
///
/// # Range
///
/// - Minimum: 0.00
/// - Maximum: 184,467,440,737,095,516.15
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Credits(u64);

impl Credits {
    /// Zero credits.
    pub const ZERO: Self = Self(0);

    /// One credit (1.00).
    pub const ONE: Self = Self(MULTIPLIER);

    /// Maximum representable amount.
    pub const MAX: Self = Self(u64::MAX);

    /// Creates an amount from whole credits.
    #[inline]
    #[must_use]
    pub const fn from_whole(whole: u64) -> Self {
        Self(whole * MULTIPLIER)
    }

    /// Creates an amount from whole credits and cents (0-99).
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let price = Credits::from_parts(8, 0);   // 8.00
    /// let dust = Credits::from_parts(0, 5);    // 0.05
    /// ```
    #[inline]
    #[must_use]
    pub const fn from_parts(whole: u64, cents: u8) -> Self {
        Self(whole * MULTIPLIER + (cents as u64 % MULTIPLIER))
    }

    /// Creates an amount from raw minor units (cents).
    #[inline]
    #[must_use]
    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    /// Returns the raw minor-unit value (cents).
    #[inline]
    #[must_use]
    pub const fn minor(self) -> u64 {
        self.0
    }

    /// Returns the whole-credit part.
    #[inline]
    #[must_use]
    pub const fn whole(self) -> u64 {
        self.0 / MULTIPLIER
    }

    /// Returns the cent part (0-99).
    #[inline]
    #[must_use]
    pub const fn cents(self) -> u8 {
        (self.0 % MULTIPLIER) as u8
    }

    /// Checked addition. Returns `None` on overflow.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, rhs: Self) -> Option<Self> {
        match self.0.checked_add(rhs.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Checked subtraction. Returns `None` on underflow.
    #[inline]
    #[must_use]
    pub const fn checked_sub(self, rhs: Self) -> Option<Self> {
        match self.0.checked_sub(rhs.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Checked multiplication by an integer count.
    #[inline]
    #[must_use]
    pub const fn checked_mul_int(self, rhs: u64) -> Option<Self> {
        match self.0.checked_mul(rhs) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Saturating addition.
    #[inline]
    #[must_use]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Saturating subtraction.
    #[inline]
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Returns true if this amount is zero.
    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Safe addition with error on overflow.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ArithmeticOverflow` if the addition would overflow.
    #[inline]
    pub fn safe_add(self, rhs: Self) -> EconomyResult<Self> {
        self.checked_add(rhs).ok_or(EconomyError::ArithmeticOverflow)
    }

    /// Safe subtraction with error on underflow.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ArithmeticOverflow` if the subtraction would underflow.
    #[inline]
    pub fn safe_sub(self, rhs: Self) -> EconomyResult<Self> {
        self.checked_sub(rhs).ok_or(EconomyError::ArithmeticOverflow)
    }

    /// Safe multiplication by an integer count (e.g. refund-per-card * count).
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ArithmeticOverflow` if the product would overflow.
    #[inline]
    pub fn safe_mul_int(self, rhs: u64) -> EconomyResult<Self> {
        self.checked_mul_int(rhs)
            .ok_or(EconomyError::ArithmeticOverflow)
    }
}

/// Wrapping addition for display math and test fixtures.
///
/// Ledger paths must use [`Credits::safe_add`] or [`Credits::checked_add`];
/// the operator does not guard against overflow.
impl Add for Credits {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.wrapping_add(rhs.0))
    }
}

impl AddAssign for Credits {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.wrapping_add(rhs.0);
    }
}

/// Wrapping subtraction; balance movements go through [`Credits::safe_sub`]
/// or [`Credits::checked_sub`] instead.
impl Sub for Credits {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0.wrapping_sub(rhs.0))
    }
}

impl SubAssign for Credits {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.0 = self.0.wrapping_sub(rhs.0);
    }
}

impl fmt::Debug for Credits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credits({}.{:02})", self.whole(), self.cents())
    }
}

impl fmt::Display for Credits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.whole(), self.cents())
    }
}

impl FromStr for Credits {
    type Err = EconomyError;

    /// Parses `"8"`, `"8.5"`, or `"8.50"` style amounts.
    ///
    /// At most two fraction digits are accepted; this parser refuses to
    /// guess about sub-cent precision.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || EconomyError::InvalidConfig(format!("invalid credit amount '{s}'"));

        let (whole_str, frac_str) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };

        if whole_str.is_empty() || frac_str.len() > DECIMAL_PLACES as usize {
            return Err(bad());
        }

        let whole: u64 = whole_str.parse().map_err(|_| bad())?;
        let cents: u64 = if frac_str.is_empty() {
            0
        } else {
            // "5" means 50 cents, "05" means 5 cents.
            let parsed: u64 = frac_str.parse().map_err(|_| bad())?;
            parsed * 10u64.pow(DECIMAL_PLACES - frac_str.len() as u32)
        };

        let minor = whole
            .checked_mul(MULTIPLIER)
            .and_then(|m| m.checked_add(cents))
            .ok_or(EconomyError::ArithmeticOverflow)?;

        Ok(Self(minor))
    }
}

impl Serialize for Credits {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Credits {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(|e: EconomyError| D::Error::custom(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_whole() {
        let value = Credits::from_whole(100);
        assert_eq!(value.whole(), 100);
        assert_eq!(value.cents(), 0);
    }

    #[test]
    fn test_from_parts() {
        let value = Credits::from_parts(3, 14);
        assert_eq!(value.whole(), 3);
        assert_eq!(value.cents(), 14);
    }

    #[test]
    fn test_addition() {
        let a = Credits::from_parts(1, 50); // 1.50
        let b = Credits::from_parts(2, 30); // 2.30
        let result = a + b;
        assert_eq!(result.whole(), 3);
        assert_eq!(result.cents(), 80);
    }

    #[test]
    fn test_subtraction() {
        let a = Credits::from_parts(5, 0);
        let b = Credits::from_parts(2, 50);
        let result = a - b;
        assert_eq!(result.whole(), 2);
        assert_eq!(result.cents(), 50);
    }

    #[test]
    fn test_no_drift() {
        // The classic float failure: 0.10 + 0.20 must equal 0.30 exactly.
        let a: Credits = "0.10".parse().unwrap();
        let b: Credits = "0.20".parse().unwrap();
        assert_eq!(a + b, "0.30".parse().unwrap());
    }

    #[test]
    fn test_checked_add_overflow() {
        let max = Credits::MAX;
        assert!(max.checked_add(Credits::ONE).is_none());
    }

    #[test]
    fn test_checked_sub_underflow() {
        let zero = Credits::ZERO;
        assert!(zero.checked_sub(Credits::ONE).is_none());
    }

    #[test]
    fn test_display() {
        let value = Credits::from_parts(42, 7);
        assert_eq!(format!("{value}"), "42.07");
    }

    #[test]
    fn test_parse_whole() {
        assert_eq!("8".parse::<Credits>().unwrap(), Credits::from_whole(8));
    }

    #[test]
    fn test_parse_one_fraction_digit() {
        assert_eq!(
            "8.5".parse::<Credits>().unwrap(),
            Credits::from_parts(8, 50)
        );
    }

    #[test]
    fn test_parse_two_fraction_digits() {
        assert_eq!(
            "0.05".parse::<Credits>().unwrap(),
            Credits::from_parts(0, 5)
        );
    }

    #[test]
    fn test_parse_rejects_sub_cent() {
        assert!("0.005".parse::<Credits>().is_err());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Credits>().is_err());
        assert!(".50".parse::<Credits>().is_err());
        assert!("-1.00".parse::<Credits>().is_err());
        assert!("1.0.0".parse::<Credits>().is_err());
    }

    #[test]
    fn test_safe_mul_int() {
        let penny = Credits::from_parts(0, 1);
        assert_eq!(penny.safe_mul_int(7).unwrap(), Credits::from_parts(0, 7));
        assert_eq!(
            Credits::MAX.safe_mul_int(2),
            Err(EconomyError::ArithmeticOverflow)
        );
    }
}
