//! Exact decimal type for money, points and rates.
//!
//! Values are parsed from strings losslessly and rendered without exponent
//! notation. Nothing in the ledger or the auction engine touches floats.

use rust_decimal::prelude::RoundingStrategy;
use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Lossless decimal used for every monetary and point amount.
///
/// Serializes to a JSON string (`"1100.5"`). Deserializes from a string or
/// a JSON integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct Decimal(RustDecimal);

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical_string())
    }
}

impl Decimal {
    pub const fn new(value: RustDecimal) -> Self {
        Decimal(value)
    }

    /// Parse a Decimal from a string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s.trim()).map(Decimal)
    }

    /// Format without trailing zeros or exponent notation.
    pub fn to_canonical_string(&self) -> String {
        format!("{}", self.0.normalize())
    }

    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    pub fn one() -> Self {
        Decimal(RustDecimal::ONE)
    }

    pub fn hundred() -> Self {
        Decimal(RustDecimal::ONE_HUNDRED)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the value is > 0.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    /// Returns true if the value is < 0.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    /// Round to `scale` fractional digits using banker's rounding.
    ///
    /// Used to bring derived amounts (commission = sale * rate) onto the
    /// smallest currency unit before they touch a balance.
    pub fn round_to_scale(&self, scale: u32) -> Self {
        Decimal(
            self.0
                .round_dp_with_strategy(scale, RoundingStrategy::MidpointNearestEven),
        )
    }

    /// True when the value has no significant digits beyond `scale`.
    /// `110.000` fits scale 2, `110.001` does not.
    pub fn fits_scale(&self, scale: u32) -> bool {
        self.0.normalize().scale() <= scale
    }

    /// Addition that reports overflow instead of panicking.
    pub fn checked_add(self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_add(rhs.0).map(Decimal)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<RustDecimal> for Decimal {
    fn from(value: RustDecimal) -> Self {
        Decimal(value)
    }
}

impl From<Decimal> for RustDecimal {
    fn from(value: Decimal) -> Self {
        value.0
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Decimal(RustDecimal::from(value))
    }
}

impl std::ops::Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Decimal {
    fn add_assign(&mut self, rhs: Decimal) {
        self.0 += rhs.0;
    }
}

impl std::ops::Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 - rhs.0)
    }
}

impl std::ops::SubAssign for Decimal {
    fn sub_assign(&mut self, rhs: Decimal) {
        self.0 -= rhs.0;
    }
}

impl std::ops::Mul for Decimal {
    type Output = Decimal;

    fn mul(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 * rhs.0)
    }
}

impl std::ops::Div for Decimal {
    type Output = Decimal;

    fn div(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 / rhs.0)
    }
}

impl std::iter::Sum for Decimal {
    fn sum<I: Iterator<Item = Decimal>>(iter: I) -> Self {
        iter.fold(Decimal::zero(), |acc, d| acc + d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_canonical_string_strips_trailing_zeros() {
        let d = Decimal::from_str_canonical("1100.500").unwrap();
        assert_eq!(d.to_canonical_string(), "1100.5");
        assert_eq!(Decimal::from(1000).to_canonical_string(), "1000");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Decimal::from_str_canonical("12a").is_err());
        assert!(Decimal::from_str_canonical("").is_err());
    }

    #[test]
    fn test_repeated_increments_do_not_drift() {
        let mut price = Decimal::from_str("0").unwrap();
        let step = Decimal::new(dec!(0.1));
        for _ in 0..1000 {
            price += step;
        }
        assert_eq!(price, Decimal::from(100));
    }

    #[test]
    fn test_round_to_scale_uses_bankers_rounding() {
        assert_eq!(
            Decimal::new(dec!(10.125)).round_to_scale(2),
            Decimal::new(dec!(10.12))
        );
        assert_eq!(
            Decimal::new(dec!(10.135)).round_to_scale(2),
            Decimal::new(dec!(10.14))
        );
        assert_eq!(Decimal::new(dec!(7.5)).round_to_scale(0), Decimal::from(8));
    }

    #[test]
    fn test_clamp() {
        let lo = Decimal::zero();
        let hi = Decimal::hundred();
        assert_eq!(Decimal::from(-5).clamp(lo, hi), lo);
        assert_eq!(Decimal::from(150).clamp(lo, hi), hi);
        assert_eq!(Decimal::from(42).clamp(lo, hi), Decimal::from(42));
    }

    #[test]
    fn test_json_is_string_and_accepts_integers() {
        let d = Decimal::new(dec!(123.450));
        let json = serde_json::to_value(d).unwrap();
        assert_eq!(json, serde_json::json!("123.45"));

        let from_int: Decimal = serde_json::from_str("1100").unwrap();
        assert_eq!(from_int, Decimal::from(1100));
        let from_str: Decimal = serde_json::from_str("\"1100.25\"").unwrap();
        assert_eq!(from_str, Decimal::new(dec!(1100.25)));
    }

    #[test]
    fn test_fits_scale_ignores_trailing_zeros() {
        assert!(Decimal::new(dec!(110.000)).fits_scale(2));
        assert!(Decimal::new(dec!(110.01)).fits_scale(2));
        assert!(!Decimal::new(dec!(110.001)).fits_scale(2));
        assert!(Decimal::from(5).fits_scale(0));
        assert!(!Decimal::new(dec!(0.5)).fits_scale(0));
    }

    #[test]
    fn test_checked_add_reports_overflow() {
        let max = Decimal::new(RustDecimal::MAX);
        assert_eq!(max.checked_add(Decimal::from(10)), None);
        assert_eq!(
            Decimal::from(100).checked_add(Decimal::from(10)),
            Some(Decimal::from(110))
        );
    }

    #[test]
    fn test_sign_helpers() {
        assert!(Decimal::from(1).is_positive());
        assert!(Decimal::from(-1).is_negative());
        assert!(!Decimal::zero().is_positive());
        assert!(!Decimal::zero().is_negative());
    }
}
