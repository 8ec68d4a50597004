//! Fixed-point currency amounts.
//!
//! Money is stored as an integer count of minor units (cents). There is no floating
//! point anywhere on the money path, so accumulators and balances never drift.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Number of minor units in one major unit.
pub const MINOR_PER_MAJOR: i64 = 100;

/// Non-negative money amount in minor units.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Amount(i64);

impl ValueObject for Amount {}

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Smallest representable non-zero amount (one cent).
    pub const MINOR_UNIT: Amount = Amount(1);

    pub fn from_minor(minor: i64) -> DomainResult<Self> {
        if minor < 0 {
            return Err(DomainError::invalid(format!("amount must not be negative: {minor}")));
        }
        Ok(Self(minor))
    }

    /// Whole major units (e.g. `from_units(50)` is `50.00`).
    pub const fn from_units(units: u32) -> Self {
        Self(units as i64 * MINOR_PER_MAJOR)
    }

    pub const fn minor_units(self) -> i64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// `None` when the result would be negative.
    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        let v = self.0.checked_sub(other.0)?;
        (v >= 0).then_some(Amount(v))
    }

    /// Reject zero amounts for operations that move money.
    pub fn ensure_positive(self, what: &str) -> DomainResult<Self> {
        if self.is_positive() {
            Ok(self)
        } else {
            Err(DomainError::invalid(format!("{what} must be positive")))
        }
    }
}

impl TryFrom<i64> for Amount {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Amount::from_minor(value)
    }
}

impl From<Amount> for i64 {
    fn from(value: Amount) -> Self {
        value.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / MINOR_PER_MAJOR, self.0 % MINOR_PER_MAJOR)
    }
}

impl FromStr for Amount {
    type Err = DomainError;

    /// Parses `"100"`, `"100.5"` and `"100.50"`. More than two fractional digits,
    /// signs and exponents are rejected rather than rounded.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || DomainError::invalid(format!("malformed amount: {s:?}"));
        let s = s.trim();
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() || frac.len() > 2 {
            return Err(bad());
        }
        if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }

        let whole: i64 = whole.parse().map_err(|_| bad())?;
        let frac: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| bad())? * 10,
            _ => frac.parse().map_err(|_| bad())?,
        };

        whole
            .checked_mul(MINOR_PER_MAJOR)
            .and_then(|v| v.checked_add(frac))
            .map(Amount)
            .ok_or_else(bad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_decimal_strings() {
        assert_eq!("100.50".parse::<Amount>().unwrap().minor_units(), 10_050);
        assert_eq!("100.5".parse::<Amount>().unwrap().minor_units(), 10_050);
        assert_eq!("7".parse::<Amount>().unwrap(), Amount::from_units(7));
        assert_eq!("0.01".parse::<Amount>().unwrap(), Amount::MINOR_UNIT);
    }

    #[test]
    fn rejects_negative_and_over_precise_input() {
        assert!("-1.00".parse::<Amount>().is_err());
        assert!("1.001".parse::<Amount>().is_err());
        assert!(".50".parse::<Amount>().is_err());
        assert!("1e3".parse::<Amount>().is_err());
        assert!(Amount::from_minor(-5).is_err());
    }

    #[test]
    fn displays_two_decimals() {
        assert_eq!(Amount::from_minor(5).unwrap().to_string(), "0.05");
        assert_eq!(Amount::from_units(5000).to_string(), "5000.00");
    }

    #[test]
    fn subtraction_never_goes_negative() {
        let a = Amount::from_units(1);
        assert_eq!(a.checked_sub(Amount::from_units(2)), None);
        assert_eq!(a.checked_sub(a), Some(Amount::ZERO));
    }

    #[test]
    fn serde_uses_minor_units_and_validates() {
        let json = serde_json::to_string(&Amount::from_units(3)).unwrap();
        assert_eq!(json, "300");
        assert!(serde_json::from_str::<Amount>("-1").is_err());
    }

    proptest! {
        #[test]
        fn display_parses_back(minor in 0i64..10_000_000_000i64) {
            let a = Amount::from_minor(minor).unwrap();
            prop_assert_eq!(a.to_string().parse::<Amount>().unwrap(), a);
        }
    }
}
