use std::fmt;
use std::iter::Sum;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Signed amount in the currency's smallest unit (e.g. yen).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn new(value: i64) -> Self {
        Amount(value)
    }

    pub const fn value(self) -> i64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub const fn abs(self) -> Self {
        Amount(self.0.abs())
    }

    pub const fn checked_add(self, rhs: Self) -> Option<Self> {
        match self.0.checked_add(rhs.0) {
            Some(value) => Some(Amount(value)),
            None => None,
        }
    }

    pub const fn checked_sub(self, rhs: Self) -> Option<Self> {
        match self.0.checked_sub(rhs.0) {
            Some(value) => Some(Amount(value)),
            None => None,
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Amount {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Amount(self.0 - rhs.0)
    }
}

impl std::ops::Neg for Amount {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Amount(-self.0)
    }
}

impl std::ops::AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::ops::SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, |acc, amount| acc + amount)
    }
}

/// Returned when a non-positive value is turned into a [`PositiveAmount`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("amount must be positive, got {0}")]
pub struct NonPositiveAmount(pub i64);

/// An amount strictly greater than zero.
///
/// Payments and settlement transfers always carry one of these, so a zero or
/// negative transfer cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct PositiveAmount(i64);

impl PositiveAmount {
    pub fn new(value: i64) -> Result<Self, NonPositiveAmount> {
        if value > 0 {
            Ok(PositiveAmount(value))
        } else {
            Err(NonPositiveAmount(value))
        }
    }

    pub const fn get(self) -> i64 {
        self.0
    }

    pub const fn amount(self) -> Amount {
        Amount(self.0)
    }
}

impl TryFrom<i64> for PositiveAmount {
    type Error = NonPositiveAmount;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        PositiveAmount::new(value)
    }
}

impl TryFrom<Amount> for PositiveAmount {
    type Error = NonPositiveAmount;

    fn try_from(value: Amount) -> Result<Self, Self::Error> {
        PositiveAmount::new(value.0)
    }
}

impl From<PositiveAmount> for i64 {
    fn from(value: PositiveAmount) -> Self {
        value.0
    }
}

impl From<PositiveAmount> for Amount {
    fn from(value: PositiveAmount) -> Self {
        Amount(value.0)
    }
}

impl fmt::Display for PositiveAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_preserves_value() {
        assert_eq!(Amount::new(1234).value(), 1234);
    }

    #[test]
    fn default_is_zero() {
        assert_eq!(Amount::default(), Amount::ZERO);
        assert!(Amount::default().is_zero());
    }

    #[test]
    fn display_formats_signed_integers() {
        assert_eq!(Amount::new(100).to_string(), "100");
        assert_eq!(Amount::new(0).to_string(), "0");
        assert_eq!(Amount::new(-25).to_string(), "-25");
    }

    #[test]
    fn arithmetic() {
        let mut a = Amount::new(100);
        a += Amount::new(50);
        assert_eq!(a, Amount::new(150));
        a -= Amount::new(30);
        assert_eq!(a, Amount::new(120));
        assert_eq!(Amount::new(10) - Amount::new(25), Amount::new(-15));
        assert_eq!(-Amount::new(7), Amount::new(-7));
    }

    #[test]
    fn checked_arithmetic() {
        assert_eq!(Amount::new(1).checked_add(Amount::new(2)), Some(Amount::new(3)));
        assert_eq!(Amount::new(i64::MAX).checked_add(Amount::new(1)), None);
        assert_eq!(Amount::new(i64::MIN).checked_sub(Amount::new(1)), None);
    }

    #[test]
    fn sum_of_amounts() {
        let total: Amount = [1, 2, 3].into_iter().map(Amount::new).sum();
        assert_eq!(total, Amount::new(6));
    }

    #[test]
    fn sign_predicates() {
        assert!(Amount::new(1).is_positive());
        assert!(Amount::new(-1).is_negative());
        assert!(!Amount::ZERO.is_positive());
        assert!(!Amount::ZERO.is_negative());
        assert_eq!(Amount::new(-40).abs(), Amount::new(40));
    }

    #[test]
    fn positive_amount_rejects_zero_and_negative() {
        assert_eq!(PositiveAmount::new(0), Err(NonPositiveAmount(0)));
        assert_eq!(PositiveAmount::new(-5), Err(NonPositiveAmount(-5)));
        assert_eq!(PositiveAmount::new(5).map(PositiveAmount::get), Ok(5));
    }

    #[test]
    fn positive_amount_deserialization_is_validated() {
        let ok: PositiveAmount = serde_json::from_str("42").unwrap();
        assert_eq!(ok.get(), 42);
        assert!(serde_json::from_str::<PositiveAmount>("0").is_err());
        assert!(serde_json::from_str::<PositiveAmount>("-3").is_err());
    }
}
