use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Signed fixed-point amount. Comparisons are exact on the decimal value;
/// `100` and `100.00` are equal, nothing else is approximated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    pub fn from_decimal(decimal: Decimal) -> Self {
        Money(decimal)
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }

    pub fn abs(self) -> Self {
        Money(self.0.abs())
    }

    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }
}

impl From<Decimal> for Money {
    fn from(decimal: Decimal) -> Self {
        Money(decimal)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    /// Accepts bank-export style input: `-$1,234.56`, `$12`, `150.00`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned: String = s
            .trim()
            .chars()
            .filter(|c| *c != '$' && *c != ',')
            .collect();
        Decimal::from_str(&cleaned).map(Money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            write!(f, "-${:.2}", self.0.abs())
        } else {
            write!(f, "${:.2}", self.0)
        }
    }
}
