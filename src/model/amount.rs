//! Amount type for handling monetary values found on bank statements.
//!
//! This module provides the `Amount` type which wraps `Decimal` and handles parsing values that
//! may include a dollar sign, thousands separators, or accounting-style parentheses for negative
//! numbers.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// The number of fractional digits an `Amount` is always written with.
const SCALE: u32 = 2;

/// Represents a dollar amount.
///
/// Parsing accepts `123.45`, `1,234.56`, `-123.45`, `$123.45`, `-$1,234.56` and `(123.45)`,
/// the last of which is negative. After the dollar sign and commas are removed, what remains
/// must be an optionally negative integer with an optional two-digit fraction.
///
/// An `Amount` is always written with exactly two fractional digits and without a dollar sign or
/// commas, which is the normalized form used in activity files.
///
/// # Examples
///
/// ```
/// # use stmtcat::model::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("(1,234.5)");
/// assert!(amount.is_err());
///
/// let amount = Amount::from_str("(1,234.50)").unwrap();
/// assert_eq!(amount.to_string(), "-1234.50");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount {
    /// The parsed numerical value, always carried with a scale of two.
    value: Decimal,
}

impl Amount {
    /// Creates a new Amount from a Decimal value, rounding to cents.
    pub fn new(value: Decimal) -> Self {
        let mut value = value.round_dp(SCALE);
        if value.is_zero() {
            value = Decimal::ZERO;
        }
        value.rescale(SCALE);
        Self { value }
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.value
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.value().is_zero()
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.value().is_sign_negative()
    }
}

/// An error that can occur when parsing strings into `Amount` values.
#[derive(Clone, Eq, PartialEq)]
pub struct AmountError(String);

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a money value", self.0)
    }
}

impl std::error::Error for AmountError {}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || AmountError(s.to_string());
        let mut text = s.trim();
        if text.is_empty() {
            return Err(err());
        }

        // Accounting style negatives: (123.45)
        let mut negative = false;
        if let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
            negative = true;
            text = inner.trim();
        }

        // Remove the dollar sign, which may follow a minus sign: "-$50.00"
        let without_dollar = if let Some(after_minus) = text.strip_prefix('-') {
            match after_minus.strip_prefix('$') {
                Some(after_dollar) => format!("-{}", after_dollar.trim_start()),
                None => text.to_string(),
            }
        } else if let Some(after_dollar) = text.strip_prefix('$') {
            after_dollar.trim_start().to_string()
        } else {
            text.to_string()
        };

        // Remove commas (thousand separators)
        let without_commas = without_dollar.replace(',', "");
        if !is_plain_number(&without_commas) {
            return Err(err());
        }

        let value = Decimal::from_str(&without_commas).map_err(|_| err())?;
        Ok(Amount::new(if negative { -value } else { value }))
    }
}

/// Matches `-?\d+(\.\d{2})?`.
fn is_plain_number(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (digits, None),
    };
    let whole_ok = !whole.is_empty() && whole.chars().all(|c| c.is_ascii_digit());
    let fraction_ok = match fraction {
        Some(f) => f.len() == 2 && f.chars().all(|c| c.is_ascii_digit()),
        None => true,
    };
    whole_ok && fraction_ok
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Amount::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}
