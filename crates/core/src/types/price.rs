//! Quote price using decimal arithmetic.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Reasons a price is rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Quotes cannot carry a negative amount.
    #[error("price cannot be negative")]
    Negative,
}

/// A non-negative amount quoted for labor, in the store's single currency.
///
/// Serialized as a decimal string (`"150.00"`) so no precision is lost on
/// the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Create a price, rejecting negative amounts.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] for amounts below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        Ok(Self(amount))
    }

    /// Build a price from whole cents.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] for negative input.
    pub fn from_cents(cents: i64) -> Result<Self, PriceError> {
        Self::new(Decimal::new(cents, 2))
    }

    /// The underlying amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_price_rejected() {
        assert_eq!(Price::from_cents(-1), Err(PriceError::Negative));
        assert!(Price::from_cents(0).is_ok());
    }

    #[test]
    fn test_display_uses_two_decimals() {
        assert_eq!(Price::from_cents(15000).unwrap().to_string(), "150.00");
        assert_eq!(Price::new(Decimal::new(5, 1)).unwrap().to_string(), "0.50");
    }

    #[test]
    fn test_deserialize_rejects_negative() {
        let ok: Price = serde_json::from_str("\"150.00\"").unwrap();
        assert_eq!(ok, Price::from_cents(15000).unwrap());
        assert!(serde_json::from_str::<Price>("\"-3.00\"").is_err());
    }
}
