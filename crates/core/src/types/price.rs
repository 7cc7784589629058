//! Type-safe price representation using decimal arithmetic.
//!
//! Bagisto reports totals such as `grand_total` either as JSON numbers or as
//! strings with four decimal places (`"1530.0000"`). Payment providers want a
//! two-decimal amount, so [`Price::from_json`] accepts both shapes and
//! rounds half-away-from-zero to the currency's minor unit.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The value is neither a number nor a numeric string.
    #[error("amount is not numeric: {0}")]
    NotNumeric(String),
    /// The amount is zero or negative.
    #[error("amount must be greater than zero")]
    NotPositive,
    /// Unsupported currency code.
    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),
}

/// A positive amount with its currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit, rounded to two decimals.
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price, rounding the amount to two decimals.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::NotPositive`] when the rounded amount is not
    /// greater than zero.
    pub fn new(amount: Decimal, currency_code: CurrencyCode) -> Result<Self, PriceError> {
        let amount = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        if amount <= Decimal::ZERO {
            return Err(PriceError::NotPositive);
        }
        Ok(Self {
            amount,
            currency_code,
        })
    }

    /// Build a price from a JSON value as reported by the upstream backend.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::NotNumeric`] for non-numeric values and
    /// [`PriceError::NotPositive`] for amounts that are not positive.
    pub fn from_json(
        value: &serde_json::Value,
        currency_code: CurrencyCode,
    ) -> Result<Self, PriceError> {
        let text = match value {
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::String(s) => s.trim().to_owned(),
            other => return Err(PriceError::NotNumeric(other.to_string())),
        };
        let amount = text
            .parse::<Decimal>()
            .or_else(|_| Decimal::from_scientific(&text))
            .map_err(|_| PriceError::NotNumeric(text.clone()))?;
        Self::new(amount, currency_code)
    }

    /// The amount formatted with exactly two decimals (e.g. `"1530.00"`).
    #[must_use]
    pub fn amount_string(&self) -> String {
        format!("{:.2}", self.amount)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.2}", self.currency_code.code(), self.amount)
    }
}

/// ISO 4217 currency codes accepted by the payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    KES,
    USD,
    EUR,
    GBP,
}

impl CurrencyCode {
    /// The ISO 4217 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::KES => "KES",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
        }
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "KES" => Ok(Self::KES),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            other => Err(PriceError::UnsupportedCurrency(other.to_owned())),
        }
    }
}
