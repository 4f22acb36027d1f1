//! Money representation using decimal arithmetic.
//!
//! Prices are carried as [`rust_decimal::Decimal`] in the currency's major
//! unit (dirhams, dollars) and converted to minor units (fils, cents) only
//! at the payment-provider boundary.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// A monetary amount with its currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's major unit (e.g., 129.50 AED).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// A zero price in the given currency.
    #[must_use]
    pub fn zero(currency: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// Build a price from an amount in minor units (fils/cents).
    #[must_use]
    pub fn from_minor_units(minor: i64, currency: CurrencyCode) -> Self {
        Self::new(Decimal::new(minor, 2), currency)
    }

    /// Amount in minor units, rounded half-up to the nearest unit.
    ///
    /// This is the representation payment providers expect.
    #[must_use]
    pub fn to_minor_units(&self) -> i64 {
        (self.amount * Decimal::ONE_HUNDRED)
            .round()
            .to_i64()
            .unwrap_or(i64::MAX)
    }

    /// Format for display, e.g. `AED 129.50`.
    #[must_use]
    pub fn display(&self) -> String {
        format!("{} {:.2}", self.currency.code(), self.amount)
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// ISO 4217 currency codes accepted by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrencyCode {
    /// UAE dirham - the store's home market.
    #[default]
    Aed,
    Usd,
    Eur,
    Gbp,
}

impl CurrencyCode {
    /// The ISO 4217 code as an uppercase string.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Aed => "AED",
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
        }
    }

    /// Parse from an ISO code, case-insensitive.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "AED" => Some(Self::Aed),
            "USD" => Some(Self::Usd),
            "EUR" => Some(Self::Eur),
            "GBP" => Some(Self::Gbp),
            _ => None,
        }
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn minor_units_round_trip() {
        let price = Price::from_minor_units(12950, CurrencyCode::Aed);
        assert_eq!(price.amount, Decimal::from_str("129.50").unwrap());
        assert_eq!(price.to_minor_units(), 12950);
    }

    #[test]
    fn minor_units_round_half_up() {
        let price = Price::new(Decimal::from_str("10.005").unwrap(), CurrencyCode::Aed);
        assert_eq!(price.to_minor_units(), 1001);
    }

    #[test]
    fn display_format() {
        let price = Price::from_minor_units(16500, CurrencyCode::Aed);
        assert_eq!(price.display(), "AED 165.00");
    }

    #[test]
    fn currency_parse_is_case_insensitive() {
        assert_eq!(CurrencyCode::parse("aed"), Some(CurrencyCode::Aed));
        assert_eq!(CurrencyCode::parse("USD"), Some(CurrencyCode::Usd));
        assert_eq!(CurrencyCode::parse("JPY"), None);
    }
}
