//! Human-readable order numbers.

use serde::{Deserialize, Serialize};

/// Customer-facing order reference (formatted `ORD-XXXXXXXXXX`).
///
/// Distinct from [`super::id::OrderId`]: the number is what shoppers see in
/// confirmation screens and emails, the ID is what the database joins on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Generate a new order number from fresh UUID entropy.
    #[must_use]
    pub fn generate() -> Self {
        let hex = uuid::Uuid::new_v4().simple().to_string().to_uppercase();
        let short: String = hex.chars().take(10).collect();
        Self(format!("ORD-{short}"))
    }

    /// Wrap a stored order number.
    #[must_use]
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_shape() {
        let number = OrderNumber::generate();
        assert_eq!(number.as_str().len(), 14); // ORD- + 10 hex chars
        assert!(number.as_str().starts_with("ORD-"));
        assert!(
            number
                .as_str()
                .chars()
                .skip(4)
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase())
        );
    }

    #[test]
    fn generated_numbers_differ() {
        assert_ne!(OrderNumber::generate(), OrderNumber::generate());
    }
}
