use serde::{Deserialize, Serialize};
use std::fmt;

/// ISO 4217-style currency code attached to a country or a transaction.
///
/// # Examples
///
/// ```
/// use corridor_mesh::core::currency::CurrencyCode;
///
/// let usd = CurrencyCode::new("USD");
/// let gbp = CurrencyCode::new("GBP");
/// assert_ne!(usd, gbp);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
