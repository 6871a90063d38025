use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::currency::CurrencyCode;

/// Stable 3-letter country identifier, the primary key of [`CountryNode`].
///
/// # Examples
///
/// ```
/// use corridor_mesh::core::country::CountryCode;
///
/// let usa = CountryCode::new("USA");
/// let gbr = CountryCode::new("GBR");
/// assert_ne!(usa, gbr);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CountryCode(String);

impl CountryCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CountryCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A node in the country graph (§3).
///
/// `credibility` and `success_rate` feed the edge weight function
/// (§4.2); `fx_rate` and `currency` are carried for external callers but
/// are not consulted by the router itself. Mutated in place by admin
/// operations on [`crate::graph::country_graph::CountryGraph`]; never
/// removed except together with all incident edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryNode {
    pub code: CountryCode,
    pub currency: CurrencyCode,
    credibility: f64,
    pub success_rate: f64,
    pub fx_rate: f64,
    pub active: bool,
}

/// Credibility is clamped to this range on construction and on every
/// update (§3, §4.4 credibility hook).
pub const CREDIBILITY_MIN: f64 = 0.5;
pub const CREDIBILITY_MAX: f64 = 1.0;

impl CountryNode {
    pub fn new(code: CountryCode, currency: CurrencyCode, fx_rate: f64) -> Self {
        Self {
            code,
            currency,
            credibility: CREDIBILITY_MAX,
            success_rate: 1.0,
            fx_rate: fx_rate.max(f64::MIN_POSITIVE),
            active: true,
        }
    }

    pub fn credibility(&self) -> f64 {
        self.credibility
    }

    /// Set credibility, clamped to `[0.5, 1.0]` (§3 invariant).
    pub fn set_credibility(&mut self, value: f64) {
        self.credibility = value.clamp(CREDIBILITY_MIN, CREDIBILITY_MAX);
    }

    /// Adjust credibility by a delta, clamped (§4.4 credibility hook).
    pub fn adjust_credibility(&mut self, delta: f64) {
        self.set_credibility(self.credibility + delta);
    }
}
