use std::collections::HashMap;

use crate::core::country::CountryCode;

/// Read-only FX rate input keyed by destination country code (§6).
///
/// Absence of a rate for a code defaults to `1.0`. FX discovery itself is
/// out of scope (§1 Non-goals); this is purely a caller-supplied lookup
/// table consulted once per hop during payment processing (§4.4).
#[derive(Debug, Clone, Default)]
pub struct FxRateMap(HashMap<CountryCode, f64>);

impl FxRateMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rates(rates: impl IntoIterator<Item = (CountryCode, f64)>) -> Self {
        Self(rates.into_iter().collect())
    }

    /// Rate for `code`, defaulting to `1.0` when absent.
    pub fn rate_for(&self, code: &CountryCode) -> f64 {
        self.0.get(code).copied().unwrap_or(1.0)
    }
}
