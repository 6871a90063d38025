//! Engine-wide tunables.
//!
//! Mirrors the teacher's `NetworkConfig`/`FxShockConfig` pattern: a plain
//! struct with a spec-derived `Default` impl, constructed once by the
//! composition root and threaded into collaborators rather than read from
//! globals.

use crate::core::country::CountryCode;
use std::time::Duration;

/// Fee and routing parameters (§4.2, §4.3).
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Once-applied fee rate on the input amount.
    pub base_fee_rate: f64,
    /// Per-hop fee rate applied once per hop to the input amount.
    pub hop_fee_rate: f64,
    /// Per-halted-node fee rate.
    pub halt_fine_rate: f64,
    /// Default number of ranked paths the router returns.
    pub default_k: usize,
    /// Ordered hub list used to synthesize alternate routes (§4.4).
    pub hub_order: Vec<CountryCode>,
    /// Maximum number of attempts in the anti-fragile retry loop
    /// (original route plus alternates).
    pub max_attempts: usize,
    pub breaker: CircuitBreakerConfig,
    pub timeouts: TimeoutConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_fee_rate: 0.015,
            hop_fee_rate: 0.0002,
            halt_fine_rate: 0.001,
            default_k: 3,
            hub_order: default_hub_order(),
            max_attempts: 3,
            breaker: CircuitBreakerConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

/// Default hub list for alternate-route generation (§6).
pub fn default_hub_order() -> Vec<CountryCode> {
    ["USA", "GBR", "HKG", "SGP", "ARE", "CHE", "DEU", "JPN"]
        .into_iter()
        .map(CountryCode::new)
        .collect()
}

/// Distributed circuit breaker parameters (§4.6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: usize,
    pub success_threshold: usize,
    pub timeout: Duration,
    pub failure_window: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 3,
            timeout: Duration::from_secs(30),
            failure_window: Duration::from_secs(60),
        }
    }
}

/// Deadlines for externally-initiated operations (§5).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeoutConfig {
    pub route_query: Duration,
    pub create_payment: Duration,
    pub confirm_payment: Duration,
    pub circuit_breaker_op: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            route_query: Duration::from_secs(5),
            create_payment: Duration::from_secs(5),
            confirm_payment: Duration::from_secs(30),
            circuit_breaker_op: Duration::from_secs(5),
        }
    }
}
