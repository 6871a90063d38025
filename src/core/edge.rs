use serde::{Deserialize, Serialize};

use crate::core::country::CountryCode;

/// A directed edge in the country graph (§3).
///
/// Always created and mutated in bidirectional pairs by
/// [`crate::graph::country_graph::CountryGraph::add_edge`]: adding
/// `(a, b)` also ensures `(b, a)` exists with the same `base_cost` and
/// `active` flag. The graph never special-cases reverse lookups (§9
/// Design Notes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryEdge {
    pub source: CountryCode,
    pub target: CountryCode,
    pub base_cost: f64,
    pub active: bool,
}

impl CountryEdge {
    /// # Panics
    ///
    /// Panics if `source == target` or `base_cost < 0` (§3 invariant).
    pub fn new(source: CountryCode, target: CountryCode, base_cost: f64, active: bool) -> Self {
        assert_ne!(source, target, "edge source and target must differ");
        assert!(base_cost >= 0.0, "base_cost must be non-negative");
        Self {
            source,
            target,
            base_cost,
            active,
        }
    }
}
