use parking_lot::RwLock;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

use crate::core::blocked::BlockedSet;
use crate::core::country::{CountryCode, CountryNode};
use crate::core::edge::CountryEdge;
use crate::graph::weight::edge_weight;

/// In-memory directed graph of country nodes and bidirectional trade
/// edges, with liveness flags and a blocked-code set (C1, §4.1).
///
/// Backed by [`petgraph::graph::DiGraph`] the way the pack's own
/// persistent-graph implementations wrap it: a lookup table from stable
/// external key ([`CountryCode`]) to the internal [`NodeIndex`], guarded
/// by a single reader/writer lock so read-heavy operations (`neighbors`,
/// `weight`) only ever take a shared lock and return owned copies.
///
/// All public methods are silent no-ops on unknown codes, per §4.1
/// failure semantics — the graph never panics on a bad key from a
/// caller.
pub struct CountryGraph {
    inner: RwLock<Inner>,
}

struct Inner {
    graph: DiGraph<CountryNode, CountryEdge>,
    index: HashMap<CountryCode, NodeIndex>,
    blocked: BlockedSet,
}

impl CountryGraph {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                graph: DiGraph::new(),
                index: HashMap::new(),
                blocked: BlockedSet::new(),
            }),
        }
    }

    /// Upsert a node by code (§4.1).
    pub fn add_node(&self, node: CountryNode) {
        let mut inner = self.inner.write();
        if let Some(&idx) = inner.index.get(&node.code) {
            inner.graph[idx] = node;
        } else {
            let code = node.code.clone();
            let idx = inner.graph.add_node(node);
            inner.index.insert(code, idx);
        }
    }

    /// Create edge `(source, target)` and ensure the reverse edge exists
    /// with identical properties. Idempotent: repeated calls update the
    /// existing edge(s) in place rather than duplicating them. Silent
    /// no-op if either code is unknown (§4.1).
    pub fn add_edge(&self, source: &CountryCode, target: &CountryCode, base_cost: f64, active: bool) {
        let mut inner = self.inner.write();
        let (Some(&s_idx), Some(&t_idx)) = (inner.index.get(source), inner.index.get(target))
        else {
            return;
        };
        upsert_directed_edge(&mut inner.graph, s_idx, t_idx, source, target, base_cost, active);
        upsert_directed_edge(&mut inner.graph, t_idx, s_idx, target, source, base_cost, active);
    }

    /// Replace the blocked set atomically (§4.1).
    pub fn set_blocked(&self, codes: impl IntoIterator<Item = CountryCode>) {
        self.inner.write().blocked = BlockedSet::from_codes(codes);
    }

    pub fn is_blocked(&self, code: &CountryCode) -> bool {
        self.inner.read().blocked.contains(code)
    }

    /// Flip liveness; never removes the node. Silent no-op if unknown.
    pub fn set_node_active(&self, code: &CountryCode, active: bool) {
        let mut inner = self.inner.write();
        if let Some(&idx) = inner.index.get(code) {
            inner.graph[idx].active = active;
        }
    }

    /// Set credibility, clamped to `[0.5, 1.0]` (supplements §4.1's
    /// contract list with the mutator §3 implies exists).
    pub fn set_node_credibility(&self, code: &CountryCode, value: f64) {
        let mut inner = self.inner.write();
        if let Some(&idx) = inner.index.get(code) {
            inner.graph[idx].set_credibility(value);
        }
    }

    /// Set the FX rate for a node (supplements §4.1, see §3).
    pub fn set_node_fx_rate(&self, code: &CountryCode, fx_rate: f64) {
        let mut inner = self.inner.write();
        if let Some(&idx) = inner.index.get(code) {
            if fx_rate > 0.0 {
                inner.graph[idx].fx_rate = fx_rate;
            }
        }
    }

    /// Remove a node along with all incident edges (§3 lifecycle:
    /// "removed only with all incident edges").
    pub fn remove_node(&self, code: &CountryCode) {
        let mut inner = self.inner.write();
        let Some(idx) = inner.index.remove(code) else {
            return;
        };
        // petgraph's `remove_node` swaps the last node into the removed
        // slot, which changes that node's `NodeIndex`; fix up the index
        // map so the lookup table stays consistent.
        let last_idx = NodeIndex::new(inner.graph.node_count() - 1);
        let last_code = if last_idx != idx {
            Some(inner.graph[last_idx].code.clone())
        } else {
            None
        };
        inner.graph.remove_node(idx);
        if let Some(last_code) = last_code {
            inner.index.insert(last_code, idx);
        }
    }

    pub fn node(&self, code: &CountryCode) -> Option<CountryNode> {
        let inner = self.inner.read();
        inner.index.get(code).map(|&idx| inner.graph[idx].clone())
    }

    pub fn contains_node(&self, code: &CountryCode) -> bool {
        self.inner.read().index.contains_key(code)
    }

    /// Outgoing edges from `code` as `(target_code, edge)` (§4.1).
    /// Empty for an unknown code.
    pub fn neighbors(&self, code: &CountryCode) -> Vec<(CountryCode, CountryEdge)> {
        let inner = self.inner.read();
        let Some(&idx) = inner.index.get(code) else {
            return Vec::new();
        };
        inner
            .graph
            .edges(idx)
            .map(|e| {
                let edge = e.weight().clone();
                (edge.target.clone(), edge)
            })
            .collect()
    }

    /// Edge weight per §4.2, resolved against the current target node.
    pub fn weight(&self, edge: &CountryEdge) -> f64 {
        let inner = self.inner.read();
        let target = inner
            .index
            .get(&edge.target)
            .map(|&idx| &inner.graph[idx]);
        edge_weight(edge.base_cost, target)
    }

    pub fn node_count(&self) -> usize {
        self.inner.read().graph.node_count()
    }
}

impl Default for CountryGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::too_many_arguments)]
fn upsert_directed_edge(
    graph: &mut DiGraph<CountryNode, CountryEdge>,
    from: NodeIndex,
    to: NodeIndex,
    from_code: &CountryCode,
    to_code: &CountryCode,
    base_cost: f64,
    active: bool,
) {
    if let Some(existing) = graph.find_edge(from, to) {
        let edge = &mut graph[existing];
        edge.base_cost = base_cost;
        edge.active = active;
    } else {
        graph.add_edge(
            from,
            to,
            CountryEdge::new(from_code.clone(), to_code.clone(), base_cost, active),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::CurrencyCode;

    fn node(code: &str) -> CountryNode {
        CountryNode::new(CountryCode::new(code), CurrencyCode::new("USD"), 1.0)
    }

    #[test]
    fn add_edge_creates_bidirectional_pair() {
        let graph = CountryGraph::new();
        graph.add_node(node("USA"));
        graph.add_node(node("GBR"));
        graph.add_edge(&CountryCode::new("USA"), &CountryCode::new("GBR"), 0.1, true);

        let forward = graph.neighbors(&CountryCode::new("USA"));
        let backward = graph.neighbors(&CountryCode::new("GBR"));
        assert_eq!(forward.len(), 1);
        assert_eq!(backward.len(), 1);
        assert_eq!(forward[0].1.base_cost, backward[0].1.base_cost);
    }

    #[test]
    fn add_edge_is_idempotent() {
        let graph = CountryGraph::new();
        graph.add_node(node("USA"));
        graph.add_node(node("GBR"));
        graph.add_edge(&CountryCode::new("USA"), &CountryCode::new("GBR"), 0.1, true);
        graph.add_edge(&CountryCode::new("USA"), &CountryCode::new("GBR"), 0.1, true);

        assert_eq!(graph.neighbors(&CountryCode::new("USA")).len(), 1);
    }

    #[test]
    fn unknown_code_operations_are_silent_no_ops() {
        let graph = CountryGraph::new();
        graph.set_node_active(&CountryCode::new("ZZZ"), false);
        graph.add_edge(&CountryCode::new("ZZZ"), &CountryCode::new("YYY"), 1.0, true);
        assert!(graph.neighbors(&CountryCode::new("ZZZ")).is_empty());
    }

    #[test]
    fn set_blocked_replaces_rather_than_unions() {
        let graph = CountryGraph::new();
        graph.set_blocked([CountryCode::new("USA")]);
        graph.set_blocked([CountryCode::new("GBR")]);
        assert!(!graph.is_blocked(&CountryCode::new("USA")));
        assert!(graph.is_blocked(&CountryCode::new("GBR")));
    }

    #[test]
    fn remove_node_drops_incident_edges() {
        let graph = CountryGraph::new();
        graph.add_node(node("USA"));
        graph.add_node(node("GBR"));
        graph.add_node(node("DEU"));
        graph.add_edge(&CountryCode::new("USA"), &CountryCode::new("GBR"), 0.1, true);
        graph.add_edge(&CountryCode::new("GBR"), &CountryCode::new("DEU"), 0.1, true);

        graph.remove_node(&CountryCode::new("GBR"));

        assert!(!graph.contains_node(&CountryCode::new("GBR")));
        assert!(graph.neighbors(&CountryCode::new("USA")).is_empty());
        assert!(graph.contains_node(&CountryCode::new("USA")));
        assert!(graph.contains_node(&CountryCode::new("DEU")));
    }

    #[test]
    fn weight_falls_back_to_base_cost_for_missing_target() {
        let graph = CountryGraph::new();
        let edge = CountryEdge::new(CountryCode::new("USA"), CountryCode::new("ZZZ"), 0.05, true);
        assert_eq!(graph.weight(&edge), 0.05);
    }
}
