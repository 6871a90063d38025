use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::cancel::CancellationToken;
use crate::core::country::CountryCode;
use crate::core::edge::CountryEdge;
use crate::economics::preview::path_economics;
use crate::error::RoutingError;
use crate::graph::country_graph::CountryGraph;

/// A ranked path through the country graph (§3, §4.2).
///
/// Nodes are pairwise distinct and every consecutive pair corresponds to
/// an active, non-blocked edge at the time the path was computed.
/// `total_fee_fraction` and `final_fraction` come from the path-level
/// decay model (§4.3) rather than the transaction-level quotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub nodes: Vec<CountryCode>,
    pub total_weight: f64,
    pub total_fee_fraction: f64,
    pub final_fraction: f64,
}

impl Path {
    pub fn hop_count(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    fn with_weight(nodes: Vec<CountryCode>, total_weight: f64, hop_fee_rate: f64) -> Self {
        let hop_count = nodes.len().saturating_sub(1);
        let economics = path_economics(hop_fee_rate, hop_count);
        Self {
            nodes,
            total_weight,
            total_fee_fraction: economics.total_fee_fraction,
            final_fraction: economics.final_fraction,
        }
    }
}

/// Result of a K-shortest-paths query that may have been cancelled
/// partway through (§4.2).
#[derive(Debug, Clone, PartialEq)]
pub struct KPathsOutcome {
    /// Ranked paths found so far. Non-decreasing by `total_weight`.
    pub paths: Vec<Path>,
    /// `true` if the operation was cancelled before `K` paths were found.
    pub cancelled: bool,
}

/// A min-heap entry ordered by `priority`, with a monotonically
/// increasing `seq` as a tie-break so that two equal-priority entries
/// pop in insertion order — this is the concrete reading of §4.2's
/// "Dijkstra's insertion order decides" for ties.
struct HeapEntry<T> {
    priority: f64,
    seq: u64,
    item: T,
}

impl<T> PartialEq for HeapEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}
impl<T> Eq for HeapEntry<T> {}

impl<T> PartialOrd for HeapEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for HeapEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse priority so the lowest
        // weight pops first, and reverse seq so the earliest-inserted
        // of two equal-weight entries pops first.
        other
            .priority
            .partial_cmp(&self.priority)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

enum DijkstraOutcome {
    Found(Path),
    Unreachable,
    Cancelled,
}

/// Single-source shortest path (§4.2). Traverses only active edges whose
/// target is active, not blocked, not in `excluded_nodes`, and not in
/// `excluded_edges` (by `source -> target`).
fn dijkstra(
    graph: &CountryGraph,
    source: &CountryCode,
    target: &CountryCode,
    excluded_nodes: &HashSet<CountryCode>,
    excluded_edges: &HashSet<(CountryCode, CountryCode)>,
    hop_fee_rate: f64,
    cancel: &CancellationToken,
) -> DijkstraOutcome {
    let mut dist: HashMap<CountryCode, f64> = HashMap::new();
    let mut prev: HashMap<CountryCode, CountryCode> = HashMap::new();
    let mut visited: HashSet<CountryCode> = HashSet::new();
    let mut heap: BinaryHeap<HeapEntry<CountryCode>> = BinaryHeap::new();
    let mut seq = 0u64;

    dist.insert(source.clone(), 0.0);
    heap.push(HeapEntry {
        priority: 0.0,
        seq,
        item: source.clone(),
    });

    while let Some(entry) = heap.pop() {
        if cancel.is_cancelled() {
            return DijkstraOutcome::Cancelled;
        }
        let node = entry.item;
        if node == *target {
            return match reconstruct(&prev, source, target, dist[&node], hop_fee_rate) {
                Some(path) => DijkstraOutcome::Found(path),
                None => DijkstraOutcome::Unreachable,
            };
        }
        if !visited.insert(node.clone()) {
            continue;
        }

        for (nbr_code, edge) in graph.neighbors(&node) {
            if !edge.active {
                continue;
            }
            if excluded_nodes.contains(&nbr_code) {
                continue;
            }
            if excluded_edges.contains(&(node.clone(), nbr_code.clone())) {
                continue;
            }
            if graph.is_blocked(&nbr_code) {
                continue;
            }
            let Some(nbr_node) = graph.node(&nbr_code) else {
                continue;
            };
            if !nbr_node.active {
                continue;
            }

            let w = graph.weight(&edge);
            let candidate = dist[&node] + w;
            let better = dist.get(&nbr_code).map(|&d| candidate < d).unwrap_or(true);
            if better {
                dist.insert(nbr_code.clone(), candidate);
                prev.insert(nbr_code.clone(), node.clone());
                seq += 1;
                heap.push(HeapEntry {
                    priority: candidate,
                    seq,
                    item: nbr_code,
                });
            }
        }
    }

    DijkstraOutcome::Unreachable
}

fn reconstruct(
    prev: &HashMap<CountryCode, CountryCode>,
    source: &CountryCode,
    target: &CountryCode,
    total_weight: f64,
    hop_fee_rate: f64,
) -> Option<Path> {
    if source == target {
        return Some(Path::with_weight(vec![source.clone()], 0.0, hop_fee_rate));
    }
    let mut nodes = vec![target.clone()];
    let mut current = target;
    loop {
        let p = prev.get(current)?;
        nodes.push(p.clone());
        if p == source {
            break;
        }
        current = p;
    }
    nodes.reverse();
    Some(Path::with_weight(nodes, total_weight, hop_fee_rate))
}

fn find_edge(graph: &CountryGraph, from: &CountryCode, to: &CountryCode) -> Option<CountryEdge> {
    graph
        .neighbors(from)
        .into_iter()
        .find(|(c, _)| c == to)
        .map(|(_, e)| e)
}

fn segment_weight(graph: &CountryGraph, nodes: &[CountryCode]) -> Option<f64> {
    let mut total = 0.0;
    for pair in nodes.windows(2) {
        let edge = find_edge(graph, &pair[0], &pair[1])?;
        total += graph.weight(&edge);
    }
    Some(total)
}

/// K-shortest simple paths via Yen's deviation algorithm (§4.2), built on
/// top of [`dijkstra`].
pub fn k_shortest_paths(
    graph: &CountryGraph,
    source: &CountryCode,
    target: &CountryCode,
    k: usize,
    hop_fee_rate: f64,
    cancel: &CancellationToken,
) -> Result<KPathsOutcome, RoutingError> {
    log::debug!("routing query: {source} -> {target}, k={k}");

    if !graph.contains_node(source) {
        return Err(RoutingError::UnknownSource(source.clone()));
    }
    if !graph.contains_node(target) {
        return Err(RoutingError::UnknownTarget(target.clone()));
    }
    if graph.is_blocked(source) {
        return Err(RoutingError::SourceBlocked(source.clone()));
    }
    if graph.is_blocked(target) {
        return Err(RoutingError::TargetBlocked(target.clone()));
    }

    let empty_nodes = HashSet::new();
    let empty_edges = HashSet::new();
    let first = match dijkstra(
        graph,
        source,
        target,
        &empty_nodes,
        &empty_edges,
        hop_fee_rate,
        cancel,
    ) {
        DijkstraOutcome::Found(path) => path,
        DijkstraOutcome::Unreachable => {
            return Err(RoutingError::NoPath {
                from: source.clone(),
                to: target.clone(),
            })
        }
        DijkstraOutcome::Cancelled => {
            return Ok(KPathsOutcome {
                paths: Vec::new(),
                cancelled: true,
            })
        }
    };

    let mut a: Vec<Path> = vec![first];
    let mut seen: HashSet<Vec<CountryCode>> = HashSet::new();
    seen.insert(a[0].nodes.clone());
    let mut candidates: BinaryHeap<HeapEntry<Path>> = BinaryHeap::new();
    let mut seq = 0u64;

    while a.len() < k {
        let last_path = a.last().unwrap().clone();

        for i in 0..last_path.nodes.len().saturating_sub(1) {
            if cancel.is_cancelled() {
                return Ok(KPathsOutcome {
                    paths: a,
                    cancelled: true,
                });
            }

            let spur_node = &last_path.nodes[i];
            let root = &last_path.nodes[0..=i];

            let mut excluded_edges: HashSet<(CountryCode, CountryCode)> = HashSet::new();
            for path in &a {
                if path.nodes.len() > i && path.nodes[0..=i] == *root {
                    if let Some(next) = path.nodes.get(i + 1) {
                        excluded_edges.insert((path.nodes[i].clone(), next.clone()));
                    }
                }
            }
            let excluded_nodes: HashSet<CountryCode> = root[..i].iter().cloned().collect();

            let spur_outcome = dijkstra(
                graph,
                spur_node,
                target,
                &excluded_nodes,
                &excluded_edges,
                hop_fee_rate,
                cancel,
            );

            let spur_path = match spur_outcome {
                DijkstraOutcome::Found(p) => p,
                DijkstraOutcome::Unreachable => continue,
                DijkstraOutcome::Cancelled => {
                    return Ok(KPathsOutcome {
                        paths: a,
                        cancelled: true,
                    })
                }
            };

            let Some(root_weight) = segment_weight(graph, root) else {
                continue;
            };

            let mut total_nodes = root[..i].to_vec();
            total_nodes.extend(spur_path.nodes.iter().cloned());
            let total_weight = root_weight + spur_path.total_weight;

            if seen.contains(&total_nodes) {
                continue;
            }
            seen.insert(total_nodes.clone());
            seq += 1;
            candidates.push(HeapEntry {
                priority: total_weight,
                seq,
                item: Path::with_weight(total_nodes, total_weight, hop_fee_rate),
            });
        }

        if cancel.is_cancelled() {
            return Ok(KPathsOutcome {
                paths: a,
                cancelled: true,
            });
        }

        match candidates.pop() {
            Some(entry) => a.push(entry.item),
            None => break,
        }
    }

    Ok(KPathsOutcome {
        paths: a,
        cancelled: false,
    })
}
