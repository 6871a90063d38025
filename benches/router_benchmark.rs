use corridor_mesh::cancel::CancellationToken;
use corridor_mesh::core::country::{CountryCode, CountryNode};
use corridor_mesh::core::currency::CurrencyCode;
use corridor_mesh::graph::country_graph::CountryGraph;
use corridor_mesh::graph::router::k_shortest_paths;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Builds a connected mesh of `country_count` nodes with roughly
/// `avg_edges_per_node` edges per node, so `k_shortest_paths` has
/// several viable routes to rank (§4.2 performance target: top-3 paths
/// in under 10 ms over a realistic country set).
fn random_mesh(country_count: usize, avg_edges_per_node: usize) -> CountryGraph {
    let graph = CountryGraph::new();
    let mut rng = StdRng::seed_from_u64(42);

    let codes: Vec<CountryCode> = (0..country_count)
        .map(|i| CountryCode::new(format!("C{i:03}")))
        .collect();

    for code in &codes {
        let mut node = CountryNode::new(code.clone(), CurrencyCode::new("USD"), 1.0);
        node.set_credibility(rng.gen_range(0.5..=1.0));
        node.success_rate = rng.gen_range(0.7..=1.0);
        graph.add_node(node);
    }

    // a ring guarantees connectivity, then extra random chords bring the
    // average degree up to avg_edges_per_node
    for i in 0..codes.len() {
        let j = (i + 1) % codes.len();
        graph.add_edge(&codes[i], &codes[j], rng.gen_range(0.002..0.05), true);
    }
    let extra_edges = country_count * avg_edges_per_node / 2;
    for _ in 0..extra_edges {
        let i = rng.gen_range(0..codes.len());
        let j = rng.gen_range(0..codes.len());
        if i != j {
            graph.add_edge(&codes[i], &codes[j], rng.gen_range(0.002..0.05), true);
        }
    }

    graph
}

fn bench_k_paths_50_nodes(c: &mut Criterion) {
    let graph = random_mesh(50, 6);
    let cancel = CancellationToken::new();
    let source = CountryCode::new("C000");
    let target = CountryCode::new("C025");

    c.bench_function("k_shortest_paths_50_nodes_top3", |b| {
        b.iter(|| {
            k_shortest_paths(
                black_box(&graph),
                black_box(&source),
                black_box(&target),
                3,
                0.0002,
                &cancel,
            )
        })
    });
}

fn bench_k_paths_200_nodes(c: &mut Criterion) {
    let graph = random_mesh(200, 8);
    let cancel = CancellationToken::new();
    let source = CountryCode::new("C000");
    let target = CountryCode::new("C100");

    c.bench_function("k_shortest_paths_200_nodes_top3", |b| {
        b.iter(|| {
            k_shortest_paths(
                black_box(&graph),
                black_box(&source),
                black_box(&target),
                3,
                0.0002,
                &cancel,
            )
        })
    });
}

fn bench_k_paths_wider_k(c: &mut Criterion) {
    let graph = random_mesh(50, 6);
    let cancel = CancellationToken::new();
    let source = CountryCode::new("C000");
    let target = CountryCode::new("C025");

    c.bench_function("k_shortest_paths_50_nodes_top10", |b| {
        b.iter(|| {
            k_shortest_paths(
                black_box(&graph),
                black_box(&source),
                black_box(&target),
                10,
                0.0002,
                &cancel,
            )
        })
    });
}

criterion_group!(
    benches,
    bench_k_paths_50_nodes,
    bench_k_paths_200_nodes,
    bench_k_paths_wider_k
);
criterion_main!(benches);
