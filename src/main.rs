//! corridor-mesh CLI
//!
//! Drives the routing engine, fee quotation, and anti-fragile payment
//! retry from the command line against a JSON-described country
//! topology. This binary is glue over the core (§1: "out of scope...
//! HTTP/WebSocket transport framing") — a real deployment would expose
//! the same components over a network service instead.
//!
//! # Usage
//!
//! ```bash
//! # Rank the top-3 paths between two countries
//! corridor-mesh route --topology world.json --source USA --target DEU
//!
//! # Initiate and complete a payment, retrying on alternate routes
//! corridor-mesh pay --topology world.json --source USA --target DEU \
//!     --amount 1000 --currency USD --target-currency EUR --watch
//!
//! # Generate a random topology for testing
//! corridor-mesh generate --countries 12 --output world.json
//! ```

use std::collections::HashMap;
use std::fs;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use corridor_mesh::cancel::CancellationToken;
use corridor_mesh::circuit::breaker::CircuitBreaker;
use corridor_mesh::circuit::store::InMemoryCircuitStore;
use corridor_mesh::config::EngineConfig;
use corridor_mesh::core::country::{CountryCode, CountryNode};
use corridor_mesh::core::currency::CurrencyCode;
use corridor_mesh::core::fx::FxRateMap;
use corridor_mesh::eventbus::bus::{Delivery, EventBus};
use corridor_mesh::eventbus::events::{
    EventPayload, PathUpdate, PathUpdateStatus, WireCircuitState,
};
use corridor_mesh::graph::country_graph::CountryGraph;
use corridor_mesh::graph::router::k_shortest_paths;
use corridor_mesh::payment::state_machine::PaymentStateMachine;
use corridor_mesh::payment::transaction::TransactionStatus;
use rand::Rng;
use rust_decimal::Decimal;

fn print_usage() {
    eprintln!(
        r#"corridor-mesh — cross-border payment routing mesh

USAGE:
    corridor-mesh <COMMAND> [OPTIONS]

COMMANDS:
    route       Rank the top-K paths between two countries
    pay         Initiate and complete a payment with anti-fragile retry
    generate    Generate a random country topology (for testing)
    help        Show this message

OPTIONS (route):
    --topology <FILE>        Path to JSON topology file
    --source <CODE>          Source country code
    --target <CODE>          Target country code
    --blocked <CODES>        Comma-separated blocked country codes
    --k <N>                  Number of ranked paths (default: 3)
    --amount <DECIMAL>       Optional transfer amount; when given, each
                             ranked path reports a calculated_fee
    --format <FORMAT>        Output format: text (default) or json

OPTIONS (pay):
    --topology <FILE>        Path to JSON topology file
    --source <CODE>          Source country code
    --target <CODE>          Target country code
    --amount <DECIMAL>       Transfer amount
    --currency <CODE>        Source currency code
    --target-currency <CODE> Destination currency code
    --user <ID>              Caller-supplied user id (default: cli-user)
    --blocked <CODES>        Comma-separated blocked country codes
    --failure-probability <F>  Per-hop simulated failure rate (default: 0.0)
    --watch                  Stream live route/circuit events to stderr
    --format <FORMAT>        Output format: text (default) or json

OPTIONS (generate):
    --countries <N>          Number of countries (default: 10)
    --edge-probability <F>   Probability of an edge between any pair (default: 0.35)
    --output <FILE>          Write to file instead of stdout

EXAMPLES:
    corridor-mesh generate --countries 15 --output world.json
    corridor-mesh route --topology world.json --source USA --target JPN --k 3
    corridor-mesh pay --topology world.json --source USA --target JPN \
        --amount 2500 --currency USD --target-currency JPY --watch"#
    );
}

#[derive(serde::Deserialize)]
struct TopologyInput {
    nodes: Vec<NodeInput>,
    edges: Vec<EdgeInput>,
}

#[derive(serde::Deserialize)]
struct NodeInput {
    code: String,
    currency: String,
    #[serde(default = "default_fx_rate")]
    fx_rate: f64,
    #[serde(default = "default_score")]
    credibility: f64,
    #[serde(default = "default_score")]
    success_rate: f64,
    #[serde(default = "default_true")]
    active: bool,
}

#[derive(serde::Deserialize)]
struct EdgeInput {
    source: String,
    target: String,
    base_cost: f64,
    #[serde(default = "default_true")]
    active: bool,
}

fn default_fx_rate() -> f64 {
    1.0
}
fn default_score() -> f64 {
    1.0
}
fn default_true() -> bool {
    true
}

fn load_topology(path: &str) -> CountryGraph {
    let content = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading topology file '{path}': {e}");
        process::exit(1);
    });
    let input: TopologyInput = serde_json::from_str(&content).unwrap_or_else(|e| {
        eprintln!("Error parsing topology JSON: {e}");
        eprintln!("Expected format:");
        eprintln!(
            r#"{{
  "nodes": [
    {{ "code": "USA", "currency": "USD", "fx_rate": 1.0, "credibility": 0.95, "success_rate": 0.98 }}
  ],
  "edges": [
    {{ "source": "USA", "target": "GBR", "base_cost": 0.01 }}
  ]
}}"#
        );
        process::exit(1);
    });

    let graph = CountryGraph::new();
    for n in input.nodes {
        let mut node = CountryNode::new(
            CountryCode::new(n.code),
            CurrencyCode::new(n.currency),
            n.fx_rate,
        );
        node.set_credibility(n.credibility);
        node.success_rate = n.success_rate;
        node.active = n.active;
        graph.add_node(node);
    }
    for e in input.edges {
        graph.add_edge(
            &CountryCode::new(e.source),
            &CountryCode::new(e.target),
            e.base_cost,
            e.active,
        );
    }
    graph
}

fn apply_blocked(graph: &CountryGraph, raw: &Option<String>) {
    if let Some(s) = raw {
        if !s.is_empty() {
            graph.set_blocked(s.split(',').map(|c| CountryCode::new(c.trim())));
        }
    }
}

/// Generic `--flag value` scanner shared by every subcommand.
struct ArgScanner {
    flags: HashMap<String, String>,
    switches: std::collections::HashSet<String>,
}

impl ArgScanner {
    fn parse(args: &[String], known_switches: &[&str]) -> Self {
        let mut flags = HashMap::new();
        let mut switches = std::collections::HashSet::new();
        let mut i = 0;
        while i < args.len() {
            let arg = &args[i];
            if let Some(name) = arg.strip_prefix("--") {
                if known_switches.contains(&name) {
                    switches.insert(name.to_string());
                } else {
                    i += 1;
                    let value = args.get(i).unwrap_or_else(|| {
                        eprintln!("--{name} requires a value");
                        process::exit(1);
                    });
                    flags.insert(name.to_string(), value.clone());
                }
            } else {
                eprintln!("Unexpected argument: {arg}");
                process::exit(1);
            }
            i += 1;
        }
        Self { flags, switches }
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.flags.get(name).map(|s| s.as_str())
    }

    fn required(&self, name: &str) -> String {
        self.get(name)
            .unwrap_or_else(|| {
                eprintln!("--{name} is required");
                process::exit(1);
            })
            .to_string()
    }

    fn has(&self, name: &str) -> bool {
        self.switches.contains(name)
    }
}

#[derive(serde::Serialize)]
struct RankedPathOutput {
    rank: usize,
    nodes: Vec<String>,
    hop_count: usize,
    total_weight: f64,
    total_fee_percent: f64,
    final_fraction: f64,
    /// Present only when the caller supplied `--amount` (§6 Route query
    /// `calculated_fee?`): `amount * total_fee_fraction` for this path.
    calculated_fee: Option<String>,
}

#[derive(serde::Serialize)]
struct RouteQueryOutput {
    paths: Vec<RankedPathOutput>,
    duration_ms: u128,
    cancelled: bool,
}

async fn cmd_route(args: &[String]) {
    let scan = ArgScanner::parse(args, &[]);
    let topology = scan.required("topology");
    let source = CountryCode::new(scan.required("source"));
    let target = CountryCode::new(scan.required("target"));
    let k: usize = scan.get("k").and_then(|s| s.parse().ok()).unwrap_or(3);
    let format = scan.get("format").unwrap_or("text").to_string();
    let blocked_raw = scan.get("blocked").map(str::to_string);
    let amount: Option<Decimal> = match scan.get("amount") {
        Some(raw) => Some(raw.parse().unwrap_or_else(|e| {
            eprintln!("invalid --amount: {e}");
            process::exit(1);
        })),
        None => None,
    };

    let graph = load_topology(&topology);
    apply_blocked(&graph, &blocked_raw);

    let config = EngineConfig::default();
    let cancel = CancellationToken::new();
    let started = std::time::Instant::now();

    let graph = Arc::new(graph);
    let graph_for_task = graph.clone();
    let src = source.clone();
    let tgt = target.clone();
    let cancel_for_task = cancel.clone();
    let hop_fee_rate = config.hop_fee_rate;
    let route_timeout = config.timeouts.route_query;

    let outcome = tokio::time::timeout(
        route_timeout,
        tokio::task::spawn_blocking(move || {
            k_shortest_paths(&graph_for_task, &src, &tgt, k, hop_fee_rate, &cancel_for_task)
        }),
    )
    .await;

    let duration_ms = started.elapsed().as_millis();

    let result = match outcome {
        Err(_) => {
            eprintln!("route query timed out after {route_timeout:?}");
            process::exit(1);
        }
        Ok(join_result) => join_result.expect("routing task panicked"),
    };

    match result {
        Err(e) => {
            eprintln!("route query failed: {e}");
            process::exit(1);
        }
        Ok(outcome) => {
            let paths: Vec<RankedPathOutput> = outcome
                .paths
                .iter()
                .enumerate()
                .map(|(i, p)| RankedPathOutput {
                    rank: i + 1,
                    nodes: p.nodes.iter().map(|c| c.to_string()).collect(),
                    hop_count: p.hop_count(),
                    total_weight: p.total_weight,
                    total_fee_percent: p.total_fee_fraction * 100.0,
                    final_fraction: p.final_fraction,
                    calculated_fee: amount.and_then(|a| {
                        corridor_mesh::economics::preview::calculated_fee(a, p.total_fee_fraction)
                            .map(|fee| fee.to_string())
                    }),
                })
                .collect();

            if format == "json" {
                let output = RouteQueryOutput {
                    paths,
                    duration_ms,
                    cancelled: outcome.cancelled,
                };
                println!("{}", serde_json::to_string_pretty(&output).unwrap());
            } else {
                println!("Top {} path(s) from {source} to {target} ({duration_ms} ms):\n", paths.len());
                for p in &paths {
                    print!(
                        "  #{} {}  weight={:.4}  hops={}  fee%={:.4}",
                        p.rank,
                        p.nodes.join(" -> "),
                        p.total_weight,
                        p.hop_count,
                        p.total_fee_percent
                    );
                    match &p.calculated_fee {
                        Some(fee) => println!("  fee={fee}"),
                        None => println!(),
                    }
                }
                if outcome.cancelled {
                    println!("\n(query was cancelled before completion)");
                }
            }
        }
    }
}

#[derive(serde::Serialize)]
struct PaymentOutput {
    transaction_id: uuid::Uuid,
    status: String,
    route: Vec<String>,
    hops_completed: usize,
    attempt: usize,
    base_fee: String,
    hop_fees: String,
    halt_fines: String,
    total_fees: String,
    final_amount: String,
    failed_at: Option<String>,
    refund_id: Option<String>,
    message: String,
}

async fn cmd_pay(args: &[String]) {
    let scan = ArgScanner::parse(args, &["watch"]);
    let topology = scan.required("topology");
    let source = CountryCode::new(scan.required("source"));
    let target = CountryCode::new(scan.required("target"));
    let amount: Decimal = scan
        .required("amount")
        .parse()
        .unwrap_or_else(|e| {
            eprintln!("invalid --amount: {e}");
            process::exit(1);
        });
    let currency = CurrencyCode::new(scan.required("currency"));
    let target_currency = CurrencyCode::new(scan.required("target-currency"));
    let user = scan.get("user").unwrap_or("cli-user").to_string();
    let failure_probability: f64 = scan
        .get("failure-probability")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0);
    let format = scan.get("format").unwrap_or("text").to_string();
    let watch = scan.has("watch");
    let blocked_raw = scan.get("blocked").map(str::to_string);

    let graph = load_topology(&topology);
    if let Some(raw) = &blocked_raw {
        graph.set_blocked(raw.split(',').map(|c| CountryCode::new(c.trim())));
    }

    let config = EngineConfig::default();
    let cancel = CancellationToken::new();

    let route_outcome = k_shortest_paths(&graph, &source, &target, 1, config.hop_fee_rate, &cancel);
    let route = match route_outcome {
        Ok(outcome) if !outcome.paths.is_empty() => outcome.paths[0].nodes.clone(),
        Ok(_) => {
            eprintln!("no path found from {source} to {target}");
            process::exit(1);
        }
        Err(e) => {
            eprintln!("routing failed: {e}");
            process::exit(1);
        }
    };

    let bus = EventBus::new();
    let watch_handle = if watch {
        let (_id, mut rx) = bus.subscribe().await.unwrap_or_else(|e| {
            eprintln!("failed to subscribe to event bus: {e}");
            process::exit(1);
        });
        Some(tokio::spawn(async move {
            while let Some(delivery) = rx.recv().await {
                if let Delivery::Event(event) = delivery {
                    eprintln!(
                        "[watch] {}",
                        serde_json::to_string(&event).unwrap_or_default()
                    );
                }
            }
        }))
    } else {
        None
    };

    let breaker = CircuitBreaker::new(InMemoryCircuitStore::new(), config.breaker);
    let sm = PaymentStateMachine::new(config);

    let tx = sm
        .create(user, amount, currency, target_currency, route.clone(), |_| false)
        .unwrap_or_else(|e| {
            eprintln!("failed to create transaction: {e}");
            process::exit(1);
        });

    warn_on_broadcast_failure(bus.broadcast(EventPayload::PathUpdate(PathUpdate {
        tx_id: tx.id,
        path: route.clone(),
        current_hop: 0,
        amount: tx.fees.final_amount,
        status: PathUpdateStatus::InProgress,
        old_path: None,
    })));

    let mut rng = rand::thread_rng();
    let hop_outcomes: Arc<parking_lot::Mutex<Vec<(CountryCode, bool)>>> =
        Arc::new(parking_lot::Mutex::new(Vec::new()));
    let outcomes_for_closure = hop_outcomes.clone();
    let credibility = move |code: &CountryCode, success: bool| {
        outcomes_for_closure.lock().push((code.clone(), success));
    };

    let fx = FxRateMap::new();
    let result = sm
        .execute_with_retry(
            tx.id,
            &fx,
            failure_probability,
            &mut rng,
            credibility,
            |external_id| format!("refund-{external_id}"),
            &cancel,
        )
        .await
        .unwrap_or_else(|e| {
            eprintln!("payment processing failed: {e}");
            process::exit(1);
        });

    for (code, success) in hop_outcomes.lock().drain(..) {
        let record = if success {
            breaker.record_success(&code).await
        } else {
            breaker.record_failure(&code).await
        };
        if let Ok(record) = record {
            warn_on_broadcast_failure(bus.broadcast(EventPayload::CircuitBreaker(
                corridor_mesh::eventbus::events::CircuitBreakerEvent {
                    node_id: code,
                    state: wire_state(record.state),
                    prev_state: None,
                },
            )));
        }
    }

    let final_status = match result.status {
        TransactionStatus::Success => PathUpdateStatus::Completed,
        TransactionStatus::Refunded | TransactionStatus::Failed => PathUpdateStatus::Failed,
        _ => PathUpdateStatus::InProgress,
    };
    warn_on_broadcast_failure(bus.broadcast(EventPayload::PathUpdate(PathUpdate {
        tx_id: result.id,
        path: result.route.clone(),
        current_hop: result.hops_completed,
        amount: result.fees.final_amount,
        status: final_status,
        old_path: if result.route == route { None } else { Some(route.clone()) },
    })));

    if let Some(handle) = watch_handle {
        // give the watch task a moment to drain the final events before exit
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();
    }

    let message = match result.status {
        TransactionStatus::Success => format!("payment {} completed on route {:?}", result.id, result.route),
        TransactionStatus::Refunded => format!(
            "payment {} exhausted retries and was refunded ({})",
            result.id,
            result.refund_id.clone().unwrap_or_default()
        ),
        other => format!("payment {} ended in unexpected state {other:?}", result.id),
    };

    let output = PaymentOutput {
        transaction_id: result.id,
        status: format!("{:?}", result.status),
        route: result.route.iter().map(|c| c.to_string()).collect(),
        hops_completed: result.hops_completed,
        attempt: result.attempt,
        base_fee: result.fees.base_fee.to_string(),
        hop_fees: result.fees.hop_fees.to_string(),
        halt_fines: result.fees.halt_fines.to_string(),
        total_fees: result.fees.total_fees.to_string(),
        final_amount: result.fees.final_amount.to_string(),
        failed_at: result.failed_at.map(|c| c.to_string()),
        refund_id: result.refund_id.clone(),
        message,
    };

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&output).unwrap());
    } else {
        println!("{}", output.message);
        println!("  status:         {}", output.status);
        println!("  route:          {}", output.route.join(" -> "));
        println!("  hops_completed: {}", output.hops_completed);
        println!("  attempt:        {}", output.attempt);
        println!("  total_fees:     {}", output.total_fees);
        println!("  final_amount:   {}", output.final_amount);
        if let Some(refund_id) = &output.refund_id {
            println!("  refund_id:      {refund_id}");
        }
    }
}

/// Broadcast failures only happen if the dispatcher task is already
/// gone; the CLI keeps running and just logs it (§4.5: slow/dead
/// subscribers never interrupt a publisher).
fn warn_on_broadcast_failure(result: Result<(), corridor_mesh::error::EventBusError>) {
    if let Err(e) = result {
        log::warn!("event bus broadcast dropped: {e}");
    }
}

fn wire_state(state: corridor_mesh::circuit::breaker::CircuitState) -> WireCircuitState {
    use corridor_mesh::circuit::breaker::CircuitState as S;
    match state {
        S::Closed => WireCircuitState::Closed,
        S::Open => WireCircuitState::Open,
        S::HalfOpen => WireCircuitState::HalfOpen,
    }
}

fn cmd_generate(args: &[String]) {
    let scan = ArgScanner::parse(args, &[]);
    let countries: usize = scan
        .get("countries")
        .and_then(|s| s.parse().ok())
        .unwrap_or(10);
    let edge_probability: f64 = scan
        .get("edge-probability")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.35);
    let output_path = scan.get("output").map(str::to_string);

    let codes: Vec<String> = (0..countries)
        .map(|i| format!("C{i:02}"))
        .collect();

    let mut rng = rand::thread_rng();
    let nodes: Vec<NodeOutput> = codes
        .iter()
        .map(|code| NodeOutput {
            code: code.clone(),
            currency: "USD".to_string(),
            fx_rate: rng.gen_range(0.5..2.0),
            credibility: rng.gen_range(0.5..=1.0),
            success_rate: rng.gen_range(0.7..=1.0),
            active: true,
        })
        .collect();

    let mut edges = Vec::new();
    for i in 0..codes.len() {
        for j in (i + 1)..codes.len() {
            if rng.gen_bool(edge_probability) {
                edges.push(EdgeOutput {
                    source: codes[i].clone(),
                    target: codes[j].clone(),
                    base_cost: rng.gen_range(0.002..0.05),
                    active: true,
                });
            }
        }
    }

    let file = TopologyOutput { nodes, edges };
    let json = serde_json::to_string_pretty(&file).unwrap();

    if let Some(path) = output_path {
        fs::write(&path, &json).unwrap_or_else(|e| {
            eprintln!("Error writing to '{path}': {e}");
            process::exit(1);
        });
        eprintln!(
            "Generated {} countries, {} edges -> {path}",
            file.nodes.len(),
            file.edges.len()
        );
    } else {
        println!("{json}");
    }
}

#[derive(serde::Serialize)]
struct NodeOutput {
    code: String,
    currency: String,
    fx_rate: f64,
    credibility: f64,
    success_rate: f64,
    active: bool,
}

#[derive(serde::Serialize)]
struct EdgeOutput {
    source: String,
    target: String,
    base_cost: f64,
    active: bool,
}

#[derive(serde::Serialize)]
struct TopologyOutput {
    nodes: Vec<NodeOutput>,
    edges: Vec<EdgeOutput>,
}

#[tokio::main]
async fn main() {
    corridor_mesh::telemetry::init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        print_usage();
        process::exit(1);
    }
    let command = args.remove(0);

    match command.as_str() {
        "route" => cmd_route(&args).await,
        "pay" => cmd_pay(&args).await,
        "generate" => cmd_generate(&args),
        "help" | "--help" | "-h" => print_usage(),
        other => {
            eprintln!("Unknown command: {other}\n");
            print_usage();
            process::exit(1);
        }
    }
}
