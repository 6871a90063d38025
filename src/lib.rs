//! # corridor-mesh
//!
//! Cross-border payment routing mesh.
//!
//! Given a directed graph of countries, a dynamic set of blocked
//! countries, and a transfer amount, this engine computes ranked paths
//! between a source and a destination, quotes deterministic fees, and
//! executes the payment as a sequence of simulated hops with anti-fragile
//! retry across alternative routes. Live route progress, circuit-breaker
//! transitions, and node/edge state changes fan out to many concurrent
//! subscribers over a distributed circuit breaker.
//!
//! ## Architecture
//!
//! - **core** — Foundational types: country/currency codes, nodes, edges, blocked set, FX input
//! - **graph** — Country graph (C1) and weighted K-shortest-paths router (C2)
//! - **economics** — Deterministic fee quotation and path-level fee preview (C3)
//! - **payment** — Payment state machine, hub-based alternate routing, anti-fragile retry (C4)
//! - **eventbus** — Fan-out event bus for route/circuit/liquidity/node events (C5)
//! - **circuit** — Distributed circuit breaker over an external KV store (C6)

pub mod cancel;
pub mod circuit;
pub mod config;
pub mod core;
pub mod economics;
pub mod error;
pub mod eventbus;
pub mod graph;
pub mod payment;
pub mod telemetry;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::circuit::breaker::{CircuitBreaker, CircuitRecord, CircuitState};
    pub use crate::circuit::store::InMemoryCircuitStore;
    pub use crate::config::EngineConfig;
    pub use crate::core::country::{CountryCode, CountryNode};
    pub use crate::core::currency::CurrencyCode;
    pub use crate::error::CoreError;
    pub use crate::eventbus::bus::{Delivery, EventBus, SubscriberId};
    pub use crate::eventbus::events::EventPayload;
    pub use crate::graph::country_graph::CountryGraph;
    pub use crate::graph::router::{KPathsOutcome, Path};
    pub use crate::payment::state_machine::PaymentStateMachine;
    pub use crate::payment::transaction::{Transaction, TransactionStatus};
}
