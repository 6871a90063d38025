//! Crate-wide error taxonomy.
//!
//! Each component defines its own error enum with `thiserror`, following
//! the same structured-variant style as `core::currency::FxError`. Errors
//! carry the offending values so callers can report them without
//! re-deriving context. [`CoreError`] composes them for call sites that
//! cross component boundaries (e.g. the payment state machine calling
//! into the router).

use crate::core::country::CountryCode;
use thiserror::Error;
use uuid::Uuid;

/// Errors from the country graph and K-paths router (C1/C2).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoutingError {
    #[error("source country {0} is unknown")]
    UnknownSource(CountryCode),
    #[error("target country {0} is unknown")]
    UnknownTarget(CountryCode),
    #[error("source country {0} is blocked")]
    SourceBlocked(CountryCode),
    #[error("target country {0} is blocked")]
    TargetBlocked(CountryCode),
    #[error("no path exists between {from} and {to}")]
    NoPath { from: CountryCode, to: CountryCode },
    #[error("routing operation was cancelled")]
    Cancelled,
}

/// Errors from fee quotation (C3).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeeError {
    #[error("amount must be positive, got {0}")]
    InvalidAmount(String),
    #[error("route must contain at least two distinct nodes, got {0}")]
    InvalidRoute(usize),
}

/// Errors from the payment state machine (C4).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaymentError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("invalid route: {0}")]
    InvalidRoute(String),
    #[error("transaction {0} not found")]
    NotFound(Uuid),
    #[error("transaction {0} is in state {1:?}, expected Pending")]
    InvalidState(Uuid, crate::payment::transaction::TransactionStatus),
    #[error("payment processing was cancelled")]
    Cancelled,
}

/// Errors from the distributed circuit breaker (C6).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CircuitError {
    #[error("circuit for node {0} is open")]
    CircuitOpen(CountryCode),
    #[error("circuit breaker store is unreachable")]
    StoreUnreachable,
}

/// Errors from the fan-out event bus (C5).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventBusError {
    #[error("event bus dispatcher is unavailable")]
    DispatcherUnavailable,
}

/// Top-level error composing every component's error taxonomy.
///
/// Used at boundaries that touch more than one component, e.g. the
/// anti-fragile retry loop, which calls the router, the state machine,
/// and the circuit breaker in sequence.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error(transparent)]
    Routing(#[from] RoutingError),
    #[error(transparent)]
    Fee(#[from] FeeError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Circuit(#[from] CircuitError),
    #[error(transparent)]
    EventBus(#[from] EventBusError),
}
