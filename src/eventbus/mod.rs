//! Fan-out event bus (C5), §4.5: a dispatcher task broadcasts route,
//! circuit-breaker, liquidity, and node events to many subscribers over
//! bounded, non-blocking channels, with heartbeat-based dead-subscriber
//! eviction.

pub mod bus;
pub mod events;
