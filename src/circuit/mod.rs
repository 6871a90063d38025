//! Distributed circuit breaker (C6, §4.6): per-node closed/open/half-open
//! state with sliding-window failure counting, backed by an external KV
//! contract (§6 storage layout) with an in-memory reference
//! implementation for tests and the CLI demo.

pub mod breaker;
pub mod store;
pub mod window;
