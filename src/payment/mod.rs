//! Payment state machine (C4), §4.4: creation, fee snapshotting, per-hop
//! simulation, hub-based alternate routing, and anti-fragile retry.

pub mod hub;
pub mod state_machine;
pub mod transaction;
