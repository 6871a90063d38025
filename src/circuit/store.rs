//! External-KV contract for circuit breaker state (§4.6, §6 storage
//! layout) plus an in-memory reference implementation.
//!
//! Production deployments back [`CircuitStore`] with a Redis-like
//! sorted-set-capable store: `circuit:<node>` holds the JSON state
//! record with a 24h TTL, `circuit:<node>:failures` holds the sliding
//! window as a sorted set with TTL equal to `failure_window`. The
//! in-memory implementation here reproduces those semantics (including
//! the TTLs) without an external dependency, for tests and for the CLI
//! demo.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;

use crate::circuit::breaker::CircuitRecord;
use crate::circuit::window::SlidingFailureWindow;
use crate::core::country::CountryCode;
use crate::error::CircuitError;

/// TTL on the persisted state record (§6: "24 h TTL").
const STATE_TTL: Duration = Duration::from_secs(24 * 3600);

/// Durable, atomic storage for circuit breaker records.
///
/// `record_failure` models the KV's server-side script: it appends the
/// failure and prunes the window in one atomic step, returning the
/// post-prune count, so concurrent callers across processes never lose
/// an update (§9 "Sliding-window failure counting").
pub trait CircuitStore: Send + Sync {
    fn load(
        &self,
        node: &CountryCode,
    ) -> impl std::future::Future<Output = Result<Option<CircuitRecord>, CircuitError>> + Send;

    fn save(
        &self,
        node: &CountryCode,
        record: CircuitRecord,
    ) -> impl std::future::Future<Output = Result<(), CircuitError>> + Send;

    /// Record a failure at `at` and return the failure count within
    /// `window` after pruning stale entries.
    fn record_failure(
        &self,
        node: &CountryCode,
        at: DateTime<Utc>,
        window: Duration,
    ) -> impl std::future::Future<Output = Result<usize, CircuitError>> + Send;

    fn clear_failures(
        &self,
        node: &CountryCode,
    ) -> impl std::future::Future<Output = Result<(), CircuitError>> + Send;

    fn delete(
        &self,
        node: &CountryCode,
    ) -> impl std::future::Future<Output = Result<(), CircuitError>> + Send;
}

struct StampedRecord {
    record: CircuitRecord,
    stored_at: DateTime<Utc>,
}

#[derive(Default)]
struct NodeEntry {
    state: Option<StampedRecord>,
    window: SlidingFailureWindow,
}

/// In-memory reference implementation of [`CircuitStore`], keyed by
/// node with one lock per node (mirrors the per-transaction lock
/// pattern in [`crate::payment::state_machine::PaymentStateMachine`]).
#[derive(Default)]
pub struct InMemoryCircuitStore {
    entries: Mutex<HashMap<CountryCode, Mutex<NodeEntry>>>,
}

impl InMemoryCircuitStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entry<R>(&self, node: &CountryCode, f: impl FnOnce(&mut NodeEntry) -> R) -> R {
        let mut guard = self.entries.lock();
        let entry = guard.entry(node.clone()).or_default();
        f(&mut entry.lock())
    }
}

impl CircuitStore for InMemoryCircuitStore {
    async fn load(&self, node: &CountryCode) -> Result<Option<CircuitRecord>, CircuitError> {
        let now = Utc::now();
        Ok(self.with_entry(node, |entry| match &entry.state {
            Some(stamped) if now - stamped.stored_at < ChronoDuration::from_std(STATE_TTL).unwrap() => {
                Some(stamped.record.clone())
            }
            _ => None,
        }))
    }

    async fn save(&self, node: &CountryCode, record: CircuitRecord) -> Result<(), CircuitError> {
        self.with_entry(node, |entry| {
            entry.state = Some(StampedRecord {
                record,
                stored_at: Utc::now(),
            });
        });
        Ok(())
    }

    async fn record_failure(
        &self,
        node: &CountryCode,
        at: DateTime<Utc>,
        window: Duration,
    ) -> Result<usize, CircuitError> {
        Ok(self.with_entry(node, |entry| {
            entry.window.record(at);
            entry.window.prune_and_count(at, window)
        }))
    }

    async fn clear_failures(&self, node: &CountryCode) -> Result<(), CircuitError> {
        self.with_entry(node, |entry| entry.window.clear());
        Ok(())
    }

    async fn delete(&self, node: &CountryCode) -> Result<(), CircuitError> {
        self.entries.lock().remove(node);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_on_unknown_node_returns_none() {
        let store = InMemoryCircuitStore::new();
        let record = store.load(&CountryCode::new("ZZZ")).await.unwrap();
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let store = InMemoryCircuitStore::new();
        let node = CountryCode::new("USA");
        let record = CircuitRecord::closed(Utc::now());
        store.save(&node, record.clone()).await.unwrap();
        let loaded = store.load(&node).await.unwrap().unwrap();
        assert_eq!(loaded.state, record.state);
    }

    #[tokio::test]
    async fn record_failure_accumulates_within_window() {
        let store = InMemoryCircuitStore::new();
        let node = CountryCode::new("USA");
        let now = Utc::now();
        for i in 0..3 {
            let count = store
                .record_failure(&node, now + ChronoDuration::seconds(i), Duration::from_secs(60))
                .await
                .unwrap();
            assert_eq!(count, (i + 1) as usize);
        }
    }

    #[tokio::test]
    async fn delete_removes_state_and_window() {
        let store = InMemoryCircuitStore::new();
        let node = CountryCode::new("USA");
        store.save(&node, CircuitRecord::closed(Utc::now())).await.unwrap();
        store.record_failure(&node, Utc::now(), Duration::from_secs(60)).await.unwrap();
        store.delete(&node).await.unwrap();
        assert!(store.load(&node).await.unwrap().is_none());
        let count = store
            .record_failure(&node, Utc::now(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
