//! Distributed circuit breaker (C6, §4.6).
//!
//! Per-node state is owned by an external [`CircuitStore`]; this type
//! adds the in-process per-node lock that serializes the
//! read-modify-write sequences the store's atomic primitives alone
//! cannot express (e.g. "read state, maybe transition, write state").

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::RwLock as SyncRwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;

use crate::circuit::store::CircuitStore;
use crate::config::CircuitBreakerConfig;
use crate::core::country::CountryCode;
use crate::error::CircuitError;

/// Per-node breaker state (§3 `CircuitState`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// The full persisted record for one node (§3, §6 storage layout).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitRecord {
    pub state: CircuitState,
    pub failures: usize,
    pub successes: usize,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_state_change_at: DateTime<Utc>,
}

impl CircuitRecord {
    /// A brand-new node starts `Closed` at `now` (§4.6 `get`: "if
    /// absent, returns `Closed` at `now`").
    pub fn closed(now: DateTime<Utc>) -> Self {
        Self {
            state: CircuitState::Closed,
            failures: 0,
            successes: 0,
            last_failure_at: None,
            last_state_change_at: now,
        }
    }
}

/// C6: per-node closed/open/half-open state machine with sliding
/// failure-window counting, backed by a pluggable [`CircuitStore`].
pub struct CircuitBreaker<S: CircuitStore> {
    store: S,
    config: CircuitBreakerConfig,
    locks: SyncRwLock<HashMap<CountryCode, Arc<AsyncMutex<()>>>>,
}

impl<S: CircuitStore> CircuitBreaker<S> {
    pub fn new(store: S, config: CircuitBreakerConfig) -> Self {
        Self {
            store,
            config,
            locks: SyncRwLock::new(HashMap::new()),
        }
    }

    fn lock_for(&self, node: &CountryCode) -> Arc<AsyncMutex<()>> {
        if let Some(lock) = self.locks.read().get(node) {
            return lock.clone();
        }
        self.locks
            .write()
            .entry(node.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Read current state, applying the `Open -> HalfOpen` timeout
    /// transition if due (§4.6 `get`). Does not acquire the per-node
    /// lock itself; callers that need the read to be part of a larger
    /// atomic sequence should hold a guard from [`Self::lock_for`]
    /// first (every public method below does this).
    async fn read_and_maybe_promote(&self, node: &CountryCode) -> Result<CircuitRecord, CircuitError> {
        let now = Utc::now();
        match self.store.load(node).await? {
            None => {
                let fresh = CircuitRecord::closed(now);
                self.store.save(node, fresh.clone()).await?;
                Ok(fresh)
            }
            Some(mut record) => {
                let timeout = ChronoDuration::from_std(self.config.timeout).unwrap_or(ChronoDuration::zero());
                if record.state == CircuitState::Open && now - record.last_state_change_at >= timeout {
                    record.state = CircuitState::HalfOpen;
                    record.successes = 0;
                    record.last_state_change_at = now;
                    self.store.save(node, record.clone()).await?;
                }
                Ok(record)
            }
        }
    }

    /// `get(node)` (§4.6).
    pub async fn get(&self, node: &CountryCode) -> Result<CircuitRecord, CircuitError> {
        let lock = self.lock_for(node);
        let _guard = lock.lock().await;
        self.read_and_maybe_promote(node).await
    }

    /// `allow(node)` (§4.6): `Ok` when `Closed` or `HalfOpen`,
    /// `CircuitOpen` when `Open`.
    pub async fn allow(&self, node: &CountryCode) -> Result<(), CircuitError> {
        let record = self.get(node).await?;
        match record.state {
            CircuitState::Open => Err(CircuitError::CircuitOpen(node.clone())),
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
        }
    }

    /// `record_success(node)` (§4.6): promotes `HalfOpen -> Closed`
    /// after `success_threshold` consecutive successes; no-op in
    /// `Closed` or `Open`.
    pub async fn record_success(&self, node: &CountryCode) -> Result<CircuitRecord, CircuitError> {
        let lock = self.lock_for(node);
        let _guard = lock.lock().await;
        let mut record = self.read_and_maybe_promote(node).await?;

        if record.state == CircuitState::HalfOpen {
            record.successes += 1;
            if record.successes >= self.config.success_threshold {
                record.state = CircuitState::Closed;
                record.failures = 0;
                record.successes = 0;
                record.last_state_change_at = Utc::now();
                self.store.clear_failures(node).await?;
            }
            self.store.save(node, record.clone()).await?;
        }
        Ok(record)
    }

    /// `record_failure(node)` (§4.6): appends to the sliding window;
    /// `HalfOpen` always demotes to `Open`; `Closed` trips to `Open`
    /// once the window count reaches `failure_threshold`.
    pub async fn record_failure(&self, node: &CountryCode) -> Result<CircuitRecord, CircuitError> {
        let lock = self.lock_for(node);
        let _guard = lock.lock().await;
        let mut record = self.read_and_maybe_promote(node).await?;

        let now = Utc::now();
        let count = self
            .store
            .record_failure(node, now, self.config.failure_window)
            .await?;
        record.failures = count;
        record.last_failure_at = Some(now);

        match record.state {
            CircuitState::HalfOpen => {
                record.state = CircuitState::Open;
                record.last_state_change_at = now;
                log::warn!("circuit for {node} tripped: HalfOpen -> Open on probe failure");
            }
            CircuitState::Closed if count >= self.config.failure_threshold => {
                record.state = CircuitState::Open;
                record.last_state_change_at = now;
                log::warn!("circuit for {node} tripped: Closed -> Open ({count} failures in window)");
            }
            _ => {}
        }
        self.store.save(node, record.clone()).await?;
        Ok(record)
    }

    /// `force_open(node)` (§4.6): administrative override.
    pub async fn force_open(&self, node: &CountryCode) -> Result<(), CircuitError> {
        let lock = self.lock_for(node);
        let _guard = lock.lock().await;
        let record = CircuitRecord {
            state: CircuitState::Open,
            failures: 0,
            successes: 0,
            last_failure_at: None,
            last_state_change_at: Utc::now(),
        };
        self.store.save(node, record).await
    }

    /// `reset(node)` (§4.6): deletes both the state and the window.
    pub async fn reset(&self, node: &CountryCode) -> Result<(), CircuitError> {
        let lock = self.lock_for(node);
        let _guard = lock.lock().await;
        self.store.delete(node).await?;
        self.store.clear_failures(node).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::store::InMemoryCircuitStore;

    fn breaker() -> CircuitBreaker<InMemoryCircuitStore> {
        CircuitBreaker::new(InMemoryCircuitStore::new(), CircuitBreakerConfig::default())
    }

    fn node() -> CountryCode {
        CountryCode::new("XYZ")
    }

    #[tokio::test]
    async fn unknown_node_starts_closed() {
        let cb = breaker();
        let record = cb.get(&node()).await.unwrap();
        assert_eq!(record.state, CircuitState::Closed);
    }

    #[tokio::test]
    async fn allow_ok_while_closed() {
        let cb = breaker();
        assert!(cb.allow(&node()).await.is_ok());
    }

    #[tokio::test]
    async fn s6_five_failures_trip_the_breaker() {
        let cb = breaker();
        let n = node();
        for _ in 0..5 {
            cb.record_failure(&n).await.unwrap();
        }
        let err = cb.allow(&n).await.unwrap_err();
        assert_eq!(err, CircuitError::CircuitOpen(n));
    }

    #[tokio::test]
    async fn four_failures_do_not_trip_the_breaker() {
        let cb = breaker();
        let n = node();
        for _ in 0..4 {
            cb.record_failure(&n).await.unwrap();
        }
        assert!(cb.allow(&n).await.is_ok());
    }

    #[tokio::test]
    async fn record_success_is_a_no_op_while_closed() {
        let cb = breaker();
        let n = node();
        let record = cb.record_success(&n).await.unwrap();
        assert_eq!(record.state, CircuitState::Closed);
        assert_eq!(record.successes, 0);
    }

    #[tokio::test]
    async fn single_half_open_failure_returns_to_open() {
        let cb = breaker();
        let n = node();
        for _ in 0..5 {
            cb.record_failure(&n).await.unwrap();
        }
        cb.force_half_open_for_test(&n).await;
        cb.record_failure(&n).await.unwrap();
        let record = cb.get(&n).await.unwrap();
        assert_eq!(record.state, CircuitState::Open);
    }

    #[tokio::test]
    async fn success_threshold_closes_from_half_open() {
        let cb = breaker();
        let n = node();
        for _ in 0..5 {
            cb.record_failure(&n).await.unwrap();
        }
        cb.force_half_open_for_test(&n).await;
        for _ in 0..3 {
            cb.record_success(&n).await.unwrap();
        }
        let record = cb.get(&n).await.unwrap();
        assert_eq!(record.state, CircuitState::Closed);
        assert_eq!(record.failures, 0);
        assert_eq!(record.successes, 0);
    }

    #[tokio::test]
    async fn force_open_overrides_immediately() {
        let cb = breaker();
        let n = node();
        cb.force_open(&n).await.unwrap();
        assert_eq!(cb.allow(&n).await.unwrap_err(), CircuitError::CircuitOpen(n));
    }

    #[tokio::test]
    async fn reset_clears_state_and_window() {
        let cb = breaker();
        let n = node();
        for _ in 0..5 {
            cb.record_failure(&n).await.unwrap();
        }
        cb.reset(&n).await.unwrap();
        let record = cb.get(&n).await.unwrap();
        assert_eq!(record.state, CircuitState::Closed);
        assert_eq!(record.failures, 0);
    }

    /// Test-only helper: directly force a node into `HalfOpen` without
    /// waiting out the real `timeout`, mirroring what `get` would do
    /// once the timeout elapses.
    impl<S: CircuitStore> CircuitBreaker<S> {
        async fn force_half_open_for_test(&self, node: &CountryCode) {
            let mut record = self.store.load(node).await.unwrap().unwrap();
            record.state = CircuitState::HalfOpen;
            record.successes = 0;
            record.last_state_change_at = Utc::now();
            self.store.save(node, record).await.unwrap();
        }
    }
}
